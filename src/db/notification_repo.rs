// src/db/notification_repo.rs

use chrono::NaiveDate;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::notification::{DueEntry, NotificationChannel, OutboxMessage, VencimentoCategory};

/// Contato da empresa que recebe o aviso de cada operação concluída.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationContact {
    pub channel: NotificationChannel,
    pub recipient: String,
}

#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  OUTBOX
    // =========================================================================

    pub async fn active_contacts<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Vec<NotificationContact>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let contacts = sqlx::query_as::<_, NotificationContact>(
            "SELECT channel, recipient FROM notification_contacts WHERE tenant_id = $1 AND is_active",
        )
            .bind(tenant_id)
            .fetch_all(executor)
            .await?;
        Ok(contacts)
    }

    pub async fn enqueue<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        channel: NotificationChannel,
        recipient: &str,
        title: &str,
        body: &str,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO notification_outbox (tenant_id, channel, recipient, title, body)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
            .bind(tenant_id)
            .bind(channel)
            .bind(recipient)
            .bind(title)
            .bind(body)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Mensagens ainda não entregues, das mais antigas para as mais novas.
    pub async fn pending(&self, tenant_id: Uuid, max_attempts: i32, limit: i64) -> Result<Vec<OutboxMessage>, AppError> {
        let messages = sqlx::query_as::<_, OutboxMessage>(
            r#"
            SELECT id, tenant_id, channel, recipient, title, body, attempts, created_at
            FROM notification_outbox
            WHERE tenant_id = $1 AND status = 'PENDING' AND attempts < $2
            ORDER BY created_at
            LIMIT $3
            "#,
        )
            .bind(tenant_id)
            .bind(max_attempts)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(messages)
    }

    pub async fn mark_sent(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE notification_outbox SET status = 'SENT', attempts = attempts + 1, sent_at = NOW(), last_error = NULL WHERE id = $1",
        )
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE notification_outbox SET attempts = attempts + 1, last_error = $2 WHERE id = $1",
        )
            .bind(id)
            .bind(error)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // =========================================================================
    //  NOTIFICAÇÕES INTERNAS E VENCIMENTOS
    // =========================================================================

    pub async fn insert_in_app(
        &self,
        tenant_id: Uuid,
        user_id: Option<Uuid>,
        title: &str,
        body: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO notifications (tenant_id, user_id, title, body) VALUES ($1, $2, $3, $4)",
        )
            .bind(tenant_id)
            .bind(user_id)
            .bind(title)
            .bind(body)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Aviso de vencimento; a mesma referência e data nunca geram dois avisos.
    ///
    /// Retorna `true` se a linha foi de fato criada.
    pub async fn insert_vencimento(
        &self,
        tenant_id: Uuid,
        category: VencimentoCategory,
        entry: &DueEntry,
        title: &str,
        body: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (tenant_id, category, reference_id, due_date, title, body)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (tenant_id, category, reference_id, due_date) DO NOTHING
            "#,
        )
            .bind(tenant_id)
            .bind(category.as_str())
            .bind(entry.reference_id)
            .bind(entry.due_date)
            .bind(title)
            .bind(body)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Tudo que vence até `until` (inclusive), incluindo o que já venceu.
    pub async fn due_entries(
        &self,
        tenant_id: Uuid,
        category: VencimentoCategory,
        until: NaiveDate,
    ) -> Result<Vec<DueEntry>, AppError> {
        let sql = match category {
            VencimentoCategory::Epi => {
                r#"
                SELECT id AS reference_id, name, expires_at AS due_date FROM flow_items
                WHERE tenant_id = $1 AND kind = 'EPI' AND status <> 'BAIXADO'
                  AND expires_at IS NOT NULL AND expires_at <= $2
                "#
            }
            VencimentoCategory::Equipment => {
                r#"
                SELECT id AS reference_id, name, expires_at AS due_date FROM flow_items
                WHERE tenant_id = $1 AND kind IN ('EQUIPMENT', 'TOOL') AND status <> 'BAIXADO'
                  AND expires_at IS NOT NULL AND expires_at <= $2
                "#
            }
            VencimentoCategory::Training => {
                r#"
                SELECT t.id AS reference_id, e.name || ' - ' || t.name AS name, t.expires_at AS due_date
                FROM employee_trainings t
                JOIN employees e ON e.id = t.employee_id
                WHERE t.tenant_id = $1 AND e.is_active AND t.expires_at <= $2
                "#
            }
            VencimentoCategory::Contract => {
                r#"
                SELECT id AS reference_id, name, ends_at AS due_date FROM contracts
                WHERE tenant_id = $1 AND is_active AND ends_at <= $2
                "#
            }
        };

        let entries = sqlx::query_as::<_, DueEntry>(sql)
            .bind(tenant_id)
            .bind(until)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }
}
