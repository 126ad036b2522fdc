// src/db/term_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::term::{TermSignature, TermTemplate};

/// Campos de uma nova assinatura, já renderizada e com hash calculado.
pub struct NewSignature<'a> {
    pub tenant_id: Uuid,
    pub employee_id: Uuid,
    pub template: &'a TermTemplate,
    pub reference_type: &'a str,
    pub reference_id: Option<Uuid>,
    pub rendered_body: &'a str,
    pub validation_hash: &'a str,
    pub user_agent: Option<&'a str>,
    pub ip_address: Option<&'a str>,
    pub extra: Option<&'a serde_json::Value>,
    pub signed_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TermRepository {
    pool: PgPool,
}

impl TermRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Novo modelo; a versão é a próxima para o mesmo título na empresa.
    pub async fn create_template<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        title: &str,
        body: &str,
    ) -> Result<TermTemplate, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let template = sqlx::query_as::<_, TermTemplate>(
            r#"
            INSERT INTO term_templates (tenant_id, title, body, version)
            VALUES (
                $1, $2, $3,
                COALESCE((SELECT MAX(version) FROM term_templates WHERE tenant_id = $1 AND title = $2), 0) + 1
            )
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(title)
            .bind(body)
            .fetch_one(executor)
            .await?;
        Ok(template)
    }

    pub async fn list_templates(&self, tenant_id: Uuid) -> Result<Vec<TermTemplate>, AppError> {
        let templates = sqlx::query_as::<_, TermTemplate>(
            "SELECT * FROM term_templates WHERE tenant_id = $1 AND is_active ORDER BY title, version DESC",
        )
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(templates)
    }

    pub async fn find_active_template<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        term_id: Uuid,
    ) -> Result<Option<TermTemplate>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let template = sqlx::query_as::<_, TermTemplate>(
            "SELECT * FROM term_templates WHERE tenant_id = $1 AND id = $2 AND is_active",
        )
            .bind(tenant_id)
            .bind(term_id)
            .fetch_optional(executor)
            .await?;
        Ok(template)
    }

    pub async fn insert_signature<'e, E>(
        &self,
        executor: E,
        new: &NewSignature<'_>,
    ) -> Result<TermSignature, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let signature = sqlx::query_as::<_, TermSignature>(
            r#"
            INSERT INTO term_signatures (
                tenant_id, employee_id, term_id, term_title, term_version,
                reference_type, reference_id, rendered_body, validation_hash,
                user_agent, ip_address, extra, signed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
            .bind(new.tenant_id)
            .bind(new.employee_id)
            .bind(new.template.id)
            .bind(&new.template.title)
            .bind(new.template.version)
            .bind(new.reference_type)
            .bind(new.reference_id)
            .bind(new.rendered_body)
            .bind(new.validation_hash)
            .bind(new.user_agent)
            .bind(new.ip_address)
            .bind(new.extra)
            .bind(new.signed_at)
            .fetch_one(executor)
            .await?;
        Ok(signature)
    }

    pub async fn find_signature<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        signature_id: Uuid,
    ) -> Result<Option<TermSignature>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let signature = sqlx::query_as::<_, TermSignature>(
            "SELECT * FROM term_signatures WHERE tenant_id = $1 AND id = $2",
        )
            .bind(tenant_id)
            .bind(signature_id)
            .fetch_optional(executor)
            .await?;
        Ok(signature)
    }
}
