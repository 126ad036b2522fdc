// src/db/operations_repo.rs

use sqlx::{types::Json, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::flow::{OperationRecord, PersistedOperation},
};

#[derive(Clone)]
pub struct OperationsRepository {
    pool: PgPool,
}

impl OperationsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    //  REGISTROS DE OPERAÇÃO (entrega, devolução, troca, aplicação)
    // =========================================================================

    pub async fn find_record<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<PersistedOperation>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let record = sqlx::query_as::<_, PersistedOperation>(
            "SELECT * FROM operation_records WHERE tenant_id = $1 AND id = $2",
        )
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(record)
    }

    /// Insere o registro usando o id da execução como chave primária.
    pub async fn insert_record<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        actor_user_id: Uuid,
        record: &OperationRecord,
    ) -> Result<PersistedOperation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let persisted = sqlx::query_as::<_, PersistedOperation>(
            r#"
            INSERT INTO operation_records (
                id, tenant_id, flow_type, employee_id, actor_user_id, items, details, signature_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
            .bind(record.run_id)
            .bind(tenant_id)
            .bind(record.flow_type)
            .bind(record.employee_id)
            .bind(actor_user_id)
            .bind(Json(&record.items))
            .bind(Json(&record.details))
            .bind(record.signature_id)
            .fetch_one(executor)
            .await?;

        Ok(persisted)
    }

    pub async fn list_for_employee(
        &self,
        tenant_id: Uuid,
        employee_id: Uuid,
    ) -> Result<Vec<PersistedOperation>, AppError> {
        let records = sqlx::query_as::<_, PersistedOperation>(
            r#"
            SELECT * FROM operation_records
            WHERE tenant_id = $1 AND employee_id = $2
            ORDER BY created_at DESC
            "#,
        )
            .bind(tenant_id)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }
}
