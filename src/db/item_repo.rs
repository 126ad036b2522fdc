// src/db/item_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::common::error::AppError;
use crate::models::flow::{CreateFlowItemPayload, StoredFlowItem};

#[derive(Clone)]
pub struct ItemRepository {
    pool: PgPool,
}

impl ItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_item<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        payload: &CreateFlowItemPayload,
    ) -> Result<StoredFlowItem, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, StoredFlowItem>(
            r#"
            INSERT INTO flow_items (tenant_id, kind, name, code, quantity, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
            .bind(tenant_id)
            .bind(payload.kind)
            .bind(&payload.name)
            .bind(&payload.code)
            .bind(payload.quantity)
            .bind(payload.expires_at)
            .fetch_one(executor)
            .await
            .map_err(|e| {
                if let Some(db_err) = e.as_database_error() {
                    if db_err.is_unique_violation() {
                        return AppError::DuplicateCode(payload.code.clone());
                    }
                }
                AppError::DatabaseError(e)
            })
    }

    pub async fn list_items(&self, tenant_id: Uuid) -> Result<Vec<StoredFlowItem>, AppError> {
        let items = sqlx::query_as::<_, StoredFlowItem>(
            "SELECT * FROM flow_items WHERE tenant_id = $1 ORDER BY kind, name",
        )
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    pub async fn find_many<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<StoredFlowItem>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let items = sqlx::query_as::<_, StoredFlowItem>(
            "SELECT * FROM flow_items WHERE tenant_id = $1 AND id = ANY($2)",
        )
            .bind(tenant_id)
            .bind(ids)
            .fetch_all(executor)
            .await?;
        Ok(items)
    }

    /// Aplica a mudança de posse/estado só se a versão ainda for a que o fluxo leu.
    ///
    /// Retorna `false` quando nenhuma linha bateu (registro alterado por outra pessoa).
    pub async fn apply_transition<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        item_id: Uuid,
        read_version: i32,
        holder_employee_id: Option<Uuid>,
        status: &str,
        quantity_used: Decimal,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE flow_items
            SET holder_employee_id = $4,
                status = $5,
                quantity = GREATEST(quantity - $6, 0),
                version = version + 1,
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2 AND version = $3
            "#,
        )
            .bind(tenant_id)
            .bind(item_id)
            .bind(read_version)
            .bind(holder_employee_id)
            .bind(status)
            .bind(quantity_used)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}
