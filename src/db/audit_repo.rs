// src/db/audit_repo.rs

use sqlx::{Executor, Postgres};

use crate::common::error::AppError;
use crate::models::audit::NewAuditEntry;

/// Escrita em `audit_logs`. Sempre chamada com a transação da mutação auditada.
#[derive(Clone, Default)]
pub struct AuditRepository;

impl AuditRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn record<'e, E>(&self, executor: E, entry: &NewAuditEntry<'_>) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (tenant_id, actor_user_id, action, entity_type, entity_id, user_agent, ip_address, details)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
            .bind(entry.tenant_id)
            .bind(entry.actor_user_id)
            .bind(entry.action)
            .bind(entry.entity_type)
            .bind(entry.entity_id)
            .bind(entry.user_agent)
            .bind(entry.ip_address)
            .bind(&entry.details)
            .execute(executor)
            .await?;
        Ok(())
    }
}
