// src/db/tenancy_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;
use crate::common::error::AppError;
use crate::models::tenancy::{Tenant, UserTenant};

#[derive(Clone)]
pub struct TenantRepository {
    pool: PgPool,
}

impl TenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Verifica se um utilizador tem permissão para aceder a um tenant.
    /// Esta é a verificação de segurança de autorização mais importante.
    pub async fn check_user_tenancy(
        &self,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<bool, AppError> {
        // SELECT EXISTS: só queremos saber se a linha existe.
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_tenants
                WHERE user_id = $1 AND tenant_id = $2
            )
            "#,
        )
            .bind(user_id)
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    pub async fn user_has_tenant_with_name(&self, user_id: Uuid, name: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM tenants t
                JOIN user_tenants ut ON ut.tenant_id = t.id
                WHERE ut.user_id = $1 AND lower(t.name) = lower($2)
            )
            "#,
        )
            .bind(user_id)
            .bind(name)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    /// Cria um novo tenant (Empresa) na base de dados.
    pub async fn create_tenant<'e, E>(
        &self,
        executor: E, // Aceita um executor (pool ou transação)
        name: &str,
        description: Option<&str>,
    ) -> Result<Tenant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let tenant = sqlx::query_as::<_, Tenant>(
            r#"
            INSERT INTO tenants (name, description)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
            .bind(name)
            .bind(description)
            .fetch_one(executor)
            .await?;

        Ok(tenant)
    }

    /// Atribui um utilizador a um tenant (na tabela-ponte).
    pub async fn assign_user_to_tenant<'e, E>(
        &self,
        executor: E,
        user_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<UserTenant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let link = sqlx::query_as::<_, UserTenant>(
            r#"
            INSERT INTO user_tenants (user_id, tenant_id)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
            .bind(user_id)
            .bind(tenant_id)
            .fetch_one(executor)
            .await?;

        Ok(link)
    }

    pub async fn get_tenants_for_user(&self, user_id: Uuid) -> Result<Vec<Tenant>, AppError> {
        let tenants = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT t.* FROM tenants t
            JOIN user_tenants ut ON ut.tenant_id = t.id
            WHERE ut.user_id = $1
            ORDER BY t.name
            "#,
        )
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(tenants)
    }

    /// Todas as empresas; usado pela varredura agendada de vencimentos.
    pub async fn list_tenant_ids(&self) -> Result<Vec<Uuid>, AppError> {
        let ids = sqlx::query_scalar::<_, Uuid>("SELECT id FROM tenants ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}
