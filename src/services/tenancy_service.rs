// src/services/tenancy_service.rs

use crate::{
    common::error::AppError,
    db::TenantRepository,
    models::tenancy::Tenant,
};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct TenantService {
    tenant_repo: TenantRepository,
    pool: PgPool, // Usamos a pool para iniciar transações
}

impl TenantService {
    pub fn new(tenant_repo: TenantRepository, pool: PgPool) -> Self {
        Self { tenant_repo, pool }
    }

    /// Cria uma nova empresa e, atomicamente, torna o utilizador que a criou
    /// o seu primeiro membro.
    pub async fn create_tenant_with_owner(
        &self,
        name: &str,
        description: Option<&str>,
        owner_id: Uuid,
    ) -> Result<Tenant, AppError> {
        let already_exists = self.tenant_repo
            .user_has_tenant_with_name(owner_id, name)
            .await?;

        if already_exists {
            return Err(AppError::TenantNameAlreadyExists(name.to_string()));
        }

        let mut tx = self.pool.begin().await?;

        let new_tenant = self.tenant_repo
            .create_tenant(&mut *tx, name, description)
            .await?;

        self.tenant_repo
            .assign_user_to_tenant(&mut *tx, owner_id, new_tenant.id)
            .await?;

        tx.commit().await?;
        tracing::info!(tenant_id = %new_tenant.id, %owner_id, "Empresa criada");

        Ok(new_tenant)
    }

    pub async fn list_user_tenants(&self, user_id: Uuid) -> Result<Vec<Tenant>, AppError> {
        self.tenant_repo.get_tenants_for_user(user_id).await
    }

    pub async fn is_member(&self, user_id: Uuid, tenant_id: Uuid) -> Result<bool, AppError> {
        self.tenant_repo.check_user_tenancy(user_id, tenant_id).await
    }
}
