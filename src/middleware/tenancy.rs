// src/middleware/tenancy.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{common::error::AppError, config::AppState, models::auth::User};

// O nome do nosso cabeçalho HTTP customizado
const TENANT_ID_HEADER: &str = "x-tenant-id";

// A empresa que o utilizador quer aceder, já verificada pelo `tenant_guard`.
#[derive(Debug, Clone, Copy)]
pub struct TenantContext(pub Uuid);

/// Converte o valor do cabeçalho X-Tenant-ID em UUID.
pub fn parse_tenant_header(value: Option<&str>) -> Result<Uuid, AppError> {
    let value = value.ok_or_else(|| {
        AppError::InvalidTenantHeader("O cabeçalho X-Tenant-ID é obrigatório.".to_string())
    })?;
    Uuid::parse_str(value.trim()).map_err(|_| {
        AppError::InvalidTenantHeader("Cabeçalho X-Tenant-ID inválido (não é um UUID).".to_string())
    })
}

/// Roda depois do `auth_guard`: exige o cabeçalho e confere a filiação do
/// utilizador à empresa antes de deixar a requisição seguir.
pub async fn tenant_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = request
        .extensions()
        .get::<User>()
        .map(|u| u.id)
        .ok_or(AppError::InvalidToken)?;

    let header_value = request
        .headers()
        .get(TENANT_ID_HEADER)
        .map(|v| v.to_str().map_err(|_| {
            AppError::InvalidTenantHeader("Cabeçalho X-Tenant-ID contém caracteres inválidos.".to_string())
        }))
        .transpose()?;
    let tenant_id = parse_tenant_header(header_value)?;

    if !app_state.tenant_service.is_member(user_id, tenant_id).await? {
        tracing::warn!(%user_id, %tenant_id, "Acesso negado à empresa");
        return Err(AppError::TenantAccessDenied);
    }

    request.extensions_mut().insert(TenantContext(tenant_id));
    Ok(next.run(request).await)
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .copied()
            .ok_or(AppError::TenantAccessDenied)
    }
}
