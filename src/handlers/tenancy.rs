// src/handlers/tenancy.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::tenancy::{CreateTenantPayload, Tenant},
};

#[utoipa::path(
    post,
    path = "/api/tenants",
    tag = "Tenancy",
    request_body = CreateTenantPayload,
    responses(
        (status = 201, description = "Empresa criada", body = Tenant),
        (status = 409, description = "Já existe uma empresa com este nome")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_tenant(
    State(app_state): State<AppState>,
    // Precisamos do utilizador autenticado para o podermos tornar "dono"
    user: AuthenticatedUser,
    Json(payload): Json<CreateTenantPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let new_tenant = app_state
        .tenant_service
        .create_tenant_with_owner(&payload.name, payload.description.as_deref(), user.0.id)
        .await?;

    Ok((StatusCode::CREATED, Json(new_tenant)))
}

#[utoipa::path(
    get,
    path = "/api/tenants",
    tag = "Tenancy",
    responses(
        (status = 200, description = "Empresas do operador", body = [Tenant])
    ),
    security(("api_jwt" = []))
)]
pub async fn list_my_tenants(
    State(app_state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<Tenant>>, AppError> {
    let tenants = app_state.tenant_service.list_user_tenants(user.0.id).await?;
    Ok(Json(tenants))
}
