// src/handlers/terms.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        session::Session,
        term::{CreateTermTemplatePayload, SignatureRequest, SignedTerm, TermTemplate},
    },
};

#[utoipa::path(
    post,
    path = "/api/terms",
    tag = "Terms",
    request_body = CreateTermTemplatePayload,
    responses(
        (status = 201, description = "Modelo de termo criado (nova versão se o título já existir)", body = TermTemplate)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_term_template(
    State(app_state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateTermTemplatePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let template = app_state
        .term_service
        .create_template(&session, &payload.title, &payload.body)
        .await?;
    Ok((StatusCode::CREATED, Json(template)))
}

#[utoipa::path(
    get,
    path = "/api/terms",
    tag = "Terms",
    responses(
        (status = 200, description = "Modelos ativos", body = [TermTemplate])
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_term_templates(
    State(app_state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<TermTemplate>>, AppError> {
    Ok(Json(app_state.term_service.list_templates(&session).await?))
}

#[utoipa::path(
    post,
    path = "/api/terms/sign",
    tag = "Terms",
    request_body = SignatureRequest,
    responses(
        (status = 201, description = "Termo assinado", body = SignedTerm),
        (status = 404, description = "Colaborador ou termo não encontrado")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn sign_term(
    State(app_state): State<AppState>,
    session: Session,
    Json(payload): Json<SignatureRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let signed = app_state.term_service.request_signature(&session, &payload).await?;
    Ok((StatusCode::CREATED, Json(signed)))
}
