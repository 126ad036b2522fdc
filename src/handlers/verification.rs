// src/handlers/verification.rs

use axum::{extract::State, Json};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        employee::{BiometricMatch, VerifiedHolder, VerifyBadgePayload, VerifyBiometricPayload},
        session::Session,
    },
};

#[utoipa::path(
    post,
    path = "/api/verify/badge",
    tag = "Verification",
    request_body = VerifyBadgePayload,
    responses(
        (status = 200, description = "Crachá válido", body = VerifiedHolder),
        (status = 404, description = "Crachá não encontrado"),
        (status = 403, description = "Colaborador inativo ou de outra empresa")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn verify_badge(
    State(app_state): State<AppState>,
    session: Session,
    Json(payload): Json<VerifyBadgePayload>,
) -> Result<Json<VerifiedHolder>, AppError> {
    payload.validate()?;
    let holder = app_state
        .verification_service
        .verify_badge(&session, &payload.code, payload.tenant_id.or(Some(session.tenant_id)))
        .await?;
    Ok(Json(holder))
}

#[utoipa::path(
    post,
    path = "/api/verify/biometric",
    tag = "Verification",
    request_body = VerifyBiometricPayload,
    responses(
        (status = 200, description = "Biometria reconhecida", body = BiometricMatch),
        (status = 401, description = "Biometria não reconhecida")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn verify_biometric(
    State(app_state): State<AppState>,
    session: Session,
    Json(payload): Json<VerifyBiometricPayload>,
) -> Result<Json<BiometricMatch>, AppError> {
    payload.validate()?;
    let holder = app_state
        .verification_service
        .verify_biometric(&session, payload.modality, &payload.payload)
        .await?;

    Ok(Json(BiometricMatch {
        employee_id: holder.employee.id,
        employee_name: holder.employee.name,
        linked_account_id: holder.linked_account.map(|a| a.id),
    }))
}
