// src/handlers/notifications.rs

use axum::{extract::State, Json};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        notification::{NotifyOutcome, NotifyRequest, VencimentoScanPayload, VencimentoScanResult},
        session::Session,
    },
};

#[utoipa::path(
    post,
    path = "/api/notifications",
    tag = "Notifications",
    request_body = NotifyRequest,
    responses(
        (status = 200, description = "Resultado do envio", body = NotifyOutcome),
        (status = 400, description = "Canal não suportado"),
        (status = 503, description = "Canal não configurado")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn notify(
    State(app_state): State<AppState>,
    session: Session,
    Json(payload): Json<NotifyRequest>,
) -> Result<Json<NotifyOutcome>, AppError> {
    payload.validate()?;
    let outcome = app_state.notification_service.notify(&session, &payload).await?;
    Ok(Json(outcome))
}

#[utoipa::path(
    post,
    path = "/api/notifications/vencimentos/scan",
    tag = "Notifications",
    request_body = VencimentoScanPayload,
    responses(
        (status = 200, description = "Avisos criados", body = VencimentoScanResult)
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn scan_vencimentos(
    State(app_state): State<AppState>,
    session: Session,
    Json(payload): Json<VencimentoScanPayload>,
) -> Result<Json<VencimentoScanResult>, AppError> {
    payload.validate()?;
    let notifications_created = app_state
        .notification_service
        .scan_vencimentos(session.tenant_id, payload.days_ahead, &payload.categories, Utc::now().date_naive())
        .await?;
    Ok(Json(VencimentoScanResult { notifications_created }))
}
