// src/handlers/flows.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    flow::{CollectorInput, FlowRun},
    models::{
        employee::BiometricModality,
        flow::{FlowStep, FlowType, OperationDetail, OperationRecord},
        session::Session,
        term::SignedTerm,
    },
};

// ---
// Payloads
// ---

/// Como o colaborador se identifica no totem.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum FlowAuth {
    Badge {
        code: String,
    },
    Biometric {
        modality: BiometricModality,
        payload: String,
    },
}

/// Uma execução inteira enviada de uma vez pelo totem.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowRunPayload {
    pub auth: FlowAuth,
    pub flow_type: FlowType,
    #[validate(length(min = 1, message = "Selecione ao menos um item."))]
    pub item_ids: Vec<Uuid>,
    pub details: CollectorInput,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowRunResult {
    pub run_id: Uuid,
    pub record_id: Uuid,
    pub step: FlowStep,
    pub flow_type: FlowType,
    pub employee_id: Uuid,
    #[schema(value_type = Object)]
    pub details: OperationDetail,
    pub signature: Option<SignedTerm>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordCreated {
    pub record_id: Uuid,
}

// ---
// Handlers
// ---

#[utoipa::path(
    post,
    path = "/api/flows/records",
    tag = "Flows",
    request_body = OperationRecord,
    responses(
        (status = 201, description = "Operação persistida (reenvio do mesmo runId devolve o mesmo registro)", body = RecordCreated),
        (status = 409, description = "Item alterado por outra operação")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn persist_record(
    State(app_state): State<AppState>,
    session: Session,
    Json(record): Json<OperationRecord>,
) -> Result<impl IntoResponse, AppError> {
    let record_id = app_state.flow_service.persist_operation(&session, &record).await?;

    // Entrega best-effort; o que falhar fica na fila para o agendador
    if let Err(e) = app_state.notification_service.dispatch_pending(session.tenant_id).await {
        tracing::warn!(%record_id, "Notificações pendentes não despachadas: {}", e);
    }

    Ok((StatusCode::CREATED, Json(RecordCreated { record_id })))
}

#[utoipa::path(
    post,
    path = "/api/flows/run",
    tag = "Flows",
    request_body = FlowRunPayload,
    responses(
        (status = 201, description = "Fluxo concluído", body = FlowRunResult),
        (status = 404, description = "Crachá, item ou termo não encontrado"),
        (status = 422, description = "Detalhes incompletos ou transição inválida")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn run_flow(
    State(app_state): State<AppState>,
    session: Session,
    Json(payload): Json<FlowRunPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let orchestrator = app_state.flow_orchestrator();
    let mut run = FlowRun::new();

    match &payload.auth {
        FlowAuth::Badge { code } => {
            orchestrator.authenticate_badge(&session, &mut run, code).await?;
        }
        FlowAuth::Biometric { modality, payload } => {
            orchestrator.authenticate_biometric(&session, &mut run, *modality, payload).await?;
        }
    }

    let items = app_state.flow_service.load_items(&session, &payload.item_ids).await?;
    orchestrator.select_items(&mut run, items, payload.flow_type)?;
    orchestrator.submit_details(&session, &mut run, &payload.details).await?;
    let record_id = orchestrator.confirm(&session, &mut run).await?;

    let record = run.operation_record()?;
    let result = FlowRunResult {
        run_id: run.id(),
        record_id,
        step: run.current_step(),
        flow_type: record.flow_type,
        employee_id: record.employee_id,
        details: record.details,
        signature: run.signature().cloned(),
    };

    Ok((StatusCode::CREATED, Json(result)))
}
