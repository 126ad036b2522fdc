// src/handlers/employees.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        employee::{CreateEmployeePayload, Employee, EmployeeBadge, VerifyBiometricPayload},
        flow::PersistedOperation,
        session::Session,
    },
};

#[utoipa::path(
    post,
    path = "/api/employees",
    tag = "Employees",
    request_body = CreateEmployeePayload,
    responses(
        (status = 201, description = "Colaborador criado, com o payload do crachá", body = EmployeeBadge),
        (status = 409, description = "Matrícula já cadastrada")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_employee(
    State(app_state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateEmployeePayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let badge = app_state.registry_service.create_employee(&session, &payload).await?;
    Ok((StatusCode::CREATED, Json(badge)))
}

#[utoipa::path(
    get,
    path = "/api/employees",
    tag = "Employees",
    responses(
        (status = 200, description = "Colaboradores da empresa", body = [Employee])
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_employees(
    State(app_state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<Employee>>, AppError> {
    Ok(Json(app_state.registry_service.list_employees(&session).await?))
}

#[utoipa::path(
    post,
    path = "/api/employees/{employee_id}/biometrics",
    tag = "Employees",
    request_body = VerifyBiometricPayload,
    responses(
        (status = 204, description = "Referência biométrica cadastrada"),
        (status = 404, description = "Colaborador não encontrado")
    ),
    params(
        ("employee_id" = Uuid, Path, description = "ID do Colaborador"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn enroll_biometric(
    State(app_state): State<AppState>,
    session: Session,
    Path(employee_id): Path<Uuid>,
    Json(payload): Json<VerifyBiometricPayload>,
) -> Result<StatusCode, AppError> {
    payload.validate()?;
    app_state
        .verification_service
        .enroll_biometric(&session, employee_id, payload.modality, &payload.payload)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/employees/{employee_id}/records",
    tag = "Employees",
    responses(
        (status = 200, description = "Operações registradas para o colaborador", body = [PersistedOperation]),
        (status = 404, description = "Colaborador não encontrado")
    ),
    params(
        ("employee_id" = Uuid, Path, description = "ID do Colaborador"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_employee_records(
    State(app_state): State<AppState>,
    session: Session,
    Path(employee_id): Path<Uuid>,
) -> Result<Json<Vec<PersistedOperation>>, AppError> {
    let records = app_state.registry_service.employee_records(&session, employee_id).await?;
    Ok(Json(records))
}
