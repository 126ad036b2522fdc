// src/handlers/items.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{
        flow::{CreateFlowItemPayload, StoredFlowItem},
        session::Session,
    },
};

#[utoipa::path(
    post,
    path = "/api/items",
    tag = "Items",
    request_body = CreateFlowItemPayload,
    responses(
        (status = 201, description = "Item cadastrado", body = StoredFlowItem),
        (status = 409, description = "Código já cadastrado")
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_item(
    State(app_state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateFlowItemPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let item = app_state.registry_service.create_item(&session, &payload).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

#[utoipa::path(
    get,
    path = "/api/items",
    tag = "Items",
    responses(
        (status = 200, description = "Itens da empresa", body = [StoredFlowItem])
    ),
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_items(
    State(app_state): State<AppState>,
    session: Session,
) -> Result<Json<Vec<StoredFlowItem>>, AppError> {
    Ok(Json(app_state.registry_service.list_items(&session).await?))
}
