// src/handlers/documents.rs

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::AppState,
    models::{flow::EntityKind, session::Session},
};

#[utoipa::path(
    get,
    path = "/api/qr/{kind}/{id}",
    tag = "Documents",
    responses(
        (status = 200, description = "QR code em PNG", content_type = "image/png"),
        (status = 400, description = "Tipo de entidade desconhecido")
    ),
    params(
        ("kind" = String, Path, description = "employee | equipment | epi | tool | material (ou o prefixo EMP, EQP, ...)"),
        ("id" = String, Path, description = "Identificador gravado no QR"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn qr_code_png(
    State(app_state): State<AppState>,
    _session: Session,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let kind = match EntityKind::parse(&kind) {
        EntityKind::Unknown => {
            let mut errors = validator::ValidationErrors::new();
            let mut err = validator::ValidationError::new("kind");
            err.message = Some(format!("Tipo de entidade desconhecido: {}", kind).into());
            errors.add("kind", err);
            return Err(AppError::ValidationError(errors));
        }
        kind => kind,
    };

    let payload = app_state.registry_service.qr_payload(kind, &id);
    let png = app_state.document_service.qr_png(&payload)?;

    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

#[utoipa::path(
    get,
    path = "/api/terms/signatures/{signature_id}/pdf",
    tag = "Documents",
    responses(
        (status = 200, description = "PDF do termo assinado", content_type = "application/pdf"),
        (status = 404, description = "Assinatura não encontrada")
    ),
    params(
        ("signature_id" = Uuid, Path, description = "ID da Assinatura"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Empresa")
    ),
    security(("api_jwt" = []))
)]
pub async fn signed_term_pdf(
    State(app_state): State<AppState>,
    session: Session,
    Path(signature_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let signature = app_state.term_service.find_signature(&session, signature_id).await?;
    let pdf_bytes = app_state.document_service.signed_term_pdf(&signature)?;

    // Configura os Headers para o navegador baixar ou mostrar o PDF
    let disposition = format!("attachment; filename=\"termo_{}.pdf\"", signature_id);
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf_bytes,
    )
        .into_response())
}
