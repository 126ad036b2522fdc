// src/common/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::flow::FlowError;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Usuário não encontrado")]
    UserNotFound,

    // --- Tenancy ---
    #[error("Cabeçalho X-Tenant-ID inválido: {0}")]
    InvalidTenantHeader(String),

    #[error("Acesso negado à empresa")]
    TenantAccessDenied,

    #[error("Já existe uma empresa com o nome '{0}'")]
    TenantNameAlreadyExists(String),

    // --- Verificação de crachá / biometria ---
    #[error("Crachá não encontrado")]
    BadgeNotFound,

    #[error("Colaborador inativo")]
    HolderInactive,

    #[error("O crachá pertence a outra empresa")]
    TenantMismatch,

    #[error("Biometria não reconhecida")]
    BiometricNotRecognized,

    // --- Termo digital ---
    #[error("Colaborador não encontrado")]
    EmployeeNotFound,

    #[error("Termo não encontrado")]
    TermNotFound,

    #[error("Assinatura não encontrada")]
    SignatureNotFound,

    #[error("A assinatura não é deste colaborador nem desta operação")]
    SignatureMismatch,

    // --- Fluxo / persistência ---
    #[error("Item não encontrado: {0}")]
    ItemNotFound(Uuid),

    #[error("Registro desatualizado: o item {0} foi alterado por outra operação")]
    StaleRecord(Uuid),

    #[error("Já existe um registro com o código '{0}'")]
    DuplicateCode(String),

    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error("Falha ao persistir a operação: {0}")]
    PersistenceError(String),

    // --- Notificações ---
    #[error("Canal de notificação não configurado: {0}")]
    ChannelNotConfigured(String),

    #[error("Canal de notificação não suportado: {0}")]
    UnsupportedChannel(String),

    #[error("Falha no envio da notificação: {0}")]
    NotificationFailed(String),

    // --- Documentos ---
    #[error("Fonte não encontrada: {0}")]
    FontNotFound(String),

    // Variante para erros de banco de dados
    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    // Variante genérica para qualquer outro erro inesperado
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    /// Código estável para o front decidir o aviso a mostrar.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadgeNotFound => "NotFound",
            AppError::HolderInactive => "Inactive",
            AppError::TenantMismatch => "TenantMismatch",
            AppError::BiometricNotRecognized => "NotRecognized",
            AppError::EmployeeNotFound => "EmployeeNotFound",
            AppError::TermNotFound => "TermNotFound",
            AppError::SignatureMismatch => "SignatureMismatch",
            AppError::StaleRecord(_) => "StaleRecord",
            AppError::PersistenceError(_) => "PersistenceError",
            AppError::ChannelNotConfigured(_) => "ChannelNotConfigured",
            AppError::UnsupportedChannel(_) => "UnsupportedChannel",
            AppError::Flow(_) => "FlowError",
            AppError::ValidationError(_) => "ValidationError",
            _ => "Error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "code": code,
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::EmailAlreadyExists => (StatusCode::CONFLICT, "Este e-mail já está em uso.".to_string()),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "E-mail ou senha inválidos.".to_string()),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Token de autenticação inválido ou ausente.".to_string(),
            ),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "Usuário não encontrado.".to_string()),
            AppError::InvalidTenantHeader(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::TenantAccessDenied => (
                StatusCode::FORBIDDEN,
                "Você não tem acesso a esta empresa.".to_string(),
            ),
            e @ AppError::TenantNameAlreadyExists(_) => (StatusCode::CONFLICT, e.to_string()),

            AppError::BadgeNotFound => (
                StatusCode::NOT_FOUND,
                "Crachá não encontrado. Escaneie novamente.".to_string(),
            ),
            AppError::HolderInactive => (
                StatusCode::FORBIDDEN,
                "Colaborador inativo. Procure o RH.".to_string(),
            ),
            AppError::TenantMismatch => (
                StatusCode::FORBIDDEN,
                "Este crachá pertence a outra empresa.".to_string(),
            ),
            AppError::BiometricNotRecognized => (
                StatusCode::UNAUTHORIZED,
                "Biometria não reconhecida. Tente novamente.".to_string(),
            ),
            AppError::EmployeeNotFound => (StatusCode::NOT_FOUND, "Colaborador não encontrado.".to_string()),
            AppError::TermNotFound => (StatusCode::NOT_FOUND, "Termo não encontrado.".to_string()),
            AppError::SignatureNotFound => (StatusCode::NOT_FOUND, "Assinatura não encontrada.".to_string()),
            e @ AppError::SignatureMismatch => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            e @ AppError::ItemNotFound(_) => (StatusCode::NOT_FOUND, e.to_string()),
            e @ AppError::StaleRecord(_) => (StatusCode::CONFLICT, e.to_string()),
            e @ AppError::DuplicateCode(_) => (StatusCode::CONFLICT, e.to_string()),
            AppError::Flow(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            e @ AppError::ChannelNotConfigured(_) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
            e @ AppError::UnsupportedChannel(_) => (StatusCode::BAD_REQUEST, e.to_string()),
            e @ AppError::NotificationFailed(_) => {
                tracing::warn!("Notificação falhou: {}", e);
                (StatusCode::BAD_GATEWAY, e.to_string())
            }

            // Todos os outros erros (DatabaseError, PersistenceError, InternalServerError) viram 500.
            // O `tracing` loga a mensagem detalhada que `thiserror` nos deu.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Ocorreu um erro inesperado.".to_string())
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message, "code": code }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::flow::FlowStep;

    #[test]
    fn verification_failures_map_to_distinct_statuses() {
        assert_eq!(AppError::BadgeNotFound.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::TenantMismatch.into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::HolderInactive.into_response().status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::BiometricNotRecognized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn flow_errors_are_unprocessable() {
        let err: AppError = FlowError::InvalidTransition { from: FlowStep::Auth, action: "confirm" }.into();
        assert_eq!(err.code(), "FlowError");
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn stale_writes_are_conflicts() {
        let resp = AppError::StaleRecord(Uuid::nil()).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn database_errors_hide_details() {
        let resp = AppError::DatabaseError(sqlx::Error::RowNotFound).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
