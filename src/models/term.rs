// src/models/term.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Modelo de termo cadastrado pela empresa (com placeholders).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TermTemplate {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "Termo de Responsabilidade de EPI")]
    pub title: String,
    #[schema(example = "Eu, {NOME_COLABORADOR}, crachá {NUMERO_CRACHA}, recebi:\n{LISTA_ITEMS}\nEm {DATA}.\n{ASSINATURA_DIGITAL}")]
    pub body: String,
    pub version: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Registro persistido de uma assinatura digital.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TermSignature {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub employee_id: Uuid,
    pub term_id: Uuid,
    pub term_title: String,
    pub term_version: i32,
    pub reference_type: String,
    pub reference_id: Option<Uuid>,
    pub rendered_body: String,
    pub validation_hash: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    #[schema(value_type = Object)]
    pub extra: Option<serde_json::Value>,
    pub signed_at: DateTime<Utc>,
}

/// O artefato assinado devolvido ao cliente.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignedTerm {
    pub signature_id: Uuid,
    pub title: String,
    pub rendered_body: String,
    pub version: i32,
    pub validation_hash: String,
    pub signed_at: DateTime<Utc>,
}

impl From<TermSignature> for SignedTerm {
    fn from(s: TermSignature) -> Self {
        Self {
            signature_id: s.id,
            title: s.term_title,
            rendered_body: s.rendered_body,
            version: s.term_version,
            validation_hash: s.validation_hash,
            signed_at: s.signed_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRequest {
    pub employee_id: Uuid,
    pub term_id: Uuid,
    #[validate(length(min = 1, message = "Informe o tipo de referência."))]
    #[schema(example = "DELIVERY")]
    pub reference_type: String,
    pub reference_id: Option<Uuid>,
    /// Itens listados em {LISTA_ITEMS}; vazio quando a referência não é uma entrega.
    #[serde(default)]
    pub items: Vec<crate::models::flow::FlowItem>,
    #[schema(value_type = Object)]
    pub extra: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTermTemplatePayload {
    #[validate(length(min = 1, message = "O título é obrigatório."))]
    pub title: String,
    #[validate(length(min = 1, message = "O corpo do termo é obrigatório."))]
    pub body: String,
}
