// src/models/flow.rs

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// --- Enums ---

/// Tipo de entidade identificada por um QR code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "entity_kind", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Employee,
    Equipment,
    Epi,
    Tool,
    Material,
    Unknown,
}

impl EntityKind {
    /// Prefixo gravado no campo `type` do payload do QR.
    pub fn prefix(self) -> &'static str {
        match self {
            EntityKind::Employee => "EMP",
            EntityKind::Equipment => "EQP",
            EntityKind::Epi => "EPI",
            EntityKind::Tool => "TOOL",
            EntityKind::Material => "MAT",
            EntityKind::Unknown => "UNKNOWN",
        }
    }

    pub fn from_prefix(prefix: &str) -> Self {
        match prefix {
            "EMP" => EntityKind::Employee,
            "EQP" => EntityKind::Equipment,
            "EPI" => EntityKind::Epi,
            "TOOL" => EntityKind::Tool,
            "MAT" => EntityKind::Material,
            _ => EntityKind::Unknown,
        }
    }

    /// Aceita tanto o prefixo (`EQP`) quanto o nome (`equipment`), como vem na URL.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "employee" => EntityKind::Employee,
            "equipment" => EntityKind::Equipment,
            "epi" => EntityKind::Epi,
            "tool" => EntityKind::Tool,
            "material" => EntityKind::Material,
            _ => EntityKind::from_prefix(&value.to_ascii_uppercase()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "flow_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum FlowType {
    Delivery,
    Return,
    Exchange,
    Application,
}

impl FlowType {
    pub fn label(self) -> &'static str {
        match self {
            FlowType::Delivery => "Entrega",
            FlowType::Return => "Devolução",
            FlowType::Exchange => "Troca",
            FlowType::Application => "Aplicação",
        }
    }
}

/// Etapas de uma execução do fluxo, em ordem fixa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FlowStep {
    Auth,
    Items,
    Details,
    Confirm,
    Complete,
}

impl FlowStep {
    pub const ORDER: [FlowStep; 5] = [
        FlowStep::Auth,
        FlowStep::Items,
        FlowStep::Details,
        FlowStep::Confirm,
        FlowStep::Complete,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ORDER.get(index).copied()
    }
}

// --- Structs ---

/// Unidade (equipamento, EPI, ferramenta, material) envolvida na operação.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowItem {
    pub id: Uuid,
    #[schema(example = "Capacete de Segurança")]
    pub name: String,
    #[schema(example = "EPI-001")]
    pub code: String,
    pub kind: EntityKind,
    #[schema(example = "1")]
    pub quantity: Decimal,
    /// Versão lida do registro; a persistência rejeita escrita com versão antiga.
    #[schema(example = 3)]
    pub version: i32,
}

/// Registro completo de estoque de um item, como está no banco.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoredFlowItem {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub kind: EntityKind,
    pub name: String,
    pub code: String,
    pub quantity: Decimal,
    pub holder_employee_id: Option<Uuid>,
    #[schema(example = "DISPONIVEL")]
    pub status: String,
    pub expires_at: Option<chrono::NaiveDate>,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StoredFlowItem> for FlowItem {
    fn from(item: StoredFlowItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
            code: item.code,
            kind: item.kind,
            quantity: item.quantity,
            version: item.version,
        }
    }
}

/// Campos da operação em ordem de exibição: "Motivo" -> "Tamanho incorreto ...".
pub type OperationDetail = IndexMap<String, String>;

/// O registro mesclado que sai de uma execução concluída.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OperationRecord {
    /// Id da execução; vira o id do registro e torna o reenvio idempotente.
    pub run_id: Uuid,
    pub flow_type: FlowType,
    pub employee_id: Uuid,
    #[schema(example = "João Silva")]
    pub employee_name: String,
    #[validate(length(min = 1, message = "Selecione ao menos um item."))]
    pub items: Vec<FlowItem>,
    #[schema(value_type = Object)]
    pub details: OperationDetail,
    pub signature_id: Option<Uuid>,
}

/// Linha da tabela `operation_records`.
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PersistedOperation {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    pub flow_type: FlowType,
    pub employee_id: Uuid,
    pub actor_user_id: Uuid,
    #[schema(value_type = Object)]
    pub items: sqlx::types::Json<Vec<FlowItem>>,
    #[schema(value_type = Object)]
    pub details: sqlx::types::Json<OperationDetail>,
    pub signature_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

fn validate_positive(val: &Decimal) -> Result<(), ValidationError> {
    if *val <= Decimal::ZERO {
        let mut err = ValidationError::new("range");
        err.message = Some("A quantidade deve ser maior que zero.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFlowItemPayload {
    pub kind: EntityKind,
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    #[validate(length(min = 1, message = "O código é obrigatório."))]
    pub code: String,
    #[validate(custom(function = "validate_positive"))]
    #[schema(example = "1")]
    pub quantity: Decimal,
    pub expires_at: Option<chrono::NaiveDate>,
}
