// src/models/notification.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "notification_channel", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Email,
    Whatsapp,
    Telegram,
    /// Notificação interna (sino do painel), gravada apenas no banco.
    InApp,
}

impl NotificationChannel {
    /// Converte o nome vindo da API; canais desconhecidos viram erro `UnsupportedChannel`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "email" => Some(NotificationChannel::Email),
            "whatsapp" => Some(NotificationChannel::Whatsapp),
            "telegram" => Some(NotificationChannel::Telegram),
            "inapp" | "in_app" => Some(NotificationChannel::InApp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotifyRequest {
    #[schema(example = "email")]
    pub channel: String,
    #[validate(length(min = 1, message = "O destinatário é obrigatório."))]
    pub recipient: String,
    #[validate(length(min = 1, message = "O título é obrigatório."))]
    pub title: String,
    pub body: String,
    pub user_id: Option<Uuid>,
    #[schema(value_type = Object)]
    pub extra: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotifyOutcome {
    pub success: bool,
    pub details: String,
}

/// Linha da fila de saída (outbox) de notificações.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OutboxMessage {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub channel: NotificationChannel,
    pub recipient: String,
    pub title: String,
    pub body: String,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}

// --- Vencimentos ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum VencimentoCategory {
    Epi,
    Equipment,
    Training,
    Contract,
}

impl VencimentoCategory {
    pub const ALL: [VencimentoCategory; 4] = [
        VencimentoCategory::Epi,
        VencimentoCategory::Equipment,
        VencimentoCategory::Training,
        VencimentoCategory::Contract,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            VencimentoCategory::Epi => "epi",
            VencimentoCategory::Equipment => "equipment",
            VencimentoCategory::Training => "training",
            VencimentoCategory::Contract => "contract",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VencimentoCategory::Epi => "EPI",
            VencimentoCategory::Equipment => "Equipamento",
            VencimentoCategory::Training => "Treinamento",
            VencimentoCategory::Contract => "Contrato",
        }
    }
}

/// Algo com data de vencimento, vindo de qualquer uma das categorias.
#[derive(Debug, Clone, FromRow)]
pub struct DueEntry {
    pub reference_id: Uuid,
    pub name: String,
    pub due_date: NaiveDate,
}

/// Janela máxima da varredura de vencimentos, em dias.
pub const MAX_DAYS_AHEAD: i64 = 365;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VencimentoScanPayload {
    #[validate(range(min = 0, max = 365, message = "daysAhead deve estar entre 0 e 365."))]
    #[serde(default = "default_days_ahead")]
    pub days_ahead: i64,
    /// Vazio = todas as categorias.
    #[serde(default)]
    pub categories: Vec<VencimentoCategory>,
}

fn default_days_ahead() -> i64 {
    30
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VencimentoScanResult {
    pub notifications_created: u64,
}
