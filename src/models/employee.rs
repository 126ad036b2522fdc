// src/models/employee.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// ---
// Colaborador (o "portador" do crachá e dos itens)
// ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: Uuid,
    #[schema(ignore)]
    pub tenant_id: Uuid,
    #[schema(example = "João Silva")]
    pub name: String,
    #[schema(example = "COLAB-001")]
    pub badge_code: String,
    #[schema(example = "Obras")]
    pub department: Option<String>,
    #[schema(example = "Pedreiro")]
    pub role: Option<String>,
    pub photo_url: Option<String>,
    pub is_active: bool,
    /// Conta de usuário (operador) ligada ao colaborador, se houver.
    pub linked_user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Perfil público da conta vinculada ao colaborador.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LinkedAccount {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
}

/// Resultado da verificação de crachá.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedHolder {
    pub employee: Employee,
    pub linked_account: Option<LinkedAccount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "biometric_modality", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum BiometricModality {
    Facial,
    Fingerprint,
}

/// Resultado da verificação biométrica.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BiometricMatch {
    pub employee_id: Uuid,
    pub employee_name: String,
    pub linked_account_id: Option<Uuid>,
}

// --- Payloads ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployeePayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    pub name: String,
    #[validate(length(min = 1, message = "A matrícula do crachá é obrigatória."))]
    pub badge_code: String,
    pub department: Option<String>,
    pub role: Option<String>,
    pub photo_url: Option<String>,
    pub linked_user_id: Option<Uuid>,
}

/// Colaborador recém-criado junto com o payload impresso no crachá.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeBadge {
    pub employee: Employee,
    pub qr_payload: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyBadgePayload {
    #[validate(length(min = 1, message = "Escaneie ou digite o crachá."))]
    pub code: String,
    /// Empresa do crachá; omitido, vale a da sessão.
    pub tenant_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyBiometricPayload {
    pub modality: BiometricModality,
    #[validate(length(min = 1, message = "Payload biométrico vazio."))]
    pub payload: String,
}
