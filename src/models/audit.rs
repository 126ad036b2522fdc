// src/models/audit.rs

use uuid::Uuid;

/// Dados de uma entrada de auditoria antes de ir para `audit_logs`.
#[derive(Debug, Clone)]
pub struct NewAuditEntry<'a> {
    pub tenant_id: Uuid,
    pub actor_user_id: Uuid,
    pub action: &'a str,
    pub entity_type: &'a str,
    pub entity_id: Uuid,
    pub user_agent: Option<&'a str>,
    pub ip_address: Option<&'a str>,
    pub details: serde_json::Value,
}
