// src/models/session.rs

use uuid::Uuid;

/// Contexto explícito de quem está operando: passado para cada operação,
/// nunca guardado em estado global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub user_name: String,
    pub tenant_id: Uuid,
    /// Idioma curto ("pt", "en", "es") vindo do Accept-Language.
    pub locale: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}
