// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        AuditRepository, EmployeeRepository, ItemRepository, NotificationRepository,
        OperationsRepository, TenantRepository, TermRepository, UserRepository,
    },
    flow::{codec::DEFAULT_OBFUSCATION_KEY, FlowOrchestrator, QrCodec},
    models::notification::MAX_DAYS_AHEAD,
    services::{
        auth::AuthService,
        document_service::DocumentService,
        flow_service::{FlowService, PgFlowBackend},
        notification_service::NotificationService,
        registry_service::RegistryService,
        tenancy_service::TenantService,
        term_service::TermService,
        verification_service::{DigestMatcher, VerificationService},
    },
};

/// Provedor de e-mail via API HTTP (POST JSON com bearer token).
#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub api_url: String,
    pub api_key: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct WhatsappSettings {
    pub api_url: String,
    pub token: String,
}

/// Canais externos; `None` = canal não configurado neste ambiente.
#[derive(Debug, Clone, Default)]
pub struct ChannelSettings {
    pub email: Option<EmailSettings>,
    pub whatsapp: Option<WhatsappSettings>,
    pub telegram_bot_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub qr_obfuscation_key: String,
    pub qr_obfuscate_employees: bool,
    pub channels: ChannelSettings,
    /// 0 desliga a varredura agendada.
    pub vencimento_scan_interval_secs: u64,
    pub vencimento_days_ahead: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Monta a configuração a partir de qualquer fonte chave -> valor.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = get("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let db_max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(v) => v.parse().context("DB_MAX_CONNECTIONS inválido")?,
            None => 5,
        };
        let qr_obfuscate_employees = match get("QR_OBFUSCATE_EMPLOYEES") {
            Some(v) => v.parse().context("QR_OBFUSCATE_EMPLOYEES deve ser true ou false")?,
            None => true,
        };
        let vencimento_scan_interval_secs = match get("VENCIMENTO_SCAN_INTERVAL_SECS") {
            Some(v) => v.parse().context("VENCIMENTO_SCAN_INTERVAL_SECS inválido")?,
            None => 3600,
        };
        let vencimento_days_ahead = match get("VENCIMENTO_DAYS_AHEAD") {
            Some(v) => v.parse::<i64>().context("VENCIMENTO_DAYS_AHEAD inválido")?,
            None => 30,
        }
        .clamp(0, MAX_DAYS_AHEAD);

        let email = match (get("EMAIL_API_URL"), get("EMAIL_API_KEY"), get("EMAIL_FROM")) {
            (Some(api_url), Some(api_key), Some(from)) => Some(EmailSettings { api_url, api_key, from }),
            _ => None,
        };
        let whatsapp = match (get("WHATSAPP_API_URL"), get("WHATSAPP_API_TOKEN")) {
            (Some(api_url), Some(token)) => Some(WhatsappSettings { api_url, token }),
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            db_max_connections,
            qr_obfuscation_key: get("QR_OBFUSCATION_KEY").unwrap_or_else(|| DEFAULT_OBFUSCATION_KEY.to_string()),
            qr_obfuscate_employees,
            channels: ChannelSettings {
                email,
                whatsapp,
                telegram_bot_token: get("TELEGRAM_BOT_TOKEN"),
            },
            vencimento_scan_interval_secs,
            vencimento_days_ahead,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub auth_service: AuthService,
    pub tenant_service: TenantService,
    pub registry_service: RegistryService,
    pub verification_service: VerificationService,
    pub term_service: TermService,
    pub flow_service: FlowService,
    pub notification_service: NotificationService,
    pub document_service: DocumentService,
}

impl AppState {
    pub async fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::from_pool(db_pool, config))
    }

    /// Monta o gráfico de dependências sobre uma pool já aberta.
    pub fn from_pool(db_pool: PgPool, config: &AppConfig) -> Self {
        let codec = QrCodec::new(&config.qr_obfuscation_key, config.qr_obfuscate_employees);

        let user_repo = UserRepository::new(db_pool.clone());
        let tenant_repo = TenantRepository::new(db_pool.clone());
        let employee_repo = EmployeeRepository::new(db_pool.clone());
        let item_repo = ItemRepository::new(db_pool.clone());
        let term_repo = TermRepository::new(db_pool.clone());
        let operations_repo = OperationsRepository::new(db_pool.clone());
        let notification_repo = NotificationRepository::new(db_pool.clone());
        let audit_repo = AuditRepository::new();

        let auth_service = AuthService::new(user_repo, config.jwt_secret.clone(), db_pool.clone());
        let tenant_service = TenantService::new(tenant_repo.clone(), db_pool.clone());
        let registry_service = RegistryService::new(
            employee_repo.clone(),
            item_repo.clone(),
            operations_repo.clone(),
            codec.clone(),
            db_pool.clone(),
        );
        let verification_service = VerificationService::new(
            employee_repo.clone(),
            audit_repo.clone(),
            codec,
            Arc::new(DigestMatcher),
            db_pool.clone(),
        );
        let term_service = TermService::new(term_repo.clone(), employee_repo.clone(), audit_repo.clone(), db_pool.clone());
        let notification_service = NotificationService::new(
            notification_repo.clone(),
            tenant_repo,
            config.channels.clone(),
            reqwest::Client::new(),
        );
        let flow_service = FlowService::new(
            employee_repo,
            item_repo,
            term_repo,
            operations_repo,
            notification_repo,
            audit_repo,
            db_pool.clone(),
        );
        let document_service = DocumentService::new();

        Self {
            db_pool,
            auth_service,
            tenant_service,
            registry_service,
            verification_service,
            term_service,
            flow_service,
            notification_service,
            document_service,
        }
    }

    /// Orquestrador do fluxo QR ligado aos serviços com Postgres.
    pub fn flow_orchestrator(&self) -> FlowOrchestrator<PgFlowBackend> {
        FlowOrchestrator::new(PgFlowBackend::new(
            self.verification_service.clone(),
            self.term_service.clone(),
            self.flow_service.clone(),
            self.notification_service.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_required_values_are_set() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/onehub"),
            ("JWT_SECRET", "segredo"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.db_max_connections, 5);
        assert!(config.qr_obfuscate_employees);
        assert_eq!(config.qr_obfuscation_key, DEFAULT_OBFUSCATION_KEY);
        assert_eq!(config.vencimento_scan_interval_secs, 3600);
        assert_eq!(config.vencimento_days_ahead, 30);
        assert!(config.channels.email.is_none());
        assert!(config.channels.telegram_bot_token.is_none());
    }

    #[test]
    fn missing_database_url_fails() {
        let result = AppConfig::from_lookup(lookup(&[("JWT_SECRET", "segredo")]));
        assert!(result.is_err());
    }

    #[test]
    fn email_needs_all_three_values() {
        let partial = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "s"),
            ("EMAIL_API_URL", "https://mail.example.com/send"),
            ("EMAIL_API_KEY", "k"),
        ]))
        .unwrap();
        assert!(partial.channels.email.is_none());

        let full = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "s"),
            ("EMAIL_API_URL", "https://mail.example.com/send"),
            ("EMAIL_API_KEY", "k"),
            ("EMAIL_FROM", "onehub@raeng.com.br"),
            ("QR_OBFUSCATE_EMPLOYEES", "false"),
        ]))
        .unwrap();
        assert_eq!(full.channels.email.unwrap().from, "onehub@raeng.com.br");
        assert!(!full.qr_obfuscate_employees);
    }

    #[test]
    fn days_ahead_is_clamped_to_the_scan_window() {
        let huge = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "s"),
            ("VENCIMENTO_DAYS_AHEAD", "9223372036854775807"),
        ]))
        .unwrap();
        assert_eq!(huge.vencimento_days_ahead, 365);

        let negative = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "s"),
            ("VENCIMENTO_DAYS_AHEAD", "-10"),
        ]))
        .unwrap();
        assert_eq!(negative.vencimento_days_ahead, 0);
    }

    #[test]
    fn invalid_number_is_rejected() {
        let result = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", "s"),
            ("VENCIMENTO_SCAN_INTERVAL_SECS", "uma hora"),
        ]));
        assert!(result.is_err());
    }
}
