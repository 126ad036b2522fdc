// src/services/notification_service.rs

use chrono::{Duration, NaiveDate};
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    config::ChannelSettings,
    db::{NotificationRepository, TenantRepository},
    models::{
        notification::{
            DueEntry, NotificationChannel, NotifyOutcome, NotifyRequest, OutboxMessage,
            VencimentoCategory, MAX_DAYS_AHEAD,
        },
        session::Session,
    },
};

/// Tentativas de entrega antes de a mensagem sair da fila de reenvio.
const MAX_DELIVERY_ATTEMPTS: i32 = 5;
const OUTBOX_BATCH: i64 = 50;
const TELEGRAM_API: &str = "https://api.telegram.org";

/// Último dia da janela; `days_ahead` fica sempre em 0..=365.
fn scan_until(today: NaiveDate, days_ahead: i64) -> NaiveDate {
    today + Duration::days(days_ahead.clamp(0, MAX_DAYS_AHEAD))
}

/// Verifica se o canal pode ser usado neste ambiente.
pub fn ensure_configured(channels: &ChannelSettings, channel: NotificationChannel) -> Result<(), AppError> {
    let configured = match channel {
        NotificationChannel::Email => channels.email.is_some(),
        NotificationChannel::Whatsapp => channels.whatsapp.is_some(),
        NotificationChannel::Telegram => channels.telegram_bot_token.is_some(),
        NotificationChannel::InApp => true,
    };
    if configured {
        Ok(())
    } else {
        Err(AppError::ChannelNotConfigured(format!("{:?}", channel).to_lowercase()))
    }
}

/// Situação de um vencimento em relação a `today`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueStatus {
    Overdue(i64),
    Today,
    Upcoming(i64),
}

pub fn classify_due(due_date: NaiveDate, today: NaiveDate) -> DueStatus {
    let days = (due_date - today).num_days();
    match days {
        d if d < 0 => DueStatus::Overdue(-d),
        0 => DueStatus::Today,
        d => DueStatus::Upcoming(d),
    }
}

/// Título e corpo do aviso de vencimento.
pub fn vencimento_message(category: VencimentoCategory, entry: &DueEntry, today: NaiveDate) -> (String, String) {
    let label = category.label();
    let date = entry.due_date.format("%d/%m/%Y");
    match classify_due(entry.due_date, today) {
        DueStatus::Overdue(days) => (
            format!("{} vencido: {}", label, entry.name),
            format!("{} venceu em {} (há {} dia(s)).", entry.name, date, days),
        ),
        DueStatus::Today => (
            format!("{} vence hoje: {}", label, entry.name),
            format!("{} vence hoje ({}).", entry.name, date),
        ),
        DueStatus::Upcoming(days) => (
            format!("{} a vencer: {}", label, entry.name),
            format!("{} vence em {} dia(s), em {}.", entry.name, days, date),
        ),
    }
}

#[derive(Clone)]
pub struct NotificationService {
    notification_repo: NotificationRepository,
    tenant_repo: TenantRepository,
    channels: ChannelSettings,
    http: reqwest::Client,
}

impl NotificationService {
    pub fn new(
        notification_repo: NotificationRepository,
        tenant_repo: TenantRepository,
        channels: ChannelSettings,
        http: reqwest::Client,
    ) -> Self {
        Self { notification_repo, tenant_repo, channels, http }
    }

    /// Envia uma notificação avulsa. Falha do provedor vira `success: false`;
    /// canal desconhecido ou não configurado vira erro.
    pub async fn notify(&self, session: &Session, request: &NotifyRequest) -> Result<NotifyOutcome, AppError> {
        let channel = NotificationChannel::parse(&request.channel)
            .ok_or_else(|| AppError::UnsupportedChannel(request.channel.clone()))?;
        ensure_configured(&self.channels, channel)?;

        if channel == NotificationChannel::InApp {
            self.notification_repo
                .insert_in_app(session.tenant_id, request.user_id, &request.title, &request.body)
                .await?;
            return Ok(NotifyOutcome { success: true, details: "Notificação registrada".to_string() });
        }

        match self.send(channel, &request.recipient, &request.title, &request.body).await {
            Ok(details) => {
                tracing::info!(?channel, tenant_id = %session.tenant_id, "Notificação enviada");
                Ok(NotifyOutcome { success: true, details })
            }
            Err(e) => {
                tracing::warn!(?channel, tenant_id = %session.tenant_id, "Falha ao notificar: {}", e);
                Ok(NotifyOutcome { success: false, details: e.to_string() })
            }
        }
    }

    /// Entrega o que estiver pendente na fila da empresa.
    ///
    /// Retorna `(enviadas, falhas)`; falhas ficam na fila para a próxima rodada.
    pub async fn dispatch_pending(&self, tenant_id: Uuid) -> Result<(usize, usize), AppError> {
        let pending = self.notification_repo
            .pending(tenant_id, MAX_DELIVERY_ATTEMPTS, OUTBOX_BATCH)
            .await?;

        let mut sent = 0;
        let mut failed = 0;
        for message in pending {
            match self.deliver(&message).await {
                Ok(()) => {
                    self.notification_repo.mark_sent(message.id).await?;
                    sent += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        outbox_id = %message.id,
                        attempts = message.attempts + 1,
                        "Entrega da notificação falhou: {}", e
                    );
                    self.notification_repo.mark_failed(message.id, &e.to_string()).await?;
                    failed += 1;
                }
            }
        }
        Ok((sent, failed))
    }

    async fn deliver(&self, message: &OutboxMessage) -> Result<(), AppError> {
        if message.channel == NotificationChannel::InApp {
            return self.notification_repo
                .insert_in_app(message.tenant_id, None, &message.title, &message.body)
                .await;
        }
        ensure_configured(&self.channels, message.channel)?;
        self.send(message.channel, &message.recipient, &message.title, &message.body).await?;
        Ok(())
    }

    async fn send(&self, channel: NotificationChannel, recipient: &str, title: &str, body: &str) -> Result<String, AppError> {
        let request = match channel {
            NotificationChannel::Email => {
                let email = self.channels.email.as_ref()
                    .ok_or_else(|| AppError::ChannelNotConfigured("email".to_string()))?;
                self.http
                    .post(&email.api_url)
                    .bearer_auth(&email.api_key)
                    .json(&json!({ "from": email.from, "to": [recipient], "subject": title, "text": body }))
            }
            NotificationChannel::Whatsapp => {
                let whatsapp = self.channels.whatsapp.as_ref()
                    .ok_or_else(|| AppError::ChannelNotConfigured("whatsapp".to_string()))?;
                self.http
                    .post(&whatsapp.api_url)
                    .bearer_auth(&whatsapp.token)
                    .json(&json!({
                        "messaging_product": "whatsapp",
                        "to": recipient,
                        "type": "text",
                        "text": { "body": format!("*{}*\n{}", title, body) },
                    }))
            }
            NotificationChannel::Telegram => {
                let token = self.channels.telegram_bot_token.as_ref()
                    .ok_or_else(|| AppError::ChannelNotConfigured("telegram".to_string()))?;
                self.http
                    .post(format!("{}/bot{}/sendMessage", TELEGRAM_API, token))
                    .json(&json!({ "chat_id": recipient, "text": format!("{}\n\n{}", title, body) }))
            }
            NotificationChannel::InApp => {
                return Err(AppError::UnsupportedChannel("in_app".to_string()));
            }
        };

        let response = request
            .send()
            .await
            .map_err(|e| AppError::NotificationFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::NotificationFailed(format!("{}: {}", status, text)));
        }
        Ok(format!("Entregue via {:?}", channel).to_lowercase())
    }

    /// Cria os avisos de tudo que vence até `today + days_ahead` (e do que já venceu).
    pub async fn scan_vencimentos(
        &self,
        tenant_id: Uuid,
        days_ahead: i64,
        categories: &[VencimentoCategory],
        today: NaiveDate,
    ) -> Result<u64, AppError> {
        let categories: &[VencimentoCategory] = if categories.is_empty() {
            &VencimentoCategory::ALL
        } else {
            categories
        };
        let until = scan_until(today, days_ahead);

        let mut created = 0;
        for &category in categories {
            let entries = self.notification_repo.due_entries(tenant_id, category, until).await?;
            for entry in &entries {
                let (title, body) = vencimento_message(category, entry, today);
                if self.notification_repo
                    .insert_vencimento(tenant_id, category, entry, &title, &body)
                    .await?
                {
                    created += 1;
                }
            }
        }

        tracing::info!(%tenant_id, created, "Varredura de vencimentos concluída");
        Ok(created)
    }

    /// Rodada agendada: vencimentos + reenvio da fila para todas as empresas.
    /// Uma empresa com erro é registrada no log e pulada.
    pub async fn run_scheduled(&self, days_ahead: i64, today: NaiveDate) -> Result<u64, AppError> {
        let tenants = self.tenant_repo.list_tenant_ids().await?;
        let mut total = 0;
        for tenant_id in tenants {
            match self.scan_vencimentos(tenant_id, days_ahead, &[], today).await {
                Ok(created) => total += created,
                Err(e) => tracing::error!(%tenant_id, "Varredura de vencimentos falhou: {}", e),
            }
            if let Err(e) = self.dispatch_pending(tenant_id).await {
                tracing::error!(%tenant_id, "Reenvio de notificações falhou: {}", e);
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EmailSettings, WhatsappSettings};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn scan_window_never_leaves_the_year_ahead() {
        let today = date(2026, 3, 14);
        assert_eq!(scan_until(today, 30), date(2026, 4, 13));
        assert_eq!(scan_until(today, i64::MAX), date(2027, 3, 14));
        assert_eq!(scan_until(today, -5), today);
    }

    #[test]
    fn unconfigured_channels_are_rejected() {
        let channels = ChannelSettings::default();
        assert!(matches!(
            ensure_configured(&channels, NotificationChannel::Email),
            Err(AppError::ChannelNotConfigured(c)) if c == "email"
        ));
        assert!(ensure_configured(&channels, NotificationChannel::Telegram).is_err());
        assert!(ensure_configured(&channels, NotificationChannel::InApp).is_ok());
    }

    #[test]
    fn configured_channels_pass() {
        let channels = ChannelSettings {
            email: Some(EmailSettings {
                api_url: "https://mail.example.com".to_string(),
                api_key: "k".to_string(),
                from: "onehub@raeng.com.br".to_string(),
            }),
            whatsapp: Some(WhatsappSettings {
                api_url: "https://wa.example.com".to_string(),
                token: "t".to_string(),
            }),
            telegram_bot_token: Some("123:abc".to_string()),
        };
        for channel in [NotificationChannel::Email, NotificationChannel::Whatsapp, NotificationChannel::Telegram] {
            assert!(ensure_configured(&channels, channel).is_ok());
        }
    }

    #[test]
    fn unknown_channel_name_does_not_parse() {
        assert_eq!(NotificationChannel::parse("sms"), None);
        assert_eq!(NotificationChannel::parse("WhatsApp"), Some(NotificationChannel::Whatsapp));
    }

    #[test]
    fn due_dates_are_classified_against_today() {
        let today = date(2026, 3, 10);
        assert_eq!(classify_due(date(2026, 3, 7), today), DueStatus::Overdue(3));
        assert_eq!(classify_due(today, today), DueStatus::Today);
        assert_eq!(classify_due(date(2026, 4, 9), today), DueStatus::Upcoming(30));
    }

    #[test]
    fn vencimento_message_mentions_label_and_date() {
        let entry = DueEntry {
            reference_id: Uuid::new_v4(),
            name: "Capacete de Segurança".to_string(),
            due_date: date(2026, 3, 15),
        };
        let (title, body) = vencimento_message(VencimentoCategory::Epi, &entry, date(2026, 3, 10));
        assert_eq!(title, "EPI a vencer: Capacete de Segurança");
        assert!(body.contains("5 dia(s)"));
        assert!(body.contains("15/03/2026"));

        let (title, _) = vencimento_message(VencimentoCategory::Contract, &entry, date(2026, 3, 20));
        assert_eq!(title, "Contrato vencido: Capacete de Segurança");
    }
}
