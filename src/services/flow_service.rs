// src/services/flow_service.rs

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{db_utils::begin_scoped, error::AppError},
    db::{
        AuditRepository, EmployeeRepository, ItemRepository, NotificationRepository, OperationsRepository,
        TermRepository,
    },
    flow::{collectors::validate_record, FlowBackend},
    models::{
        audit::NewAuditEntry,
        employee::{BiometricModality, VerifiedHolder},
        flow::{FlowItem, FlowType, OperationRecord},
        notification::NotificationChannel,
        session::Session,
        term::{SignatureRequest, SignedTerm, TermSignature, TermTemplate},
    },
    services::{
        notification_service::NotificationService, term_service::TermService,
        verification_service::VerificationService,
    },
};

pub const STATUS_AVAILABLE: &str = "DISPONIVEL";
pub const STATUS_IN_USE: &str = "EM_USO";
pub const STATUS_MAINTENANCE: &str = "MANUTENCAO";
pub const STATUS_WRITTEN_OFF: &str = "BAIXADO";
pub const STATUS_APPLIED: &str = "APLICADO";

/// O que a operação faz com cada item no estoque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemTransition {
    pub holder_employee_id: Option<Uuid>,
    pub status: &'static str,
    /// Aplicação consome a quantidade informada.
    pub consumes: bool,
}

/// Destino do item conforme o tipo de fluxo e o "Estado" declarado na devolução.
pub fn item_transition(flow_type: FlowType, employee_id: Uuid, state: Option<&str>) -> ItemTransition {
    match flow_type {
        FlowType::Delivery | FlowType::Exchange => ItemTransition {
            holder_employee_id: Some(employee_id),
            status: STATUS_IN_USE,
            consumes: false,
        },
        FlowType::Return => {
            let status = match state {
                Some("Perdido em campo") | Some("CA vencido") => STATUS_WRITTEN_OFF,
                Some("Danificado em operação")
                | Some("Defeito de fabricação")
                | Some("Contaminado / sem condições de higienização") => STATUS_MAINTENANCE,
                _ => STATUS_AVAILABLE,
            };
            ItemTransition { holder_employee_id: None, status, consumes: false }
        }
        FlowType::Application => ItemTransition {
            holder_employee_id: Some(employee_id),
            status: STATUS_APPLIED,
            consumes: true,
        },
    }
}

fn notification_text(record: &OperationRecord) -> (String, String) {
    let title = format!("{} registrada - {}", record.flow_type.label(), record.employee_name);
    let mut body = String::new();
    for item in &record.items {
        body.push_str(&format!("- {} ({}) - Qtd: {}\n", item.name, item.code, item.quantity.normalize()));
    }
    for (field, value) in &record.details {
        body.push_str(&format!("{}: {}\n", field, value));
    }
    (title, body.trim_end().to_string())
}

/// A assinatura anexada precisa ser da empresa, do colaborador e da execução do registro.
fn check_signature(signature: &TermSignature, tenant_id: Uuid, record: &OperationRecord) -> Result<(), AppError> {
    if signature.tenant_id != tenant_id
        || signature.employee_id != record.employee_id
        || signature.reference_id != Some(record.run_id)
    {
        return Err(AppError::SignatureMismatch);
    }
    Ok(())
}

#[derive(Clone)]
pub struct FlowService {
    employee_repo: EmployeeRepository,
    item_repo: ItemRepository,
    term_repo: TermRepository,
    operations_repo: OperationsRepository,
    notification_repo: NotificationRepository,
    audit_repo: AuditRepository,
    pool: PgPool,
}

impl FlowService {
    pub fn new(
        employee_repo: EmployeeRepository,
        item_repo: ItemRepository,
        term_repo: TermRepository,
        operations_repo: OperationsRepository,
        notification_repo: NotificationRepository,
        audit_repo: AuditRepository,
        pool: PgPool,
    ) -> Self {
        Self { employee_repo, item_repo, term_repo, operations_repo, notification_repo, audit_repo, pool }
    }

    /// Persiste o registro da operação numa única transação: itens (com checagem
    /// de versão), registro, auditoria e fila de notificações.
    ///
    /// Reenviar o mesmo `run_id` devolve o registro já gravado sem tocar em nada.
    /// Colaborador e assinatura são conferidos dentro da empresa da sessão.
    pub async fn persist_operation(&self, session: &Session, record: &OperationRecord) -> Result<Uuid, AppError> {
        record.validate()?;
        validate_record(record)?;

        let mut tx = begin_scoped(&self.pool, session).await?;

        if let Some(existing) = self.operations_repo
            .find_record(&mut *tx, session.tenant_id, record.run_id)
            .await?
        {
            tracing::info!(record_id = %existing.id, "Registro já persistido; reenvio ignorado");
            return Ok(existing.id);
        }

        self.employee_repo
            .find_by_id(&mut *tx, session.tenant_id, record.employee_id)
            .await?
            .ok_or(AppError::EmployeeNotFound)?;

        if let Some(signature_id) = record.signature_id {
            let signature = self.term_repo
                .find_signature(&mut *tx, session.tenant_id, signature_id)
                .await?
                .ok_or(AppError::SignatureNotFound)?;
            check_signature(&signature, session.tenant_id, record).inspect_err(|_| {
                tracing::warn!(%signature_id, run_id = %record.run_id, "Assinatura de outra operação recusada");
            })?;
        }

        let ids: Vec<Uuid> = record.items.iter().map(|i| i.id).collect();
        let stored: HashMap<Uuid, _> = self.item_repo
            .find_many(&mut *tx, session.tenant_id, &ids)
            .await?
            .into_iter()
            .map(|i| (i.id, i))
            .collect();

        let state = record.details.get("Estado").map(String::as_str);
        let transition = item_transition(record.flow_type, record.employee_id, state);

        for item in &record.items {
            if !stored.contains_key(&item.id) {
                return Err(AppError::ItemNotFound(item.id));
            }
            let used = if transition.consumes { item.quantity } else { Decimal::ZERO };
            let applied = self.item_repo
                .apply_transition(
                    &mut *tx,
                    session.tenant_id,
                    item.id,
                    item.version,
                    transition.holder_employee_id,
                    transition.status,
                    used,
                )
                .await?;
            if !applied {
                tracing::warn!(item_id = %item.id, read_version = item.version, "Item alterado por outra operação");
                return Err(AppError::StaleRecord(item.id));
            }
        }

        let persisted = self.operations_repo
            .insert_record(&mut *tx, session.tenant_id, session.user_id, record)
            .await?;

        self.audit_repo
            .record(
                &mut *tx,
                &NewAuditEntry {
                    tenant_id: session.tenant_id,
                    actor_user_id: session.user_id,
                    action: "OPERATION_RECORDED",
                    entity_type: "operation_record",
                    entity_id: persisted.id,
                    user_agent: session.user_agent.as_deref(),
                    ip_address: session.ip_address.as_deref(),
                    details: serde_json::json!({
                        "flowType": record.flow_type,
                        "employeeId": record.employee_id,
                        "itemIds": ids,
                        "signatureId": record.signature_id,
                    }),
                },
            )
            .await?;

        let (title, body) = notification_text(record);
        self.notification_repo
            .enqueue(&mut *tx, session.tenant_id, NotificationChannel::InApp, "", &title, &body)
            .await?;
        for contact in self.notification_repo.active_contacts(&mut *tx, session.tenant_id).await? {
            self.notification_repo
                .enqueue(&mut *tx, session.tenant_id, contact.channel, &contact.recipient, &title, &body)
                .await?;
        }

        tx.commit().await?;
        tracing::info!(record_id = %persisted.id, flow_type = ?record.flow_type, "Operação persistida");

        Ok(persisted.id)
    }

    /// Itens do cadastro na versão atual, na ordem pedida.
    pub async fn load_items(&self, session: &Session, ids: &[Uuid]) -> Result<Vec<FlowItem>, AppError> {
        let mut stored: HashMap<Uuid, FlowItem> = self.item_repo
            .find_many(&self.pool, session.tenant_id, ids)
            .await?
            .into_iter()
            .map(|i| (i.id, FlowItem::from(i)))
            .collect();

        ids.iter()
            .map(|id| stored.remove(id).ok_or(AppError::ItemNotFound(*id)))
            .collect()
    }
}

/// `FlowBackend` de produção: liga o orquestrador aos serviços com Postgres.
#[derive(Clone)]
pub struct PgFlowBackend {
    verification: VerificationService,
    terms: TermService,
    flows: FlowService,
    notifications: NotificationService,
}

impl PgFlowBackend {
    pub fn new(
        verification: VerificationService,
        terms: TermService,
        flows: FlowService,
        notifications: NotificationService,
    ) -> Self {
        Self { verification, terms, flows, notifications }
    }
}

#[async_trait]
impl FlowBackend for PgFlowBackend {
    async fn verify_badge(&self, session: &Session, code: &str) -> Result<VerifiedHolder, AppError> {
        self.verification.verify_badge(session, code, Some(session.tenant_id)).await
    }

    async fn verify_biometric(
        &self,
        session: &Session,
        modality: BiometricModality,
        payload: &str,
    ) -> Result<VerifiedHolder, AppError> {
        self.verification.verify_biometric(session, modality, payload).await
    }

    async fn term_template(&self, session: &Session, term_id: Uuid) -> Result<TermTemplate, AppError> {
        self.terms.find_template(session, term_id).await
    }

    async fn request_signature(&self, session: &Session, request: &SignatureRequest) -> Result<SignedTerm, AppError> {
        self.terms.request_signature(session, request).await
    }

    async fn persist_operation(&self, session: &Session, record: &OperationRecord) -> Result<Uuid, AppError> {
        self.flows.persist_operation(session, record).await
    }

    async fn notify_operation(&self, session: &Session, record_id: Uuid) -> Result<(), AppError> {
        let (sent, failed) = self.notifications.dispatch_pending(session.tenant_id).await?;
        tracing::info!(%record_id, sent, failed, "Notificações da operação despachadas");
        if failed > 0 {
            return Err(AppError::NotificationFailed(format!("{} notificação(ões) na fila", failed)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::run::fixtures::item;
    use indexmap::IndexMap;

    #[test]
    fn delivery_moves_item_to_employee() {
        let employee = Uuid::new_v4();
        let t = item_transition(FlowType::Delivery, employee, None);
        assert_eq!(t.holder_employee_id, Some(employee));
        assert_eq!(t.status, STATUS_IN_USE);
        assert!(!t.consumes);
    }

    #[test]
    fn return_state_decides_destination() {
        let employee = Uuid::new_v4();
        assert_eq!(item_transition(FlowType::Return, employee, Some("Perfeito estado")).status, STATUS_AVAILABLE);
        assert_eq!(
            item_transition(FlowType::Return, employee, Some("Desgaste normal pelo uso")).status,
            STATUS_AVAILABLE
        );
        assert_eq!(
            item_transition(FlowType::Return, employee, Some("Danificado em operação")).status,
            STATUS_MAINTENANCE
        );
        assert_eq!(item_transition(FlowType::Return, employee, Some("Perdido em campo")).status, STATUS_WRITTEN_OFF);
        assert_eq!(item_transition(FlowType::Return, employee, None).holder_employee_id, None);
    }

    #[test]
    fn application_consumes_quantity() {
        let t = item_transition(FlowType::Application, Uuid::new_v4(), None);
        assert_eq!(t.status, STATUS_APPLIED);
        assert!(t.consumes);
    }

    fn signature_for(tenant_id: Uuid, employee_id: Uuid, reference_id: Option<Uuid>) -> TermSignature {
        TermSignature {
            id: Uuid::new_v4(),
            tenant_id,
            employee_id,
            term_id: Uuid::new_v4(),
            term_title: "Termo de Responsabilidade de EPI".to_string(),
            term_version: 1,
            reference_type: "DELIVERY".to_string(),
            reference_id,
            rendered_body: "Eu, João Silva, recebi os itens.".to_string(),
            validation_hash: "abc123".to_string(),
            user_agent: None,
            ip_address: None,
            extra: None,
            signed_at: chrono::Utc::now(),
        }
    }

    fn delivery_record(signature_id: Uuid) -> OperationRecord {
        let mut details = IndexMap::new();
        details.insert("Termo Digital".to_string(), "Habilitado".to_string());
        OperationRecord {
            run_id: Uuid::new_v4(),
            flow_type: FlowType::Delivery,
            employee_id: Uuid::new_v4(),
            employee_name: "João Silva".to_string(),
            items: vec![item("Capacete de Segurança", "EPI-001", 1)],
            details,
            signature_id: Some(signature_id),
        }
    }

    #[test]
    fn signature_of_the_same_run_is_accepted() {
        let tenant = Uuid::new_v4();
        let record = delivery_record(Uuid::new_v4());
        let signature = signature_for(tenant, record.employee_id, Some(record.run_id));
        assert!(check_signature(&signature, tenant, &record).is_ok());
    }

    #[test]
    fn signature_of_another_employee_run_or_tenant_is_rejected() {
        let tenant = Uuid::new_v4();
        let record = delivery_record(Uuid::new_v4());

        let other_employee = signature_for(tenant, Uuid::new_v4(), Some(record.run_id));
        assert!(matches!(check_signature(&other_employee, tenant, &record), Err(AppError::SignatureMismatch)));

        let other_run = signature_for(tenant, record.employee_id, Some(Uuid::new_v4()));
        assert!(matches!(check_signature(&other_run, tenant, &record), Err(AppError::SignatureMismatch)));

        let no_reference = signature_for(tenant, record.employee_id, None);
        assert!(matches!(check_signature(&no_reference, tenant, &record), Err(AppError::SignatureMismatch)));

        let other_tenant = signature_for(Uuid::new_v4(), record.employee_id, Some(record.run_id));
        assert!(matches!(check_signature(&other_tenant, tenant, &record), Err(AppError::SignatureMismatch)));
    }

    #[test]
    fn notification_text_lists_items_and_details_in_order() {
        let mut details = IndexMap::new();
        details.insert("Modo de Registro".to_string(), "Automático".to_string());
        details.insert("Termo Digital".to_string(), "Habilitado".to_string());
        let record = OperationRecord {
            run_id: Uuid::new_v4(),
            flow_type: FlowType::Delivery,
            employee_id: Uuid::new_v4(),
            employee_name: "João Silva".to_string(),
            items: vec![item("Capacete de Segurança", "EPI-001", 1)],
            details,
            signature_id: None,
        };

        let (title, body) = notification_text(&record);
        assert_eq!(title, "Entrega registrada - João Silva");
        assert_eq!(
            body,
            "- Capacete de Segurança (EPI-001) - Qtd: 1\nModo de Registro: Automático\nTermo Digital: Habilitado"
        );
    }
}
