use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use onehub::common::error::AppError;
use onehub::flow::collectors::{CollectorInput, DeliveryCollector, ExchangeCollector, ReturnCollector};
use onehub::flow::term::{render, signature_line, validation_hash, PENDING_SIGNATURE};
use onehub::flow::{FlowBackend, FlowError, FlowOrchestrator, FlowRun, QrCodec};
use onehub::models::employee::{BiometricModality, Employee, VerifiedHolder};
use onehub::models::flow::{EntityKind, FlowItem, FlowStep, FlowType, OperationRecord};
use onehub::models::session::Session;
use onehub::models::term::{SignatureRequest, SignedTerm, TermTemplate};
use rust_decimal::Decimal;
use uuid::Uuid;

const TERM_BODY: &str = "Eu, {NOME_COLABORADOR}, crachá {NUMERO_CRACHA}, recebi:\n{LISTA_ITEMS}\nEm {DATA}.\n{ASSINATURA_DIGITAL}";

#[derive(Default)]
struct MemoryState {
    employees: HashMap<String, Employee>,
    templates: HashMap<Uuid, TermTemplate>,
    signatures: Vec<SignedTerm>,
    records: HashMap<Uuid, OperationRecord>,
    notified: Vec<Uuid>,
    fail_persist: bool,
    fail_notify: bool,
}

/// Backend em memória: mesma semântica do Postgres, sem banco.
struct MemoryBackend {
    tenant_id: Uuid,
    state: Mutex<MemoryState>,
}

impl MemoryBackend {
    fn new(tenant_id: Uuid) -> Self {
        Self { tenant_id, state: Mutex::new(MemoryState::default()) }
    }

    fn add_employee(&self, name: &str, badge: &str, is_active: bool) -> Employee {
        let now = Utc::now();
        let employee = Employee {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            name: name.to_string(),
            badge_code: badge.to_string(),
            department: Some("Obras".to_string()),
            role: Some("Pedreiro".to_string()),
            photo_url: None,
            is_active,
            linked_user_id: None,
            created_at: now,
            updated_at: now,
        };
        self.state.lock().unwrap().employees.insert(badge.to_string(), employee.clone());
        employee
    }

    fn add_template(&self, title: &str) -> Uuid {
        let template = TermTemplate {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            title: title.to_string(),
            body: TERM_BODY.to_string(),
            version: 1,
            is_active: true,
            created_at: Utc::now(),
        };
        let id = template.id;
        self.state.lock().unwrap().templates.insert(id, template);
        id
    }

    fn set_fail_persist(&self, fail: bool) {
        self.state.lock().unwrap().fail_persist = fail;
    }

    fn set_fail_notify(&self, fail: bool) {
        self.state.lock().unwrap().fail_notify = fail;
    }
}

#[async_trait]
impl FlowBackend for MemoryBackend {
    async fn verify_badge(&self, session: &Session, code: &str) -> Result<VerifiedHolder, AppError> {
        let state = self.state.lock().unwrap();
        let employee = state.employees.get(code).cloned().ok_or(AppError::BadgeNotFound)?;
        if employee.tenant_id != session.tenant_id {
            return Err(AppError::TenantMismatch);
        }
        if !employee.is_active {
            return Err(AppError::HolderInactive);
        }
        Ok(VerifiedHolder { employee, linked_account: None })
    }

    async fn verify_biometric(
        &self,
        _session: &Session,
        _modality: BiometricModality,
        _payload: &str,
    ) -> Result<VerifiedHolder, AppError> {
        Err(AppError::BiometricNotRecognized)
    }

    async fn term_template(&self, _session: &Session, term_id: Uuid) -> Result<TermTemplate, AppError> {
        self.state.lock().unwrap().templates.get(&term_id).cloned().ok_or(AppError::TermNotFound)
    }

    async fn request_signature(&self, session: &Session, request: &SignatureRequest) -> Result<SignedTerm, AppError> {
        let mut state = self.state.lock().unwrap();
        let template = state.templates.get(&request.term_id).cloned().ok_or(AppError::TermNotFound)?;
        let employee = state
            .employees
            .values()
            .find(|e| e.id == request.employee_id)
            .cloned()
            .ok_or(AppError::EmployeeNotFound)?;

        let signed_at = Utc::now();
        let unsigned = render(&template.body, &employee, &request.items, signed_at.date_naive(), PENDING_SIGNATURE);
        let hash = validation_hash(session.tenant_id, employee.id, template.id, template.version, &unsigned, &signed_at);
        let line = signature_line(&employee, &signed_at, &hash);
        let signed = SignedTerm {
            signature_id: Uuid::new_v4(),
            title: template.title.clone(),
            rendered_body: render(&template.body, &employee, &request.items, signed_at.date_naive(), &line),
            version: template.version,
            validation_hash: hash,
            signed_at,
        };
        state.signatures.push(signed.clone());
        Ok(signed)
    }

    async fn persist_operation(&self, _session: &Session, record: &OperationRecord) -> Result<Uuid, AppError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_persist {
            return Err(AppError::PersistenceError("conexão recusada".to_string()));
        }
        state.records.entry(record.run_id).or_insert_with(|| record.clone());
        Ok(record.run_id)
    }

    async fn notify_operation(&self, _session: &Session, record_id: Uuid) -> Result<(), AppError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_notify {
            return Err(AppError::NotificationFailed("provedor indisponível".to_string()));
        }
        state.notified.push(record_id);
        Ok(())
    }
}

fn session(tenant_id: Uuid) -> Session {
    Session {
        user_id: Uuid::new_v4(),
        user_name: "Maria Operadora".to_string(),
        tenant_id,
        locale: "pt".to_string(),
        user_agent: Some("OneHub-Tablet/1.0".to_string()),
        ip_address: Some("10.0.0.7".to_string()),
    }
}

fn item(name: &str, code: &str, kind: EntityKind) -> FlowItem {
    FlowItem {
        id: Uuid::new_v4(),
        name: name.to_string(),
        code: code.to_string(),
        kind,
        quantity: Decimal::ONE,
        version: 1,
    }
}

fn setup() -> (FlowOrchestrator<MemoryBackend>, Session) {
    let tenant_id = Uuid::new_v4();
    let backend = MemoryBackend::new(tenant_id);
    backend.add_employee("João Silva", "COLAB-001", true);
    (FlowOrchestrator::new(backend), session(tenant_id))
}

fn delivery_with_term(term_id: Uuid) -> CollectorInput {
    CollectorInput::Delivery(DeliveryCollector {
        observations: None,
        generate_term: true,
        term_id: Some(term_id),
    })
}

#[tokio::test]
async fn delivery_with_signed_term_completes() {
    let (orchestrator, session) = setup();
    let term_id = orchestrator.backend().add_template("Termo de Responsabilidade de EPI");
    let mut run = FlowRun::new();

    let step = orchestrator.authenticate_badge(&session, &mut run, "COLAB-001").await.unwrap();
    assert_eq!(step, FlowStep::Items);

    let capacete = item("Capacete de Segurança", "EPI-001", EntityKind::Epi);
    let step = orchestrator.select_items(&mut run, vec![capacete.clone()], FlowType::Delivery).unwrap();
    assert_eq!(step, FlowStep::Details);

    let step = orchestrator.submit_details(&session, &mut run, &delivery_with_term(term_id)).await.unwrap();
    assert_eq!(step, FlowStep::Confirm);
    let preview = &run.term_draft().unwrap().preview;
    assert!(preview.contains("João Silva"));
    assert!(preview.contains("- Capacete de Segurança (EPI-001) - Qtd: 1"));
    assert!(preview.contains(PENDING_SIGNATURE));

    let record_id = orchestrator.confirm(&session, &mut run).await.unwrap();
    assert_eq!(record_id, run.id());
    assert_eq!(run.current_step(), FlowStep::Complete);
    assert!(run.timeline().is_terminal());

    let signature = run.signature().expect("assinatura presente");
    assert!(signature.rendered_body.contains("Assinado digitalmente por João Silva (crachá COLAB-001)"));
    assert_eq!(signature.validation_hash.len(), 64);

    let state = orchestrator.backend().state.lock().unwrap();
    let record = &state.records[&record_id];
    assert_eq!(record.flow_type, FlowType::Delivery);
    assert_eq!(record.employee_name, "João Silva");
    assert_eq!(record.items, vec![capacete]);
    assert_eq!(record.details["Termo Digital"], "Habilitado");
    assert_eq!(record.details["Colaborador"], "João Silva");
    assert_eq!(record.details["Registrado por"], "Maria Operadora");
    assert_eq!(record.details["Observações"], "Nenhuma observação");
    assert_eq!(record.signature_id, Some(signature.signature_id));
    assert_eq!(state.notified, vec![record_id]);
}

#[tokio::test]
async fn exchange_keeps_detail_order() {
    let (orchestrator, session) = setup();
    let mut run = FlowRun::new();

    orchestrator.authenticate_badge(&session, &mut run, "COLAB-001").await.unwrap();
    orchestrator
        .select_items(&mut run, vec![item("Luva de Raspa", "EPI-014", EntityKind::Epi)], FlowType::Exchange)
        .unwrap();

    let input = CollectorInput::Exchange(ExchangeCollector {
        reason: Some("Tamanho incorreto (pequeno/grande)".to_string()),
        state: Some("Desgaste normal pelo uso".to_string()),
        observations: None,
    });
    orchestrator.submit_details(&session, &mut run, &input).await.unwrap();
    assert!(run.term_draft().is_none());

    let record_id = orchestrator.confirm(&session, &mut run).await.unwrap();
    assert!(run.signature().is_none());

    let state = orchestrator.backend().state.lock().unwrap();
    let details = &state.records[&record_id].details;
    assert_eq!(details["Motivo"], "Tamanho incorreto (pequeno/grande)");
    assert_eq!(details["Estado"], "Desgaste normal pelo uso");
    assert_eq!(details["Observações"], "Nenhuma observação");
    let keys: Vec<&str> = details.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["Modo de Registro", "Data/Hora", "Colaborador", "Registrado por", "Motivo", "Estado", "Observações"]
    );
    assert!(state.signatures.is_empty());
}

#[tokio::test]
async fn badge_errors_leave_run_at_auth() {
    let (orchestrator, session) = setup();
    orchestrator.backend().add_employee("Pedro Afastado", "COLAB-099", false);
    let mut run = FlowRun::new();

    let unknown = orchestrator.authenticate_badge(&session, &mut run, "COLAB-404").await;
    assert!(matches!(unknown, Err(AppError::BadgeNotFound)));
    assert_eq!(run.current_step(), FlowStep::Auth);

    let inactive = orchestrator.authenticate_badge(&session, &mut run, "COLAB-099").await;
    assert!(matches!(inactive, Err(AppError::HolderInactive)));
    assert_eq!(run.current_step(), FlowStep::Auth);

    let biometric = orchestrator
        .authenticate_biometric(&session, &mut run, BiometricModality::Facial, "frame")
        .await;
    assert!(matches!(biometric, Err(AppError::BiometricNotRecognized)));
    assert!(run.records().is_empty());
}

#[tokio::test]
async fn badge_from_another_tenant_is_rejected() {
    let (orchestrator, _) = setup();
    let other_tenant = session(Uuid::new_v4());
    let mut run = FlowRun::new();

    let result = orchestrator.authenticate_badge(&other_tenant, &mut run, "COLAB-001").await;
    assert!(matches!(result, Err(AppError::TenantMismatch)));
    assert_eq!(run.current_step(), FlowStep::Auth);
}

#[tokio::test]
async fn persist_failure_keeps_signature_for_retry() {
    let (orchestrator, session) = setup();
    let term_id = orchestrator.backend().add_template("Termo de Responsabilidade de EPI");
    let mut run = FlowRun::new();

    orchestrator.authenticate_badge(&session, &mut run, "COLAB-001").await.unwrap();
    orchestrator
        .select_items(&mut run, vec![item("Capacete de Segurança", "EPI-001", EntityKind::Epi)], FlowType::Delivery)
        .unwrap();
    orchestrator.submit_details(&session, &mut run, &delivery_with_term(term_id)).await.unwrap();

    orchestrator.backend().set_fail_persist(true);
    let failed = orchestrator.confirm(&session, &mut run).await;
    assert!(matches!(failed, Err(AppError::PersistenceError(_))));
    assert_eq!(run.current_step(), FlowStep::Confirm);
    let held = run.pending_signature().cloned().expect("assinatura guardada");

    orchestrator.backend().set_fail_persist(false);
    let record_id = orchestrator.confirm(&session, &mut run).await.unwrap();

    let state = orchestrator.backend().state.lock().unwrap();
    assert_eq!(state.signatures.len(), 1);
    assert_eq!(state.records[&record_id].signature_id, Some(held.signature_id));
    assert_eq!(run.signature().map(|s| s.signature_id), Some(held.signature_id));
}

#[tokio::test]
async fn notification_failure_still_completes() {
    let (orchestrator, session) = setup();
    orchestrator.backend().set_fail_notify(true);
    let mut run = FlowRun::new();

    orchestrator.authenticate_badge(&session, &mut run, "COLAB-001").await.unwrap();
    orchestrator
        .select_items(&mut run, vec![item("Furadeira de Impacto", "TOOL-007", EntityKind::Tool)], FlowType::Return)
        .unwrap();
    let input = CollectorInput::Return(ReturnCollector {
        state: Some("Desgaste normal pelo uso".to_string()),
        observations: None,
    });
    orchestrator.submit_details(&session, &mut run, &input).await.unwrap();

    let record_id = orchestrator.confirm(&session, &mut run).await.unwrap();
    assert_eq!(run.current_step(), FlowStep::Complete);

    let state = orchestrator.backend().state.lock().unwrap();
    assert!(state.records.contains_key(&record_id));
    assert!(state.notified.is_empty());
}

#[tokio::test]
async fn details_of_wrong_flow_type_are_rejected() {
    let (orchestrator, session) = setup();
    let mut run = FlowRun::new();

    orchestrator.authenticate_badge(&session, &mut run, "COLAB-001").await.unwrap();
    orchestrator
        .select_items(&mut run, vec![item("Capacete de Segurança", "EPI-001", EntityKind::Epi)], FlowType::Return)
        .unwrap();

    let input = CollectorInput::Delivery(DeliveryCollector::default());
    let result = orchestrator.submit_details(&session, &mut run, &input).await;
    assert!(matches!(
        result,
        Err(AppError::Flow(FlowError::FlowTypeMismatch { expected: FlowType::Return, got: FlowType::Delivery }))
    ));
    assert_eq!(run.current_step(), FlowStep::Details);
}

#[tokio::test]
async fn rewind_then_cancel() {
    let (orchestrator, session) = setup();
    let mut run = FlowRun::new();

    orchestrator.authenticate_badge(&session, &mut run, "COLAB-001").await.unwrap();
    orchestrator
        .select_items(&mut run, vec![item("Capacete de Segurança", "EPI-001", EntityKind::Epi)], FlowType::Delivery)
        .unwrap();

    assert_eq!(run.rewind_to(FlowStep::Items).unwrap(), FlowStep::Items);
    assert!(run.items().is_none());
    assert!(run.holder().is_some());

    let run_id = run.id();
    let cancelled = orchestrator.cancel(run).unwrap();
    assert_eq!(cancelled.id, run_id);
    assert_eq!(cancelled.at, FlowStep::Items);
    assert!(orchestrator.backend().state.lock().unwrap().records.is_empty());
}

#[test]
fn badge_qr_round_trips_through_codec() {
    let codec = QrCodec::new("chave-de-teste", true);
    let payload = codec.encode(EntityKind::Employee, "COLAB-001", None);
    let decoded = codec.decode(&payload).expect("payload válido");
    assert_eq!(decoded.kind, EntityKind::Employee);
    assert_eq!(decoded.entity_id, "COLAB-001");
}
