// src/flow/orchestrator.rs

//! Sequência do fluxo: autenticar -> itens -> detalhes -> confirmar -> concluído.
//!
//! Toda chamada de rede passa pelo `FlowBackend`. Se ela falhar, a execução
//! continua na mesma etapa e o usuário pode tentar de novo.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::common::error::AppError;
use crate::flow::collectors::{CollectorContext, CollectorInput};
use crate::flow::error::FlowError;
use crate::flow::run::{CancelledRun, FlowRun, TermDraft};
use crate::flow::term;
use crate::models::employee::{BiometricModality, VerifiedHolder};
use crate::models::flow::{FlowItem, FlowStep, FlowType, OperationRecord};
use crate::models::session::Session;
use crate::models::term::{SignatureRequest, SignedTerm, TermTemplate};

/// As operações de servidor de que o fluxo depende.
#[async_trait]
pub trait FlowBackend: Send + Sync {
    async fn verify_badge(&self, session: &Session, code: &str) -> Result<VerifiedHolder, AppError>;

    async fn verify_biometric(
        &self,
        session: &Session,
        modality: BiometricModality,
        payload: &str,
    ) -> Result<VerifiedHolder, AppError>;

    async fn term_template(&self, session: &Session, term_id: Uuid) -> Result<TermTemplate, AppError>;

    async fn request_signature(&self, session: &Session, request: &SignatureRequest) -> Result<SignedTerm, AppError>;

    async fn persist_operation(&self, session: &Session, record: &OperationRecord) -> Result<Uuid, AppError>;

    /// Disparo das notificações da operação já persistida (melhor esforço).
    async fn notify_operation(&self, session: &Session, record_id: Uuid) -> Result<(), AppError>;
}

pub struct FlowOrchestrator<B> {
    backend: B,
}

impl<B: FlowBackend> FlowOrchestrator<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn expect_step(run: &FlowRun, step: FlowStep, action: &'static str) -> Result<(), AppError> {
        let current = run.current_step();
        if current != step {
            return Err(FlowError::InvalidTransition { from: current, action }.into());
        }
        Ok(())
    }

    pub async fn authenticate_badge(&self, session: &Session, run: &mut FlowRun, code: &str) -> Result<FlowStep, AppError> {
        // Checa antes de ir à rede: não faz sentido verificar crachá em outra etapa
        Self::expect_step(run, FlowStep::Auth, "authenticate")?;
        let holder = self.backend.verify_badge(session, code).await?;
        tracing::info!(run_id = %run.id(), employee_id = %holder.employee.id, "Crachá verificado");
        Ok(run.authenticate(holder)?)
    }

    pub async fn authenticate_biometric(
        &self,
        session: &Session,
        run: &mut FlowRun,
        modality: BiometricModality,
        payload: &str,
    ) -> Result<FlowStep, AppError> {
        Self::expect_step(run, FlowStep::Auth, "authenticate")?;
        let holder = self.backend.verify_biometric(session, modality, payload).await?;
        tracing::info!(run_id = %run.id(), employee_id = %holder.employee.id, ?modality, "Biometria verificada");
        Ok(run.authenticate(holder)?)
    }

    pub fn select_items(&self, run: &mut FlowRun, items: Vec<FlowItem>, flow_type: FlowType) -> Result<FlowStep, AppError> {
        Ok(run.select_items(items, flow_type)?)
    }

    pub async fn submit_details(
        &self,
        session: &Session,
        run: &mut FlowRun,
        input: &CollectorInput,
    ) -> Result<FlowStep, AppError> {
        Self::expect_step(run, FlowStep::Details, "submit_details")?;

        let collector = input.collector();
        let (Some(expected), Some(holder), Some(items)) = (run.flow_type(), run.holder(), run.items()) else {
            return Err(FlowError::InvalidTransition { from: run.current_step(), action: "submit_details" }.into());
        };
        if collector.flow_type() != expected {
            return Err(FlowError::FlowTypeMismatch { expected, got: collector.flow_type() }.into());
        }

        let employee = holder.employee.clone();
        let items = items.to_vec();
        let ctx = CollectorContext {
            employee_name: employee.name.clone(),
            actor_name: session.user_name.clone(),
            locale: session.locale.clone(),
            now: Utc::now(),
        };
        let details = collector.submit(&ctx)?;

        let term = match input.requested_term() {
            Some(term_id) => {
                let template = self.backend.term_template(session, term_id).await?;
                let preview = term::render_preview(&template.body, &employee, &items, ctx.now.date_naive());
                Some(TermDraft { term_id, preview })
            }
            None => None,
        };

        Ok(run.submit_details(details, term)?)
    }

    /// Confirma: assina o termo (se houver), persiste, conclui e notifica.
    ///
    /// Falha de assinatura ou de persistência mantém a execução em `confirm`.
    /// Falha de notificação não desfaz nada.
    pub async fn confirm(&self, session: &Session, run: &mut FlowRun) -> Result<Uuid, AppError> {
        Self::expect_step(run, FlowStep::Confirm, "confirm")?;

        if let Some(draft) = run.term_draft().cloned() {
            if run.pending_signature().is_none() {
                let request = SignatureRequest {
                    employee_id: run.operation_record()?.employee_id,
                    term_id: draft.term_id,
                    reference_type: "DELIVERY".to_string(),
                    reference_id: Some(run.id()),
                    items: run.items().map(<[FlowItem]>::to_vec).unwrap_or_default(),
                    extra: None,
                };
                let signed = self.backend.request_signature(session, &request).await?;
                tracing::info!(run_id = %run.id(), signature_id = %signed.signature_id, "Termo assinado");
                run.hold_signature(signed)?;
            }
        }

        let record = run.operation_record()?;
        let record_id = self.backend.persist_operation(session, &record).await?;
        run.confirm(record_id)?;
        tracing::info!(run_id = %run.id(), %record_id, flow_type = ?record.flow_type, "Operação concluída");

        if let Err(e) = self.backend.notify_operation(session, record_id).await {
            tracing::warn!(%record_id, "Notificação da operação falhou (ficará na fila): {}", e);
        }

        Ok(record_id)
    }

    pub fn cancel(&self, run: FlowRun) -> Result<CancelledRun, AppError> {
        let cancelled = run.cancel()?;
        tracing::info!(run_id = %cancelled.id, at = ?cancelled.at, "Execução cancelada");
        Ok(cancelled)
    }
}
