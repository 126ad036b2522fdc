// src/flow/run.rs

//! Estado de uma execução do fluxo QR como lista de etapas já confirmadas.
//!
//! A etapa atual é sempre `records.len()`: não existe caminho para pular etapa.
//! Voltar é truncar a lista (`rewind_to`), nunca editar um registro já gravado.

use uuid::Uuid;

use crate::flow::error::FlowError;
use crate::flow::timeline::FlowTimeline;
use crate::models::employee::VerifiedHolder;
use crate::models::flow::{FlowItem, FlowStep, FlowType, OperationDetail, OperationRecord};
use crate::models::term::SignedTerm;

/// Termo pedido na etapa de detalhes, com a prévia que o colaborador viu.
#[derive(Debug, Clone, PartialEq)]
pub struct TermDraft {
    pub term_id: Uuid,
    pub preview: String,
}

#[derive(Debug, Clone)]
pub enum StepRecord {
    Authenticated {
        holder: VerifiedHolder,
    },
    ItemsSelected {
        items: Vec<FlowItem>,
        flow_type: FlowType,
    },
    DetailsSubmitted {
        details: OperationDetail,
        term: Option<TermDraft>,
    },
    Confirmed {
        record_id: Uuid,
        signature: Option<SignedTerm>,
    },
}

#[derive(Debug, Clone)]
pub struct FlowRun {
    id: Uuid,
    records: Vec<StepRecord>,
    // Assinatura já obtida na etapa de confirmação; reaproveitada se a persistência falhar.
    pending_signature: Option<SignedTerm>,
}

/// O que sobra de uma execução cancelada (só para log).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelledRun {
    pub id: Uuid,
    pub at: FlowStep,
}

impl Default for FlowRun {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowRun {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            records: Vec::new(),
            pending_signature: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn current_step(&self) -> FlowStep {
        // records.len() nunca passa de 4: `confirm` só empilha a partir de Confirm
        FlowStep::from_index(self.records.len()).unwrap_or(FlowStep::Complete)
    }

    pub fn timeline(&self) -> FlowTimeline {
        FlowTimeline::new(self.current_step(), self.flow_type())
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    // --- Acessores ---

    pub fn holder(&self) -> Option<&VerifiedHolder> {
        self.records.iter().find_map(|r| match r {
            StepRecord::Authenticated { holder } => Some(holder),
            _ => None,
        })
    }

    pub fn items(&self) -> Option<&[FlowItem]> {
        self.records.iter().find_map(|r| match r {
            StepRecord::ItemsSelected { items, .. } => Some(items.as_slice()),
            _ => None,
        })
    }

    pub fn flow_type(&self) -> Option<FlowType> {
        self.records.iter().find_map(|r| match r {
            StepRecord::ItemsSelected { flow_type, .. } => Some(*flow_type),
            _ => None,
        })
    }

    pub fn details(&self) -> Option<&OperationDetail> {
        self.records.iter().find_map(|r| match r {
            StepRecord::DetailsSubmitted { details, .. } => Some(details),
            _ => None,
        })
    }

    pub fn term_draft(&self) -> Option<&TermDraft> {
        self.records.iter().find_map(|r| match r {
            StepRecord::DetailsSubmitted { term, .. } => term.as_ref(),
            _ => None,
        })
    }

    pub fn pending_signature(&self) -> Option<&SignedTerm> {
        self.pending_signature.as_ref()
    }

    pub fn record_id(&self) -> Option<Uuid> {
        self.records.iter().find_map(|r| match r {
            StepRecord::Confirmed { record_id, .. } => Some(*record_id),
            _ => None,
        })
    }

    pub fn signature(&self) -> Option<&SignedTerm> {
        self.records
            .iter()
            .find_map(|r| match r {
                StepRecord::Confirmed { signature, .. } => signature.as_ref(),
                _ => None,
            })
            .or(self.pending_signature.as_ref())
    }

    // --- Transições ---

    fn expect_step(&self, step: FlowStep, action: &'static str) -> Result<(), FlowError> {
        let current = self.current_step();
        if current != step {
            return Err(FlowError::InvalidTransition { from: current, action });
        }
        Ok(())
    }

    /// auth -> items
    pub fn authenticate(&mut self, holder: VerifiedHolder) -> Result<FlowStep, FlowError> {
        self.expect_step(FlowStep::Auth, "authenticate")?;
        self.records.push(StepRecord::Authenticated { holder });
        Ok(self.current_step())
    }

    /// items -> details. O tipo de fluxo fica fixo a partir daqui.
    pub fn select_items(&mut self, items: Vec<FlowItem>, flow_type: FlowType) -> Result<FlowStep, FlowError> {
        self.expect_step(FlowStep::Items, "select_items")?;
        if items.is_empty() {
            return Err(FlowError::EmptySelection);
        }
        self.records.push(StepRecord::ItemsSelected { items, flow_type });
        Ok(self.current_step())
    }

    /// details -> confirm
    pub fn submit_details(
        &mut self,
        details: OperationDetail,
        term: Option<TermDraft>,
    ) -> Result<FlowStep, FlowError> {
        self.expect_step(FlowStep::Details, "submit_details")?;
        if term.is_some() && self.flow_type() != Some(FlowType::Delivery) {
            return Err(FlowError::InvalidTransition {
                from: FlowStep::Details,
                action: "attach_term",
            });
        }
        self.records.push(StepRecord::DetailsSubmitted { details, term });
        Ok(self.current_step())
    }

    /// Guarda a assinatura obtida durante a confirmação.
    pub fn hold_signature(&mut self, signature: SignedTerm) -> Result<(), FlowError> {
        self.expect_step(FlowStep::Confirm, "hold_signature")?;
        self.pending_signature = Some(signature);
        Ok(())
    }

    /// confirm -> complete
    pub fn confirm(&mut self, record_id: Uuid) -> Result<FlowStep, FlowError> {
        self.expect_step(FlowStep::Confirm, "confirm")?;
        let signature = self.pending_signature.take();
        self.records.push(StepRecord::Confirmed { record_id, signature });
        Ok(self.current_step())
    }

    /// Reabre `step`, descartando tudo o que foi confirmado a partir dele.
    pub fn rewind_to(&mut self, step: FlowStep) -> Result<FlowStep, FlowError> {
        let current = self.current_step();
        if current == FlowStep::Complete || step >= current {
            return Err(FlowError::InvalidRewind { from: current, to: step });
        }
        self.records.truncate(step.index());
        self.pending_signature = None;
        Ok(self.current_step())
    }

    /// Descarta a execução inteira; nada foi persistido.
    pub fn cancel(self) -> Result<CancelledRun, FlowError> {
        let at = self.current_step();
        if at == FlowStep::Complete {
            return Err(FlowError::InvalidTransition { from: at, action: "cancel" });
        }
        Ok(CancelledRun { id: self.id, at })
    }

    /// Monta o registro mesclado; só existe a partir da etapa de confirmação.
    pub fn operation_record(&self) -> Result<OperationRecord, FlowError> {
        let invalid = || FlowError::InvalidTransition {
            from: self.current_step(),
            action: "operation_record",
        };
        if self.current_step() < FlowStep::Confirm {
            return Err(invalid());
        }
        let holder = self.holder().ok_or_else(invalid)?;
        let items = self.items().ok_or_else(invalid)?;
        let flow_type = self.flow_type().ok_or_else(invalid)?;
        let details = self.details().ok_or_else(invalid)?;

        Ok(OperationRecord {
            run_id: self.id,
            flow_type,
            employee_id: holder.employee.id,
            employee_name: holder.employee.name.clone(),
            items: items.to_vec(),
            details: details.clone(),
            signature_id: self.signature().map(|s| s.signature_id),
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::Utc;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use crate::models::employee::{Employee, VerifiedHolder};
    use crate::models::flow::{EntityKind, FlowItem};

    pub fn holder(name: &str, badge: &str) -> VerifiedHolder {
        let now = Utc::now();
        VerifiedHolder {
            employee: Employee {
                id: Uuid::new_v4(),
                tenant_id: Uuid::new_v4(),
                name: name.to_string(),
                badge_code: badge.to_string(),
                department: Some("Obras".to_string()),
                role: Some("Pedreiro".to_string()),
                photo_url: None,
                is_active: true,
                linked_user_id: None,
                created_at: now,
                updated_at: now,
            },
            linked_account: None,
        }
    }

    pub fn item(name: &str, code: &str, quantity: i64) -> FlowItem {
        FlowItem {
            id: Uuid::new_v4(),
            name: name.to_string(),
            code: code.to_string(),
            kind: EntityKind::Epi,
            quantity: Decimal::from(quantity),
            version: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{holder, item};
    use super::*;

    fn detail(k: &str, v: &str) -> OperationDetail {
        let mut d = OperationDetail::new();
        d.insert(k.to_string(), v.to_string());
        d
    }

    fn run_at_confirm(flow_type: FlowType) -> FlowRun {
        let mut run = FlowRun::new();
        run.authenticate(holder("João Silva", "COLAB-001")).unwrap();
        run.select_items(vec![item("Capacete de Segurança", "EPI-001", 1)], flow_type)
            .unwrap();
        run.submit_details(detail("Estado", "Perfeito estado"), None).unwrap();
        run
    }

    #[test]
    fn steps_advance_in_order() {
        let mut run = FlowRun::new();
        assert_eq!(run.current_step(), FlowStep::Auth);
        assert_eq!(run.authenticate(holder("Ana", "C-2")).unwrap(), FlowStep::Items);
        assert_eq!(
            run.select_items(vec![item("Luva", "EPI-7", 2)], FlowType::Return).unwrap(),
            FlowStep::Details
        );
        assert_eq!(run.submit_details(OperationDetail::new(), None).unwrap(), FlowStep::Confirm);
        let record_id = Uuid::new_v4();
        assert_eq!(run.confirm(record_id).unwrap(), FlowStep::Complete);
        assert_eq!(run.record_id(), Some(record_id));
        assert!(run.timeline().is_terminal());
    }

    #[test]
    fn skipping_a_step_is_rejected() {
        let mut run = FlowRun::new();
        let err = run
            .select_items(vec![item("Luva", "EPI-7", 1)], FlowType::Delivery)
            .unwrap_err();
        assert_eq!(
            err,
            FlowError::InvalidTransition { from: FlowStep::Auth, action: "select_items" }
        );
        assert!(run.confirm(Uuid::new_v4()).is_err());
        assert_eq!(run.current_step(), FlowStep::Auth);
    }

    #[test]
    fn empty_selection_keeps_the_run_on_items() {
        let mut run = FlowRun::new();
        run.authenticate(holder("Ana", "C-2")).unwrap();
        assert_eq!(run.select_items(vec![], FlowType::Delivery), Err(FlowError::EmptySelection));
        assert_eq!(run.current_step(), FlowStep::Items);
        assert_eq!(run.flow_type(), None);
    }

    #[test]
    fn flow_type_cannot_be_reselected_without_rewinding() {
        let mut run = FlowRun::new();
        run.authenticate(holder("Ana", "C-2")).unwrap();
        run.select_items(vec![item("Luva", "EPI-7", 1)], FlowType::Exchange).unwrap();
        assert!(run.select_items(vec![item("Luva", "EPI-7", 1)], FlowType::Return).is_err());
        assert_eq!(run.flow_type(), Some(FlowType::Exchange));
    }

    #[test]
    fn term_only_attaches_to_delivery() {
        let mut run = FlowRun::new();
        run.authenticate(holder("Ana", "C-2")).unwrap();
        run.select_items(vec![item("Luva", "EPI-7", 1)], FlowType::Return).unwrap();
        let draft = TermDraft { term_id: Uuid::new_v4(), preview: "x".into() };
        assert!(run.submit_details(OperationDetail::new(), Some(draft)).is_err());
        assert_eq!(run.current_step(), FlowStep::Details);
    }

    #[test]
    fn rewind_truncates_later_records() {
        let mut run = run_at_confirm(FlowType::Return);
        assert_eq!(run.rewind_to(FlowStep::Details).unwrap(), FlowStep::Details);
        assert!(run.details().is_none());
        assert_eq!(run.flow_type(), Some(FlowType::Return));

        assert_eq!(run.rewind_to(FlowStep::Items).unwrap(), FlowStep::Items);
        assert_eq!(run.flow_type(), None);
        assert!(run.holder().is_some());

        run.select_items(vec![item("Bota", "EPI-3", 1)], FlowType::Delivery).unwrap();
        assert_eq!(run.flow_type(), Some(FlowType::Delivery));
    }

    #[test]
    fn rewind_forward_or_from_complete_is_rejected() {
        let mut run = run_at_confirm(FlowType::Return);
        assert!(run.rewind_to(FlowStep::Confirm).is_err());
        assert!(run.rewind_to(FlowStep::Complete).is_err());
        run.confirm(Uuid::new_v4()).unwrap();
        assert!(run.rewind_to(FlowStep::Auth).is_err());
    }

    #[test]
    fn rewind_drops_a_held_signature() {
        let mut run = run_at_confirm(FlowType::Delivery);
        run.hold_signature(SignedTerm {
            signature_id: Uuid::new_v4(),
            title: "Termo".into(),
            rendered_body: "corpo".into(),
            version: 1,
            validation_hash: "abc".into(),
            signed_at: chrono::Utc::now(),
        })
        .unwrap();
        run.rewind_to(FlowStep::Details).unwrap();
        assert!(run.pending_signature().is_none());
    }

    #[test]
    fn cancel_is_refused_once_complete() {
        let run = run_at_confirm(FlowType::Return);
        assert_eq!(run.clone().cancel().unwrap().at, FlowStep::Confirm);

        let mut done = run;
        done.confirm(Uuid::new_v4()).unwrap();
        assert!(done.cancel().is_err());
    }

    #[test]
    fn operation_record_requires_confirm_step() {
        let mut run = FlowRun::new();
        run.authenticate(holder("Ana", "C-2")).unwrap();
        assert!(run.operation_record().is_err());

        let run = run_at_confirm(FlowType::Return);
        let record = run.operation_record().unwrap();
        assert_eq!(record.flow_type, FlowType::Return);
        assert_eq!(record.employee_name, "João Silva");
        assert_eq!(record.items.len(), 1);
        assert_eq!(record.signature_id, None);
    }
}
