// src/flow/timeline.rs

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::flow::{FlowStep, FlowType};

/// Projeção do progresso de uma execução, usada para desenhar as etapas.
///
/// Só responde perguntas; quem avança é o `FlowRun`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlowTimeline {
    pub current_step: FlowStep,
    pub flow_type: Option<FlowType>,
}

impl FlowTimeline {
    pub fn new(current_step: FlowStep, flow_type: Option<FlowType>) -> Self {
        Self { current_step, flow_type }
    }

    pub fn is_step_complete(&self, step: FlowStep) -> bool {
        step.index() < self.current_step.index()
    }

    pub fn is_step_active(&self, step: FlowStep) -> bool {
        step == self.current_step
    }

    pub fn is_terminal(&self) -> bool {
        self.current_step == FlowStep::Complete
    }
}
