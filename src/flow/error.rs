// src/flow/error.rs

use thiserror::Error;

use crate::models::flow::{FlowStep, FlowType};

/// Erros do núcleo do fluxo (sem banco, sem HTTP).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("Transição inválida: '{action}' não é permitida na etapa {from:?}")]
    InvalidTransition { from: FlowStep, action: &'static str },

    #[error("Selecione ao menos um item")]
    EmptySelection,

    #[error("Campo obrigatório não preenchido: {0}")]
    MissingRequiredField(&'static str),

    #[error("Opção inválida para '{field}': {value}")]
    InvalidChoice { field: &'static str, value: String },

    #[error("Os detalhes enviados são de {got:?}, mas o fluxo é {expected:?}")]
    FlowTypeMismatch { expected: FlowType, got: FlowType },

    #[error("Somente a entrega leva termo digital; o fluxo é {0:?}")]
    TermNotAllowed(FlowType),

    #[error("Não é possível voltar para {to:?} a partir de {from:?}")]
    InvalidRewind { from: FlowStep, to: FlowStep },
}
