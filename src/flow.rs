// src/flow.rs

//! Núcleo do fluxo QR de equipamentos: não conhece HTTP nem SQL,
//! só o `FlowBackend` que recebe de quem o usa.

pub mod codec;
pub mod collectors;
pub mod error;
pub mod orchestrator;
pub mod run;
pub mod term;
pub mod timeline;

pub use codec::{DecodedQr, QrCodec};
pub use collectors::{CollectorContext, CollectorInput, DetailCollector};
pub use error::FlowError;
pub use orchestrator::{FlowBackend, FlowOrchestrator};
pub use run::{CancelledRun, FlowRun, StepRecord, TermDraft};
pub use timeline::FlowTimeline;
