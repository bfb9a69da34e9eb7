//! The reconciliation pipeline: extraction feeds case resolution, document
//! attachment, and task reconciliation, driven per message by the intake
//! orchestrator.

pub mod documents;
pub mod intake;
pub mod resolve;
pub mod tasks;

pub use intake::{IntakePipeline, ItemStage, RunSummary};
