//! Service layer: the document-to-decision pipeline.
//!
//! This module contains domain logic separated from transport concerns.
//! Services can be used by the CLI, the web server, or tests.

pub mod approval;
pub mod extraction;
pub mod policy;

pub use approval::{ApprovalWorkflow, WorkflowError};
pub use extraction::{ExtractError, ExtractionOutcome, ExtractionService};
pub use policy::{EngineError, EvaluationReport, InvoiceFacts, PolicyEngine, PolicyEvaluation};
