//! Transaction Pipeline Module
//!
//! ## Stage Graph
//!
//! ```text
//! Ingress:      structural check, in-flight / duplicate guard
//! Validating:   FAILURE sentinel fast path, else validation judgment
//! FraudChecking: ONLY if isValid == yes
//! Recovering:   ALWAYS; fulfillment status from (isValid, isFraudulent)
//! Store:        one save per completed run
//! ```
//!
//! CRITICAL GUARANTEE: every run that is not cancelled ends in Recovering, so
//! every stored record carries a fulfillment status.

mod graph;
mod intake;
mod orchestrator;
mod processor;
pub mod stages;

pub use graph::{route_after_validation, Edge, Node, PipelineGraph, Router, StageId, Step};
pub use intake::{parse_payload, FieldIssue};
pub use orchestrator::{Orchestrator, PipelineError, RunTrace};
pub use processor::{IngressError, TransactionProcessor};
pub use stages::{FraudStage, RecoverStage, Stage, StageInterrupted, ValidateStage};
