//! Stage graph
//!
//! ```text
//! Validating ──isValid == yes──▶ FraudChecking ──▶ Recovering ──▶ Done
//!      │                                               ▲
//!      └──────────────otherwise (no / unknown)─────────┘
//! ```
//!
//! The graph is built once and shared read-only between runs. Edges are data:
//! either an unconditional successor or a routing function over the record.

use serde::Serialize;
use std::fmt;

use super::stages::{self, Stage};
use crate::types::{TransactionRecord, Verdict};

/// Pipeline states that execute a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StageId {
    Validating,
    FraudChecking,
    Recovering,
}

impl StageId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "Validating",
            Self::FraudChecking => "FraudChecking",
            Self::Recovering => "Recovering",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where control goes after a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Stage(StageId),
    Done,
}

/// Routing function for a conditional edge.
pub type Router = fn(&TransactionRecord) -> Step;

/// Outgoing edge of a node.
#[derive(Clone, Copy)]
pub enum Edge {
    Always(Step),
    Branch(Router),
}

impl Edge {
    pub fn resolve(&self, record: &TransactionRecord) -> Step {
        match self {
            Self::Always(step) => *step,
            Self::Branch(route) => route(record),
        }
    }
}

/// The single conditional edge: only a definite "valid" reaches fraud checking.
pub fn route_after_validation(record: &TransactionRecord) -> Step {
    match record.is_valid() {
        Verdict::Yes => Step::Stage(StageId::FraudChecking),
        Verdict::No | Verdict::Unknown => Step::Stage(StageId::Recovering),
    }
}

/// Stage handler plus its outgoing edge.
pub struct Node {
    pub stage: Box<dyn Stage>,
    pub edge: Edge,
}

/// Fixed three-node graph; every node always exists, so lookups cannot fail.
pub struct PipelineGraph {
    validate: Node,
    fraud: Node,
    recover: Node,
}

impl PipelineGraph {
    /// The production graph with the standard stages.
    pub fn standard() -> Self {
        Self::with_stages(
            Box::new(stages::ValidateStage),
            Box::new(stages::FraudStage),
            Box::new(stages::RecoverStage),
        )
    }

    /// Same topology, custom handlers.
    pub fn with_stages(
        validate: Box<dyn Stage>,
        fraud: Box<dyn Stage>,
        recover: Box<dyn Stage>,
    ) -> Self {
        Self {
            validate: Node {
                stage: validate,
                edge: Edge::Branch(route_after_validation),
            },
            fraud: Node {
                stage: fraud,
                edge: Edge::Always(Step::Stage(StageId::Recovering)),
            },
            recover: Node {
                stage: recover,
                edge: Edge::Always(Step::Done),
            },
        }
    }

    pub fn entry(&self) -> StageId {
        StageId::Validating
    }

    pub fn node(&self, id: StageId) -> &Node {
        match id {
            StageId::Validating => &self.validate,
            StageId::FraudChecking => &self.fraud,
            StageId::Recovering => &self.recover,
        }
    }

    /// Successor of `id` given the record as the stage left it.
    pub fn next(&self, id: StageId, record: &TransactionRecord) -> Step {
        self.node(id).edge.resolve(record)
    }
}

impl Default for PipelineGraph {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Amount, Metadata, Transaction, TransactionStatus};

    fn blank_record() -> TransactionRecord {
        TransactionRecord::new(Transaction {
            capture_id: "cap_graph".to_string(),
            request_id: "req_graph".to_string(),
            charge_id: "chg_graph".to_string(),
            status: TransactionStatus::Success,
            amount: Amount {
                value: 1000,
                currency: "SGD".to_string(),
            },
            metadata: Metadata::new(),
            created_at: "2025-06-30T20:53:06Z".to_string(),
            updated_at: "2025-06-30T20:53:06Z".to_string(),
        })
    }

    #[test]
    fn test_valid_routes_to_fraud_check() {
        let mut record = blank_record();
        record.resolve_validity(true);
        let graph = PipelineGraph::standard();
        assert_eq!(
            graph.next(StageId::Validating, &record),
            Step::Stage(StageId::FraudChecking)
        );
    }

    #[test]
    fn test_invalid_and_unknown_skip_fraud_check() {
        let graph = PipelineGraph::standard();

        let unknown = blank_record();
        assert_eq!(
            graph.next(StageId::Validating, &unknown),
            Step::Stage(StageId::Recovering)
        );

        let mut invalid = blank_record();
        invalid.resolve_validity(false);
        assert_eq!(
            graph.next(StageId::Validating, &invalid),
            Step::Stage(StageId::Recovering)
        );
    }

    #[test]
    fn test_unconditional_edges() {
        let graph = PipelineGraph::standard();
        let record = blank_record();
        assert_eq!(
            graph.next(StageId::FraudChecking, &record),
            Step::Stage(StageId::Recovering)
        );
        assert_eq!(graph.next(StageId::Recovering, &record), Step::Done);
        assert_eq!(graph.entry(), StageId::Validating);
    }

    #[test]
    fn test_nodes_hold_matching_stages() {
        let graph = PipelineGraph::standard();
        for id in [StageId::Validating, StageId::FraudChecking, StageId::Recovering] {
            assert_eq!(graph.node(id).stage.id(), id);
        }
    }
}
