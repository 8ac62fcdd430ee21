//! Judgment Port Module
//!
//! Abstraction over the external oracle each pipeline stage consults.
//!
//! ## Architecture
//!
//! - **JudgmentPort**: backend trait returning raw oracle text for a query
//! - **JudgmentGate**: the only call site stages use; applies timeout, bounded
//!   retry and cancellation, and parses text into a closed [`Judgment`]
//! - Backends:
//!   - [`RuleBasedJudge`]: deterministic rules, no external calls
//!   - [`HttpJudge`]: OpenAI-compatible chat-completions endpoint
//!   - [`ScriptedJudge`]: fixed answers with call counters (tests, demo)

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::config::{JudgmentBackend, JudgmentConfig, RulesConfig};
use crate::types::{FulfillmentStatus, Transaction};

pub mod gate;
pub mod http;
pub mod rules;
pub mod scripted;

pub use gate::{GatePolicy, JudgmentGate};
pub use http::HttpJudge;
pub use rules::RuleBasedJudge;
pub use scripted::{Scripted, ScriptedJudge};

// ============================================================================
// Rubrics
// ============================================================================

const VALIDATION_RUBRIC: &str = "You validate payment transaction records. \
Check that: (1) captureId, requestId, chargeId, status, amount and metadata are present; \
(2) status is one of PENDING, SUCCESS, FAILED; \
(3) amount.value is a positive integer; \
(4) amount.currency is a valid ISO 4217 three-letter code; \
(5) createdAt and updatedAt are valid ISO 8601 timestamps. \
Answer with exactly one word: 'yes' if every check passes, otherwise 'no'.";

const FRAUD_RUBRIC: &str = "You assess payment transactions for fraud. \
Consider the amount, the currency and every metadata field (devices, IP addresses, user agents). \
Answer with exactly one word: 'yes' if the transaction looks fraudulent, otherwise 'no'.";

const RECOVERY_RUBRIC: &str = "You handle fulfillment and resolution of processed transactions. \
Given the validation result, the fraud check result and the fulfillment decision, \
write a brief summary of the action taken and the next steps.";

// ============================================================================
// Query
// ============================================================================

/// Which stage a query belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum QueryKind {
    Validation,
    Fraud,
    RecoverySummary,
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryKind::Validation => write!(f, "Validation"),
            QueryKind::Fraud => write!(f, "Fraud"),
            QueryKind::RecoverySummary => write!(f, "RecoverySummary"),
        }
    }
}

/// Structured query: rubric plus stage-specific context.
#[derive(Debug, Clone, Copy)]
pub enum JudgmentQuery<'a> {
    /// Is the transaction well-formed per the validation rubric?
    Validation { transaction: &'a Transaction },
    /// Is the transaction fraudulent?
    Fraud { transaction: &'a Transaction },
    /// Free-text summary of the disposition (advisory only).
    RecoverySummary {
        validation_status: &'a str,
        fraud_status: &'a str,
        fulfillment: FulfillmentStatus,
    },
}

impl JudgmentQuery<'_> {
    pub fn kind(&self) -> QueryKind {
        match self {
            Self::Validation { .. } => QueryKind::Validation,
            Self::Fraud { .. } => QueryKind::Fraud,
            Self::RecoverySummary { .. } => QueryKind::RecoverySummary,
        }
    }

    /// Instruction text sent to text-based oracles.
    pub fn rubric(&self) -> &'static str {
        match self {
            Self::Validation { .. } => VALIDATION_RUBRIC,
            Self::Fraud { .. } => FRAUD_RUBRIC,
            Self::RecoverySummary { .. } => RECOVERY_RUBRIC,
        }
    }

    /// Context as JSON, for text-based oracles.
    pub fn context(&self) -> serde_json::Value {
        match self {
            Self::Validation { transaction } | Self::Fraud { transaction } => {
                serde_json::to_value(transaction).unwrap_or(serde_json::Value::Null)
            }
            Self::RecoverySummary {
                validation_status,
                fraud_status,
                fulfillment,
            } => serde_json::json!({
                "validation": validation_status,
                "fraudCheck": fraud_status,
                "fulfillmentStatus": fulfillment,
            }),
        }
    }
}

// ============================================================================
// Answer
// ============================================================================

/// Closed binary classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Judgment {
    Yes,
    No,
}

impl Judgment {
    /// Exact case-insensitive match against "yes" / "no" after trimming.
    pub fn parse(text: &str) -> Result<Self, JudgmentError> {
        let trimmed = text.trim();
        if trimmed.eq_ignore_ascii_case("yes") {
            Ok(Self::Yes)
        } else if trimmed.eq_ignore_ascii_case("no") {
            Ok(Self::No)
        } else {
            Err(JudgmentError::Malformed(format!(
                "expected 'yes' or 'no', got {:?}",
                truncate(trimmed, 80)
            )))
        }
    }

    pub fn is_yes(self) -> bool {
        self == Self::Yes
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Oracle failure kinds.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JudgmentError {
    #[error("judgment timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("backend error: {0}")]
    Backend(String),
    #[error("judgment cancelled")]
    Cancelled,
}

impl JudgmentError {
    /// Every kind except cancellation means "judgment unavailable".
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, Self::Cancelled)
    }

    /// Worth another attempt of the same call.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Transport(_))
    }
}

// ============================================================================
// Port
// ============================================================================

/// Backend trait for judgment oracles.
#[async_trait]
pub trait JudgmentPort: Send + Sync {
    /// Raw oracle text for the query.
    async fn answer(&self, query: &JudgmentQuery<'_>) -> Result<String, JudgmentError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Factory for judgment backends
pub struct JudgeFactory;

impl JudgeFactory {
    /// Build the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule pattern does not compile, the http backend
    /// has no endpoint, or the HTTP client cannot be built.
    pub fn create(
        judgment: &JudgmentConfig,
        rules: &RulesConfig,
    ) -> Result<Arc<dyn JudgmentPort>, JudgmentError> {
        let port: Arc<dyn JudgmentPort> = match judgment.backend {
            JudgmentBackend::Rules => Arc::new(
                RuleBasedJudge::new(rules).map_err(|e| JudgmentError::Backend(e.to_string()))?,
            ),
            JudgmentBackend::Http => {
                let endpoint = judgment.endpoint.as_deref().ok_or_else(|| {
                    JudgmentError::Backend("http backend requires an endpoint".into())
                })?;
                let api_key = std::env::var(&judgment.api_key_env).ok();
                if api_key.is_none() {
                    tracing::warn!(
                        env = %judgment.api_key_env,
                        "No API key found for http judgment backend, sending unauthenticated requests"
                    );
                }
                Arc::new(HttpJudge::new(endpoint, &judgment.model, api_key)?)
            }
        };

        tracing::info!(backend = port.backend_name(), "Judgment backend ready");
        Ok(port)
    }
}
