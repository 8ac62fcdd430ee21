//! Scripted judge: fixed answers per query kind, with call counters.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{JudgmentError, JudgmentPort, JudgmentQuery, QueryKind};

/// Behaviour for one query kind.
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Return this text
    Answer(String),
    /// Fail with this error
    Fail(JudgmentError),
    /// Never answer (exercises the gate timeout)
    Stall,
}

/// Deterministic judge for tests and demos.
///
/// Defaults: validation "yes", fraud "no", a fixed summary line.
#[derive(Debug)]
pub struct ScriptedJudge {
    validation: Scripted,
    fraud: Scripted,
    summary: Scripted,
    validation_calls: AtomicUsize,
    fraud_calls: AtomicUsize,
    summary_calls: AtomicUsize,
}

impl ScriptedJudge {
    pub fn new() -> Self {
        Self {
            validation: Scripted::Answer("yes".into()),
            fraud: Scripted::Answer("no".into()),
            summary: Scripted::Answer("Scripted summary.".into()),
            validation_calls: AtomicUsize::new(0),
            fraud_calls: AtomicUsize::new(0),
            summary_calls: AtomicUsize::new(0),
        }
    }

    pub fn validation(self, answer: impl Into<String>) -> Self {
        self.script(QueryKind::Validation, Scripted::Answer(answer.into()))
    }

    pub fn fraud(self, answer: impl Into<String>) -> Self {
        self.script(QueryKind::Fraud, Scripted::Answer(answer.into()))
    }

    pub fn summary(self, answer: impl Into<String>) -> Self {
        self.script(QueryKind::RecoverySummary, Scripted::Answer(answer.into()))
    }

    pub fn script(mut self, kind: QueryKind, behaviour: Scripted) -> Self {
        match kind {
            QueryKind::Validation => self.validation = behaviour,
            QueryKind::Fraud => self.fraud = behaviour,
            QueryKind::RecoverySummary => self.summary = behaviour,
        }
        self
    }

    /// Number of times a query of this kind reached the judge.
    pub fn calls(&self, kind: QueryKind) -> usize {
        self.counter(kind).load(Ordering::SeqCst)
    }

    fn counter(&self, kind: QueryKind) -> &AtomicUsize {
        match kind {
            QueryKind::Validation => &self.validation_calls,
            QueryKind::Fraud => &self.fraud_calls,
            QueryKind::RecoverySummary => &self.summary_calls,
        }
    }

    fn behaviour(&self, kind: QueryKind) -> &Scripted {
        match kind {
            QueryKind::Validation => &self.validation,
            QueryKind::Fraud => &self.fraud,
            QueryKind::RecoverySummary => &self.summary,
        }
    }
}

impl Default for ScriptedJudge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JudgmentPort for ScriptedJudge {
    async fn answer(&self, query: &JudgmentQuery<'_>) -> Result<String, JudgmentError> {
        let kind = query.kind();
        self.counter(kind).fetch_add(1, Ordering::SeqCst);

        match self.behaviour(kind) {
            Scripted::Answer(text) => Ok(text.clone()),
            Scripted::Fail(e) => Err(e.clone()),
            Scripted::Stall => std::future::pending().await,
        }
    }

    fn backend_name(&self) -> &'static str {
        "scripted"
    }
}
