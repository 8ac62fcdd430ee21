//! Pipeline Demo
//!
//! Runs three sample transactions through the full pipeline with the
//! rule-based judge and an in-memory store:
//! - a clean transaction (fulfilled)
//! - a `FAILURE` transaction (validation fast path, flagged)
//! - a large transaction from a suspicious device (flagged as fraud)
//!
//! # Usage
//! ```bash
//! ./pipeline-demo
//! ./pipeline-demo --emit | ./txn-guardian --stdin
//! ```

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use serde_json::json;
use std::sync::Arc;

use txn_guardian::config::RulesConfig;
use txn_guardian::judgment::{GatePolicy, JudgmentGate, JudgmentPort, RuleBasedJudge};
use txn_guardian::pipeline::{Orchestrator, TransactionProcessor};
use txn_guardian::storage::InMemoryStore;
use txn_guardian::TransactionRecord;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "pipeline-demo")]
#[command(about = "Sample transactions through the txn-guardian pipeline")]
#[command(version)]
struct Args {
    /// Print the sample payloads as JSON lines instead of processing them
    #[arg(long)]
    emit: bool,

    /// Print final records as JSON instead of a readable summary
    #[arg(long)]
    json: bool,
}

// ============================================================================
// Sample transactions
// ============================================================================

struct Scenario {
    name: &'static str,
    status: &'static str,
    amount: u64,
    suspicious: bool,
}

const SCENARIOS: [Scenario; 3] = [
    Scenario {
        name: "Valid Transaction",
        status: "SUCCESS",
        amount: 1000,
        suspicious: false,
    },
    Scenario {
        name: "Failed Transaction",
        status: "FAILURE",
        amount: 1000,
        suspicious: false,
    },
    Scenario {
        name: "Potentially Fraudulent Transaction",
        status: "SUCCESS",
        amount: 50_000,
        suspicious: true,
    },
];

fn sample_payload(scenario: &Scenario, seq: usize) -> serde_json::Value {
    let now = Utc::now().to_rfc3339();
    let id = format!("{}_{seq}", Utc::now().timestamp());
    let metadata = if scenario.suspicious {
        json!({
            "ip_address": "192.168.1.100",
            "device_id": "suspicious_device_123",
            "user_agent": "Mozilla/5.0 (compatible; SuspiciousBrowser/1.0)"
        })
    } else {
        json!({})
    };

    json!({
        "captureId": format!("cap_{id}"),
        "requestId": format!("req_{id}"),
        "chargeId": format!("chg_{id}"),
        "status": scenario.status,
        "amount": {"value": scenario.amount, "currency": "SGD"},
        "metadata": metadata,
        "createdAt": now,
        "updatedAt": now
    })
}

fn print_summary(name: &str, record: &TransactionRecord) {
    let tx = record.transaction();
    println!("=== {name} ===");
    println!("Transaction ID: {}", tx.capture_id);
    println!("Amount: {} {}", tx.amount.value, tx.amount.currency);
    println!("Status: {}", tx.status);
    println!();
    println!("Processing Results:");
    println!("- Valid: {}", record.is_valid());
    println!("- Fraudulent: {}", record.is_fraudulent());
    match record.fulfillment_status() {
        Some(status) => println!("- Fulfillment Status: {status}"),
        None => println!("- Fulfillment Status: none"),
    }
    if let Some(msg) = record.error_message() {
        println!("- Error: {msg}");
    }
    println!();
    println!("Processing History:");
    for (i, entry) in record.history().iter().enumerate() {
        println!("{}. {entry}", i + 1);
    }
    println!("{}", "=".repeat(80));
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if args.emit {
        for (seq, scenario) in SCENARIOS.iter().enumerate() {
            println!("{}", sample_payload(scenario, seq));
        }
        return Ok(());
    }

    let judge = RuleBasedJudge::new(&RulesConfig::default()).context("Invalid default rules")?;
    let gate = JudgmentGate::new(Arc::new(judge) as Arc<dyn JudgmentPort>, GatePolicy::default());
    let processor = TransactionProcessor::new(
        Arc::new(Orchestrator::standard(gate)),
        Arc::new(InMemoryStore::new()),
    );

    for (seq, scenario) in SCENARIOS.iter().enumerate() {
        let record = processor
            .submit_json(&sample_payload(scenario, seq))
            .await
            .with_context(|| format!("{} was rejected", scenario.name))?;

        if args.json {
            println!("{}", serde_json::to_string(&record)?);
        } else {
            print_summary(scenario.name, &record);
        }
    }

    Ok(())
}
