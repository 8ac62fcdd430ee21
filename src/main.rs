//! txn-guardian - transaction processing service
//!
//! Validates, fraud-checks and dispositions payment transactions, persisting
//! each final record with its audit history.
//!
//! # Usage
//!
//! ```bash
//! # HTTP service (config from ./txn_guardian.toml or built-in defaults)
//! cargo run --release
//!
//! # One JSON payload per line on stdin, one final record per line on stdout
//! cat payloads.jsonl | ./txn-guardian --stdin
//! ```
//!
//! # Environment Variables
//!
//! - `TXN_GUARDIAN_CONFIG`: Path to the TOML config file
//! - `TXN_GUARDIAN_ADDR`: Override the server address
//! - `RUST_LOG`: Logging level (default: info)
//! - `LOG_FORMAT`: Set to "json" for JSON log lines
//! - `RESET_DB`: Set to "true" to wipe the transaction store on startup

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use txn_guardian::api::{create_app, ApiState};
use txn_guardian::config::{self, ServiceConfig, StorageBackend};
use txn_guardian::judgment::{GatePolicy, JudgeFactory, JudgmentGate};
use txn_guardian::pipeline::{IngressError, Orchestrator, TransactionProcessor};
use txn_guardian::storage::open_store;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "txn-guardian")]
#[command(about = "Transaction validation, fraud assessment and fulfillment service")]
#[command(version)]
struct CliArgs {
    /// Read one JSON transaction per line from stdin instead of serving HTTP
    #[arg(long)]
    stdin: bool,

    /// Override the server address (default from config: "0.0.0.0:8080")
    #[arg(short, long, env = "TXN_GUARDIAN_ADDR")]
    addr: Option<String>,

    /// Path to the TOML config file (overrides the standard search order)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the sled database directory
    #[arg(long)]
    storage_path: Option<PathBuf>,

    /// Delete the transaction store before starting.
    /// WARNING: This is destructive and cannot be undone!
    /// Can also be set via RESET_DB=true environment variable.
    #[arg(long)]
    reset_db: bool,
}

// ============================================================================
// Startup helpers
// ============================================================================

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Check if a store reset is requested via CLI flag or environment variable.
fn should_reset_db(cli_flag: bool) -> bool {
    if cli_flag {
        return true;
    }
    if let Ok(val) = std::env::var("RESET_DB") {
        let val_lower = val.to_lowercase();
        return val_lower == "true" || val_lower == "1" || val_lower == "yes";
    }
    false
}

/// Remove the sled database directory.
fn reset_store(path: &Path) -> Result<()> {
    if !path.exists() {
        info!(path = %path.display(), "Store does not exist, nothing to reset");
        return Ok(());
    }

    warn!(path = %path.display(), "RESET_DB requested, wiping transaction store");
    std::fs::remove_dir_all(path)
        .with_context(|| format!("Failed to remove {}", path.display()))?;
    Ok(())
}

fn load_config(args: &CliArgs) -> Result<ServiceConfig> {
    let mut cfg = match &args.config {
        Some(path) => ServiceConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ServiceConfig::load(),
    };

    if let Some(addr) = &args.addr {
        cfg.server.addr.clone_from(addr);
    }
    if let Some(path) = &args.storage_path {
        cfg.storage.path.clone_from(path);
    }

    cfg.validate().context("Invalid service configuration")?;
    Ok(cfg)
}

fn build_processor(cfg: &ServiceConfig) -> Result<Arc<TransactionProcessor>> {
    let port = JudgeFactory::create(&cfg.judgment, &cfg.rules)
        .context("Failed to create judgment backend")?;
    let gate = JudgmentGate::new(port, GatePolicy::from(&cfg.judgment));
    let orchestrator = Arc::new(Orchestrator::standard(gate));
    let store = open_store(&cfg.storage).context("Failed to open transaction store")?;

    Ok(Arc::new(TransactionProcessor::new(orchestrator, store)))
}

// ============================================================================
// Run modes
// ============================================================================

async fn run_http(
    processor: Arc<TransactionProcessor>,
    cfg: &ServiceConfig,
    cancel_token: CancellationToken,
) -> Result<()> {
    let app = create_app(ApiState::new(processor), cfg.server.body_limit_bytes);

    let listener = tokio::net::TcpListener::bind(&cfg.server.addr)
        .await
        .with_context(|| format!("Failed to bind {}", cfg.server.addr))?;
    info!(addr = %cfg.server.addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
            info!("[HttpServer] Received shutdown signal");
        })
        .await
        .context("HTTP server error")?;

    info!("[HttpServer] Graceful shutdown complete");
    Ok(())
}

async fn run_stdin(processor: Arc<TransactionProcessor>, cancel_token: CancellationToken) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut line_no = 0usize;

    loop {
        let line = tokio::select! {
            () = cancel_token.cancelled() => break,
            line = lines.next_line() => line.context("Failed to read stdin")?,
        };
        let Some(line) = line else { break };
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let payload: serde_json::Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                warn!(line = line_no, error = %e, "Skipping unparseable line");
                continue;
            }
        };

        let transaction = match txn_guardian::pipeline::parse_payload(&payload) {
            Ok(tx) => tx,
            Err(issues) => {
                warn!(line = line_no, issues = ?issues, "Skipping malformed payload");
                continue;
            }
        };

        match processor.submit_with_cancel(transaction, &cancel_token).await {
            Ok(record) => {
                let mut out = serde_json::to_vec(&record)?;
                out.push(b'\n');
                stdout.write_all(&out).await?;
                stdout.flush().await?;
            }
            Err(IngressError::Interrupted(e)) => {
                warn!(line = line_no, error = %e, "Processing interrupted");
                break;
            }
            Err(e) => warn!(line = line_no, error = %e, "Transaction rejected"),
        }
    }

    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let args = CliArgs::parse();
    let cfg = load_config(&args)?;

    // Reset check BEFORE the store is opened
    if should_reset_db(args.reset_db) && cfg.storage.backend == StorageBackend::Sled {
        reset_store(&cfg.storage.path)?;
    }

    config::init(cfg);
    let cfg = config::get();

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  txn-guardian {}", env!("CARGO_PKG_VERSION"));
    info!(
        "  Judgment: {:?} | Store: {:?} | Timeout: {}ms x{}",
        cfg.judgment.backend, cfg.storage.backend, cfg.judgment.timeout_ms, cfg.judgment.max_attempts
    );
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let processor = build_processor(cfg)?;

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let result = if args.stdin {
        info!("Input: stdin (one JSON transaction per line)");
        run_stdin(Arc::clone(&processor), cancel_token).await
    } else {
        run_http(Arc::clone(&processor), cfg, cancel_token).await
    };

    if let Err(e) = processor.store().flush() {
        error!(error = %e, "Failed to flush transaction store");
    }

    result
}
