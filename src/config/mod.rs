//! Service Configuration Module
//!
//! Loads `ServiceConfig` from TOML. Every field has a built-in default, so an
//! empty or missing file yields a working rule-based deployment.
//!
//! ## Loading Order
//!
//! 1. `TXN_GUARDIAN_CONFIG` environment variable (path to TOML file)
//! 2. `txn_guardian.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! ```ignore
//! // In main():
//! config::init(ServiceConfig::load());
//!
//! // Anywhere in the binary:
//! let timeout = config::get().judgment.timeout_ms;
//! ```
//!
//! Library components take their config section by value at construction;
//! only the binaries go through the global.

mod service_config;

pub use service_config::*;

use std::sync::OnceLock;

/// Global service configuration, initialized once at startup.
static SERVICE_CONFIG: OnceLock<ServiceConfig> = OnceLock::new();

/// Initialize the global service configuration.
///
/// Later calls are ignored with a warning.
pub fn init(config: ServiceConfig) {
    if SERVICE_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get a reference to the global service configuration.
///
/// Panics if `init()` has not been called; a missing config is a startup bug.
pub fn get() -> &'static ServiceConfig {
    SERVICE_CONFIG
        .get()
        .expect("config::get() called before config::init(), this is a startup bug")
}
