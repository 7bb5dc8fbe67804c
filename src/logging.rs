//! # Tracing Module
//!
//! Environment-aware console logging using the tracing ecosystem.
//!
//! This module provides:
//! - Console-only logging to stdout
//! - Environment-based log level configuration
//! - Optional JSON output for log shippers
//! - TTY-aware ANSI color output
//! - Structured helpers for job and step lifecycle events
//!
//! Initialization is idempotent. If another subscriber is already installed
//! (for example by a test harness) it is left in place.

use crate::config::BatchConfig;
use chrono::Utc;
use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize logging from environment variables alone
pub fn init_structured_logging() {
    let environment = get_environment();
    let log_level = get_log_level(&environment);
    let json = std::env::var("BATCH_JSON_LOGS")
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false);
    init(&environment, &log_level, json);
}

/// Initialize logging from a loaded [`BatchConfig`]
pub fn init_with_config(config: &BatchConfig) {
    init(
        &config.environment,
        &config.effective_log_level(),
        config.json_logs,
    );
}

fn init(environment: &str, log_level: &str, json: bool) {
    TRACING_INITIALIZED.get_or_init(|| {
        let use_ansi = IsTerminal::is_terminal(&std::io::stdout());

        let console_layer = if json {
            fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_filter(EnvFilter::new(log_level))
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(use_ansi)
                .with_filter(EnvFilter::new(log_level))
                .boxed()
        };

        let subscriber = tracing_subscriber::registry().with(console_layer);

        if subscriber.try_init().is_err() {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        } else {
            tracing::info!(
                environment = %environment,
                log_level = %log_level,
                ansi_colors = use_ansi,
                json_logs = json,
                "Console logging initialized"
            );
        }
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("BATCH_ENVIRONMENT")
        .or_else(|_| std::env::var("BATCH_ENV"))
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment variables or environment defaults
fn get_log_level(environment: &str) -> String {
    if let Ok(level) = std::env::var("BATCH_LOG_LEVEL") {
        return level.to_lowercase();
    }

    if let Ok(level) = std::env::var("RUST_LOG") {
        return level.to_lowercase();
    }

    match environment {
        "production" => "info".to_string(),
        "test" => "warn".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log a job lifecycle event
pub fn log_job_operation(
    operation: &str,
    job_name: &str,
    execution_id: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        job_name = %job_name,
        execution_id = execution_id.unwrap_or("-"),
        status = %status,
        details = details.unwrap_or(""),
        timestamp = %Utc::now().to_rfc3339(),
        "📋 JOB_OPERATION"
    );
}

/// Log a step lifecycle event
pub fn log_step_operation(
    operation: &str,
    job_name: &str,
    step_name: &str,
    status: &str,
    details: Option<&str>,
) {
    if status == "FAILED" {
        tracing::warn!(
            operation = %operation,
            job_name = %job_name,
            step_name = %step_name,
            status = %status,
            details = details.unwrap_or(""),
            timestamp = %Utc::now().to_rfc3339(),
            "🔧 STEP_OPERATION"
        );
    } else {
        tracing::info!(
            operation = %operation,
            job_name = %job_name,
            step_name = %step_name,
            status = %status,
            details = details.unwrap_or(""),
            timestamp = %Utc::now().to_rfc3339(),
            "🔧 STEP_OPERATION"
        );
    }
}
