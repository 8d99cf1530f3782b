//! Process-wide `tracing` setup for programs built on this crate.
//!
//! Stream output (fragments, transcripts, raw events) is written to stdout by
//! the observers, so log lines never go there: the console layer writes to
//! stderr. The default filter is `warn`; a normal session logs nothing and
//! the demonstration output reads the same with or without a subscriber.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

pub const ENABLED_ENV: &str = "STREAM_CONSUMER_OBSERVABILITY_ENABLED";
pub const LOG_LEVEL_ENV: &str = "STREAM_CONSUMER_LOG_LEVEL";
pub const JSON_LOG_PATH_ENV: &str = "STREAM_CONSUMER_JSON_LOG_PATH";
pub const DEFAULT_FILTER: &str = "warn";
const DEFAULT_JSON_FILE: &str = "stream-consumer.logs.jsonl";

static INIT: OnceCell<()> = OnceCell::new();

/// Where log records go.
#[derive(Clone, Debug, PartialEq, Eq)]
enum LogTarget {
    Disabled,
    /// Compact console lines on stderr.
    Stderr,
    /// JSON lines appended to a file.
    JsonFile { dir: PathBuf, file_name: String },
}

fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

fn log_target_from(lookup: impl Fn(&str) -> Option<String>) -> LogTarget {
    let enabled = lookup(ENABLED_ENV)
        .and_then(|v| parse_bool_env(&v))
        .unwrap_or(true);
    if !enabled {
        return LogTarget::Disabled;
    }
    match lookup(JSON_LOG_PATH_ENV).filter(|p| !p.trim().is_empty()) {
        Some(raw) => {
            let path = PathBuf::from(raw);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."))
                .to_path_buf();
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(DEFAULT_JSON_FILE)
                .to_string();
            LogTarget::JsonFile { dir, file_name }
        }
        None => LogTarget::Stderr,
    }
}

/// `STREAM_CONSUMER_LOG_LEVEL`, then `RUST_LOG`, then `warn`.
fn env_filter_from(lookup: impl Fn(&str) -> Option<String>) -> EnvFilter {
    lookup(LOG_LEVEL_ENV)
        .or_else(|| lookup(EnvFilter::DEFAULT_ENV))
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize logging once per process.
///
/// Environment variables:
/// - `STREAM_CONSUMER_OBSERVABILITY_ENABLED`: enable/disable flag (default enabled).
/// - `STREAM_CONSUMER_LOG_LEVEL`: level or filter directives (`info`, `stream_consumer=debug`).
/// - `STREAM_CONSUMER_JSON_LOG_PATH`: write JSONL to this file instead of stderr.
/// - `RUST_LOG`: used when no level override is set.
///
/// Later calls are no-ops, as is a call after another subscriber was
/// installed.
pub fn init_observability() {
    INIT.get_or_init(|| {
        let lookup = |key: &str| std::env::var(key).ok();
        let env_filter = env_filter_from(lookup);
        match log_target_from(lookup) {
            LogTarget::Disabled => {}
            LogTarget::Stderr => {
                let console_layer = tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(false)
                    .with_writer(std::io::stderr);
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(console_layer)
                    .try_init();
            }
            LogTarget::JsonFile { dir, file_name } => {
                let _ = std::fs::create_dir_all(&dir);
                let writer = tracing_appender::rolling::never(dir, file_name);
                let json_layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(false)
                    .with_writer(writer);
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(json_layer)
                    .try_init();
            }
        }
    });
}
