//! Tracing setup shared by the server and the CLI.
//!
//! Events are written to stdout in compact form and appended to [`Config::log_file`] through a
//! non-blocking writer. Filtering follows [`Config::log_filter`]. Call [`init_tracing`] after
//! [`crate::config::init_config`].
use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::{Config, get_config};

const FALLBACK_FILTER: &str = "info";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber using the loaded configuration.
pub fn init_tracing() {
    init_tracing_with(get_config());
}

fn init_tracing_with(config: &Config) {
    let (env_filter, rejected) = build_filter(&config.log_filter);
    let stdout_layer = fmt::layer().with_target(false).compact();
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    let file_error = match open_log_writer(&config.log_file) {
        Ok(writer) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact();
            registry.with(file_layer).init();
            None
        }
        Err(error) => {
            registry.init();
            Some(error)
        }
    };

    // Reported once a subscriber exists to receive them.
    if let Some(directives) = rejected {
        tracing::warn!(directives = %directives, "Invalid log filter; using {FALLBACK_FILTER}");
    }
    if let Some(error) = file_error {
        tracing::warn!(
            path = %config.log_file.display(),
            error = %error,
            "File logging disabled"
        );
    }
}

/// Parse filter directives, falling back to `info` and returning the rejected input.
fn build_filter(directives: &str) -> (EnvFilter, Option<String>) {
    match EnvFilter::try_new(directives) {
        Ok(filter) => (filter, None),
        Err(_) => (EnvFilter::new(FALLBACK_FILTER), Some(directives.to_string())),
    }
}

/// Open `path` for appending, creating parent directories as needed.
fn open_log_writer(path: &Path) -> io::Result<NonBlocking> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let (writer, guard) = tracing_appender::non_blocking(file);
    let _ = LOG_GUARD.set(guard);
    Ok(writer)
}
