//! Diagnostics for the `duelgate` binary.
//!
//! Logs go to stderr so table and JSON output on stdout stay pipeable. The
//! subscriber starts at `warn` before any config is read; once `logging.level`
//! is known the filter is swapped in place. An explicit `RUST_LOG` pins the
//! filter for the whole run.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static FILTER: OnceLock<FilterHandle> = OnceLock::new();

fn rust_log_is_set() -> bool {
    std::env::var_os(EnvFilter::DEFAULT_ENV).is_some()
}

/// Installs the global subscriber with `level` as the initial filter.
pub fn init_tracing_with_level(level: &str) {
    let filter = if rust_log_is_set() {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    } else {
        EnvFilter::new(level)
    };

    let (filter, handle) = reload::Layer::new(filter);
    let _ = FILTER.set(handle);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

/// Switches to the configured level unless `RUST_LOG` is set.
pub fn apply_logging_level(level: &str) {
    if rust_log_is_set() {
        return;
    }
    if let Some(handle) = FILTER.get()
        && let Err(e) = handle.reload(EnvFilter::new(level))
    {
        tracing::warn!(error = %e, "Failed to apply logging.level");
    }
}
