//! Logging bootstrap, available with the `logging` feature.
//!
//! The pipeline itself only emits `tracing` events: per-job `debug` events
//! while queues fill and drain, and per-phase `info` summaries. Failures are
//! returned as errors, never logged. Binaries driving the pipeline can
//! install a matching subscriber with these initializers; libraries should
//! bring their own.

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INSTALL: Once = Once::new();

/// How much of the pipeline's output to show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Suppress all events.
    Silent,
    /// Per-phase summaries: partition sizes, copied counts.
    #[default]
    Summary,
    /// Everything, including one event per enqueued and executed job.
    Verbose,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Silent => "off",
            LogLevel::Summary => "info",
            LogLevel::Verbose => "debug",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "silent" | "off" => Ok(LogLevel::Silent),
            "summary" | "info" => Ok(LogLevel::Summary),
            "verbose" | "debug" => Ok(LogLevel::Verbose),
            other => Err(format!("Invalid log level: {}", other)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.directive())
    }
}

/// Install a global subscriber at the given level.
///
/// Safe to call from multiple threads; only the first call per process takes
/// effect.
pub fn init_logging(level: LogLevel) {
    INSTALL.call_once(|| install(EnvFilter::new(level.directive())));
}

/// Install a global subscriber configured from `RUST_LOG`, falling back to
/// per-phase summaries when unset or invalid.
pub fn init_logging_from_env() {
    INSTALL.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(LogLevel::default().directive()));
        install(filter);
    });
}

fn install(filter: EnvFilter) {
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().without_time())
        .init();
}
