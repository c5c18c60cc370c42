//! Logging setup for the `vbatch` binary
//!
//! Console output goes to stderr, pretty by default or JSON with `--log-json`.
//! With `--log-dir` a daily-rolling JSON file is written as well.
//! `RUST_LOG` overrides the default filter.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const LOG_FILE_PREFIX: &str = "vbatch.log";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Emit console logs as JSON lines instead of pretty text
    pub json_console: bool,

    /// Directory for rolling JSON log files, if file logging is enabled
    pub log_dir: Option<PathBuf>,

    /// Log span creation and close (timings of executor and driver calls)
    pub enable_spans: bool,

    /// Default log level filter
    pub default_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json_console: false,
            log_dir: None,
            enable_spans: false,
            default_filter: "warn,vbatch=info,vbatch_values=info,vbatch_connection=info,vbatch_driver_postgres=info,vbatch_driver_sqlite=info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Verbose configuration: debug level for every vbatch crate, with spans
    pub fn verbose() -> Self {
        Self {
            enable_spans: true,
            default_filter: "info,vbatch=debug,vbatch_values=debug,vbatch_connection=debug,vbatch_drivers=debug,vbatch_driver_postgres=debug,vbatch_driver_sqlite=debug".to_string(),
            ..Self::default()
        }
    }
}

/// Default directory for log files
pub fn log_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vbatch")
        .join("logs")
}

/// Initialize the global subscriber.
///
/// The returned guard flushes the file writer and must be held until exit.
pub fn init(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    // NEW fires once per span; ENTER would repeat on every poll of an awaited future
    let span_events = if config.enable_spans {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let mut layers = Vec::new();

    let console_layer = if config.json_console {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_span_events(span_events.clone())
            .json()
            .with_current_span(true)
            .with_filter(env_filter.clone())
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_span_events(span_events.clone())
            .with_ansi(true)
            .pretty()
            .with_filter(env_filter.clone())
            .boxed()
    };
    layers.push(console_layer);

    let mut guard = None;
    if let Some(log_dir) = &config.log_dir {
        std::fs::create_dir_all(log_dir)?;

        let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
        let (non_blocking, worker_guard) = tracing_appender::non_blocking(file_appender);
        guard = Some(worker_guard);

        let json_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(span_events)
            .with_ansi(false)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(non_blocking)
            .with_filter(env_filter)
            .boxed();
        layers.push(json_layer);
    }

    tracing_subscriber::registry().with(layers).try_init()?;

    tracing::debug!(
        log_dir = ?config.log_dir,
        json_console = config.json_console,
        "logging initialized"
    );

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_quiet() {
        let config = LoggingConfig::default();
        assert!(!config.json_console);
        assert!(config.log_dir.is_none());
        assert!(config.default_filter.starts_with("warn"));
    }

    #[test]
    fn test_verbose_config() {
        let config = LoggingConfig::verbose();
        assert!(config.enable_spans);
        assert!(config.default_filter.contains("vbatch_values=debug"));
    }

    #[test]
    fn test_log_directory_is_namespaced() {
        assert!(log_directory().ends_with("vbatch/logs"));
    }
}
