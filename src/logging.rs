//! Structured logging for the seefood server.
//!
//! Logs go to stderr at the requested verbosity and, optionally, to a log file
//! at debug level. `RUST_LOG` overrides the default directive.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

/// Log verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only
    Quiet,
    /// Normal logging (info level)
    #[default]
    Normal,
    /// Verbose logging (debug level)
    Verbose,
    /// Very verbose logging (trace level)
    Trace,
}

impl Verbosity {
    /// Map a `-v` count from the command line to a verbosity.
    pub fn from_occurrences(count: u8, quiet: bool) -> Self {
        if quiet {
            return Verbosity::Quiet;
        }
        match count {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Trace,
        }
    }

    /// Get the tracing level filter for this verbosity.
    pub fn as_level_filter(&self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::ERROR,
            Verbosity::Normal => LevelFilter::INFO,
            Verbosity::Verbose => LevelFilter::DEBUG,
            Verbosity::Trace => LevelFilter::TRACE,
        }
    }
}

/// Configuration for the logging system.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Verbosity level for stderr output.
    pub verbosity: Verbosity,
    /// Optional path to log file.
    pub log_file: Option<String>,
}

/// Guard that must be kept alive for the duration of logging.
///
/// When this guard is dropped, pending file log entries are flushed.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize the logging system.
///
/// ```ignore
/// use seefood::logging::{init_logging, LogConfig, Verbosity};
///
/// let _guard = init_logging(&LogConfig {
///     verbosity: Verbosity::Verbose,
///     log_file: Some("/tmp/seefood.log".to_string()),
/// });
/// tracing::info!("Logging initialized");
/// ```
pub fn init_logging(config: &LogConfig) -> LogGuard {
    let env_filter = EnvFilter::builder()
        .with_default_directive(config.verbosity.as_level_filter().into())
        .from_env_lossy();

    let (file_layer, file_guard) = if let Some(ref log_file_path) = config.log_file {
        let path = Path::new(log_file_path);
        let parent_dir = path.parent().unwrap_or(Path::new("."));
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("seefood.log");

        let file_appender = tracing_appender::rolling::never(parent_dir, filename);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(true)
            .with_timer(fmt::time::uptime())
            .with_writer(non_blocking)
            .with_filter(LevelFilter::DEBUG);

        (Some(file_layer), Some(guard))
    } else {
        (None, None)
    };

    let stderr_layer = fmt::layer()
        .with_ansi(true)
        .with_target(false)
        .with_timer(fmt::time::uptime())
        .with_writer(std::io::stderr)
        .with_filter(config.verbosity.as_level_filter());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    LogGuard {
        _file_guard: file_guard,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_default() {
        assert_eq!(Verbosity::default(), Verbosity::Normal);
    }

    #[test]
    fn test_verbosity_from_occurrences() {
        assert_eq!(Verbosity::from_occurrences(0, false), Verbosity::Normal);
        assert_eq!(Verbosity::from_occurrences(1, false), Verbosity::Verbose);
        assert_eq!(Verbosity::from_occurrences(2, false), Verbosity::Trace);
        assert_eq!(Verbosity::from_occurrences(7, false), Verbosity::Trace);
        assert_eq!(Verbosity::from_occurrences(3, true), Verbosity::Quiet);
    }

    #[test]
    fn test_verbosity_as_level_filter() {
        assert_eq!(Verbosity::Quiet.as_level_filter(), LevelFilter::ERROR);
        assert_eq!(Verbosity::Normal.as_level_filter(), LevelFilter::INFO);
        assert_eq!(Verbosity::Verbose.as_level_filter(), LevelFilter::DEBUG);
        assert_eq!(Verbosity::Trace.as_level_filter(), LevelFilter::TRACE);
    }

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.verbosity, Verbosity::Normal);
        assert!(config.log_file.is_none());
    }
}
