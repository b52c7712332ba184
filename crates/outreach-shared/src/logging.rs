//! # Logging
//!
//! Installs the process-wide tracing subscriber. Filtering follows `RUST_LOG`
//! (default `outreach=info`), output goes to stderr, and setting
//! `OUTREACH_LOG_FORMAT=json` switches to structured JSON lines.

use tracing_subscriber::EnvFilter;

/// Environment variable selecting the log output format
pub const LOG_FORMAT_ENV: &str = "OUTREACH_LOG_FORMAT";

const DEFAULT_DIRECTIVE: &str = "outreach=info";

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    /// Resolve the format from `OUTREACH_LOG_FORMAT`
    pub fn from_env() -> Self {
        match std::env::var(LOG_FORMAT_ENV) {
            Ok(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Initialize tracing with the format from the environment.
///
/// Safe to call more than once; later calls are no-ops and return `false`.
pub fn init_tracing() -> bool {
    init_tracing_with_format(LogFormat::from_env())
}

/// Initialize tracing with an explicit output format.
pub fn init_tracing_with_format(format: LogFormat) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr);

    let result = match format {
        LogFormat::Json => builder.json().with_current_span(false).try_init(),
        LogFormat::Pretty => builder.with_target(true).try_init(),
    };

    match result {
        Ok(()) => {
            tracing::debug!(?format, "Tracing initialized");
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_log_format_from_env() {
        std::env::set_var(LOG_FORMAT_ENV, "JSON");
        assert_eq!(LogFormat::from_env(), LogFormat::Json);

        std::env::set_var(LOG_FORMAT_ENV, "text");
        assert_eq!(LogFormat::from_env(), LogFormat::Pretty);

        std::env::remove_var(LOG_FORMAT_ENV);
        assert_eq!(LogFormat::from_env(), LogFormat::Pretty);
    }

    #[test]
    #[serial]
    fn test_init_is_idempotent() {
        let _first = init_tracing_with_format(LogFormat::Pretty);
        // A second global subscriber can never be installed
        assert!(!init_tracing_with_format(LogFormat::Json));
    }
}
