//! Structured logging configuration.

use tracing_subscriber::EnvFilter;

/// Default filter directive when neither config nor `RUST_LOG` supplies one.
const DEFAULT_FILTER: &str = "info";

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parses a format name; anything other than `json` is pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive, e.g. `info,carebridge=debug`.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: DEFAULT_FILTER.to_string(),
        }
    }
}

impl LoggingConfig {
    /// Returns a copy with the filter raised to `debug` when verbose output was requested.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        if verbose {
            self.filter = "debug".to_string();
        }
        self
    }

    /// Builds the subscriber filter, falling back to the default directive if the
    /// configured one does not parse.
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|err| {
            tracing::warn!(filter = %self.filter, error = %err, "Invalid log filter, using default");
            EnvFilter::new(DEFAULT_FILTER)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Pretty);
    }

    #[test]
    fn test_verbose_raises_filter() {
        let config = LoggingConfig::default().with_verbose(true);
        assert_eq!(config.filter, "debug");

        let config = LoggingConfig::default().with_verbose(false);
        assert_eq!(config.filter, "info");
    }
}
