//! Tracing subscriber initialization
//!
//! ```rust,ignore
//! use coursegen_ai::observability::{init_tracing, OutputFormat, TracingConfig};
//!
//! let _guard = init_tracing(TracingConfig::default().with_format(OutputFormat::Json))?;
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::error::LlmError;

pub const LOG_LEVEL_ENV: &str = "COURSEGEN_LOG_LEVEL";
pub const LOG_FORMAT_ENV: &str = "COURSEGEN_LOG_FORMAT";
pub const LOG_DIR_ENV: &str = "COURSEGEN_LOG_DIR";

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Single-line human readable text
    #[default]
    Compact,
    /// Multi-line human readable text
    Pretty,
    /// One JSON object per line
    Json,
}

impl FromStr for OutputFormat {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(LlmError::ConfigurationError(format!(
                "Invalid log format: {other}. Valid options: compact, pretty, json"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub level: Level,
    pub format: OutputFormat,
    /// Full `EnvFilter` directives; overrides `level` and `RUST_LOG`
    pub filter: Option<String>,
    /// Write daily-rotated files here instead of stdout
    pub log_dir: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: OutputFormat::Compact,
            filter: None,
            log_dir: None,
            file_prefix: "coursegen-ai.log".to_string(),
        }
    }
}

impl TracingConfig {
    pub fn debug() -> Self {
        Self {
            level: Level::DEBUG,
            ..Self::default()
        }
    }

    /// JSON lines to rotated files, warnings and above
    pub fn production(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            level: Level::WARN,
            format: OutputFormat::Json,
            log_dir: Some(log_dir.into()),
            ..Self::default()
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_filter(mut self, directives: impl Into<String>) -> Self {
        self.filter = Some(directives.into());
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Overlay `COURSEGEN_LOG_LEVEL`, `COURSEGEN_LOG_FORMAT` and `COURSEGEN_LOG_DIR`
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, LlmError> {
        let mut config = Self::default();
        if let Some(level) = lookup(LOG_LEVEL_ENV) {
            config.level = level.trim().parse().map_err(|_| {
                LlmError::ConfigurationError(format!(
                    "Invalid log level: {level}. Valid options: trace, debug, info, warn, error"
                ))
            })?;
        }
        if let Some(format) = lookup(LOG_FORMAT_ENV) {
            config.format = format.parse()?;
        }
        if let Some(dir) = lookup(LOG_DIR_ENV).filter(|d| !d.trim().is_empty()) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        Ok(config)
    }

    fn env_filter(&self) -> Result<EnvFilter, LlmError> {
        if let Some(directives) = &self.filter {
            return EnvFilter::try_new(directives).map_err(|e| {
                LlmError::ConfigurationError(format!("Invalid log filter '{directives}': {e}"))
            });
        }
        let level = self.level.as_str().to_ascii_lowercase();
        Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("coursegen_ai={level},reqwest=warn"))))
    }
}

/// Install the global subscriber.
///
/// Returns the file writer guard when `log_dir` is set; keep it alive for the
/// life of the process. An already installed subscriber is not an error.
pub fn init_tracing(config: TracingConfig) -> Result<Option<WorkerGuard>, LlmError> {
    let filter = config.env_filter()?;
    if tracing::dispatcher::has_been_set() {
        return Ok(None);
    }
    let (writer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stdout), None),
    };
    let ansi = config.log_dir.is_none();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true);
    let result = match config.format {
        OutputFormat::Compact => builder.compact().try_init(),
        OutputFormat::Pretty => builder.pretty().try_init(),
        OutputFormat::Json => builder
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .try_init(),
    };

    match result {
        Ok(()) => Ok(guard),
        // Lost a race with another initializer
        Err(_) if tracing::dispatcher::has_been_set() => Ok(None),
        Err(e) => Err(LlmError::ConfigurationError(format!(
            "Failed to initialize tracing: {e}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn env_overlay() {
        let vars = HashMap::from([
            (LOG_LEVEL_ENV, "debug"),
            (LOG_FORMAT_ENV, "JSON"),
            (LOG_DIR_ENV, "/var/log/coursegen"),
        ]);
        let config =
            TracingConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, OutputFormat::Json);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/coursegen")));
    }

    #[test]
    fn invalid_values_are_configuration_errors() {
        let bad_level = TracingConfig::from_lookup(|name| {
            (name == LOG_LEVEL_ENV).then(|| "loud".to_string())
        });
        assert!(matches!(bad_level, Err(LlmError::ConfigurationError(_))));
        assert!("yaml".parse::<OutputFormat>().is_err());

        let bad_filter = TracingConfig::default().with_filter("coursegen_ai=loud");
        assert!(bad_filter.env_filter().is_err());
    }

    #[test]
    fn production_preset_writes_json_files() {
        let config = TracingConfig::production("/tmp/logs");
        assert_eq!(config.level, Level::WARN);
        assert_eq!(config.format, OutputFormat::Json);
        assert!(config.env_filter().is_ok());
    }
}
