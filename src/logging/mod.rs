//! Structured logging configuration for confbind

use anyhow::{anyhow, Context};
use std::str::FromStr;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{
    fmt::{self, time::UtcTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logging configuration for confbind
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: LogLevel,
    /// Log format (json, pretty, compact)
    pub format: LogFormat,
    /// Output destination (stderr, file, both)
    pub output: LogOutput,
    /// File path for file output
    pub file_path: Option<String>,
    /// Include source file and line numbers
    pub include_source: bool,
    pub include_thread_names: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Log output formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable, multi-line
    Pretty,
    Compact,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogOutput {
    /// Standard error, leaving stdout to rendered documents
    Stderr,
    File,
    Both,
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stderr" | "console" => Ok(LogOutput::Stderr),
            "file" => Ok(LogOutput::File),
            "both" => Ok(LogOutput::Both),
            _ => Err(format!("Invalid log output: {}", s)),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            format: LogFormat::Compact,
            output: LogOutput::Stderr,
            file_path: None,
            include_source: false,
            include_thread_names: false,
        }
    }
}

impl LogConfig {
    /// Verbose configuration for local debugging
    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            format: LogFormat::Pretty,
            include_source: true,
            include_thread_names: true,
            ..Self::default()
        }
    }

    /// Load configuration from `CONFBIND_LOG_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    ///
    /// Unparseable values are ignored and leave the default in place.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(level) = lookup("CONFBIND_LOG_LEVEL") {
            if let Ok(parsed_level) = LogLevel::from_str(&level) {
                config.level = parsed_level;
            }
        }

        if let Some(format) = lookup("CONFBIND_LOG_FORMAT") {
            if let Ok(parsed_format) = LogFormat::from_str(&format) {
                config.format = parsed_format;
            }
        }

        if let Some(output) = lookup("CONFBIND_LOG_OUTPUT") {
            if let Ok(parsed_output) = LogOutput::from_str(&output) {
                config.output = parsed_output;
            }
        }

        if let Some(file_path) = lookup("CONFBIND_LOG_FILE") {
            config.file_path = Some(file_path);
        }

        if let Some(include_source) = lookup("CONFBIND_LOG_SOURCE") {
            config.include_source = include_source.to_lowercase() == "true";
        }

        config
    }

    /// Default filter directive for this configuration
    pub fn filter_directive(&self) -> String {
        format!("confbind={}", self.level.as_str())
    }
}

/// Install the global tracing subscriber. `RUST_LOG` overrides the level.
pub fn init_logging(config: &LogConfig) -> crate::Result<()> {
    let filter = create_filter(config);

    let layers: Vec<BoxedLayer> = match (config.output, config.file_path.as_deref()) {
        (LogOutput::Stderr, _) => vec![create_stderr_layer(config)],
        (LogOutput::File, Some(path)) => vec![create_file_layer(config, path)?],
        (LogOutput::Both, Some(path)) => {
            vec![create_stderr_layer(config), create_file_layer(config, path)?]
        }
        (LogOutput::File | LogOutput::Both, None) => {
            return Err(anyhow!("CONFBIND_LOG_FILE is required for file output"));
        }
    };

    tracing_subscriber::registry()
        .with(layers.with_filter(filter))
        .try_init()
        .context("Global tracing subscriber already installed")?;

    info!(level = config.level.as_str(), output = ?config.output, "Logging initialized");
    Ok(())
}

fn create_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.filter_directive()))
}

fn create_stderr_layer(config: &LogConfig) -> BoxedLayer {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(UtcTime::rfc_3339())
        .with_thread_names(config.include_thread_names)
        .with_file(config.include_source)
        .with_line_number(config.include_source);

    match config.format {
        LogFormat::Pretty => Box::new(layer.pretty()),
        LogFormat::Compact => Box::new(layer.compact()),
        LogFormat::Json => Box::new(layer.json()),
    }
}

fn create_file_layer(config: &LogConfig, file_path: &str) -> crate::Result<BoxedLayer> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(file_path)
        .with_context(|| format!("Failed to open log file {file_path}"))?;

    let layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_timer(UtcTime::rfc_3339())
        .with_thread_names(config.include_thread_names)
        .with_file(config.include_source)
        .with_line_number(config.include_source);

    Ok(match config.format {
        LogFormat::Pretty => Box::new(layer.pretty()),
        LogFormat::Compact => Box::new(layer.compact()),
        LogFormat::Json => Box::new(layer.json()),
    })
}

/// Initialize logging for testing environments
#[cfg(test)]
pub fn init_test_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let config = LogConfig {
            level: LogLevel::Debug,
            include_source: true,
            ..LogConfig::default()
        };

        if let Err(e) = init_logging(&config) {
            eprintln!("Failed to initialize test logging: {}", e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_log_level_parsing() {
        assert_eq!(LogLevel::from_str("info").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("DEBUG").unwrap(), LogLevel::Debug);
        assert!(LogLevel::from_str("invalid").is_err());
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(LogFormat::from_str("json").unwrap(), LogFormat::Json);
        assert_eq!(LogFormat::from_str("PRETTY").unwrap(), LogFormat::Pretty);
        assert!(LogFormat::from_str("invalid").is_err());
    }

    #[test]
    fn test_from_lookup_reads_confbind_variables() {
        let vars: HashMap<&str, &str> = [
            ("CONFBIND_LOG_LEVEL", "trace"),
            ("CONFBIND_LOG_FORMAT", "json"),
            ("CONFBIND_LOG_OUTPUT", "both"),
            ("CONFBIND_LOG_FILE", "/tmp/confbind.log"),
            ("CONFBIND_LOG_SOURCE", "TRUE"),
        ]
        .into_iter()
        .collect();

        let config = LogConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.level, LogLevel::Trace);
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.output, LogOutput::Both);
        assert_eq!(config.file_path.as_deref(), Some("/tmp/confbind.log"));
        assert!(config.include_source);
        assert_eq!(config.filter_directive(), "confbind=trace");
    }

    #[test]
    fn test_from_lookup_ignores_invalid_values() {
        let config = LogConfig::from_lookup(|key| match key {
            "CONFBIND_LOG_LEVEL" => Some("loud".to_string()),
            "CONFBIND_LOG_OUTPUT" => Some("printer".to_string()),
            _ => None,
        });
        assert_eq!(config.level, LogLevel::Warn);
        assert_eq!(config.output, LogOutput::Stderr);
    }

    #[test]
    fn test_development_preset() {
        let config = LogConfig::development();
        assert_eq!(config.level, LogLevel::Debug);
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.include_source);
    }

    #[test]
    fn test_file_output_requires_path() {
        let config = LogConfig {
            output: LogOutput::File,
            ..LogConfig::default()
        };
        assert!(init_logging(&config).is_err());
    }

    #[test]
    fn test_test_logging_is_idempotent() {
        init_test_logging();
        init_test_logging();
        tracing::debug!("still logging");
    }
}
