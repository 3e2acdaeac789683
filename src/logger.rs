// Logging setup - tracing subscriber driven by the [logging] config section

use crate::config::LoggingConfig;
use crate::error::{DashboardError, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where log lines end up once the subscriber is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSink {
    Off,
    Stderr,
    File,
}

/// Pick the sink. The terminal UI owns the screen, so it only ever logs to a file.
pub fn resolve_sink(config: &LoggingConfig, terminal_ui: bool) -> LogSink {
    if config.output == "off" {
        LogSink::Off
    } else if !config.file_path.is_empty() {
        LogSink::File
    } else if terminal_ui {
        LogSink::Off
    } else {
        LogSink::Stderr
    }
}

/// Initialize logging system
pub fn init_logger(level: &str, json_output: bool, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match (log_file, json_output) {
        (Some(path), json) => {
            let file = Mutex::new(OpenOptions::new().create(true).append(true).open(path)?);
            if json {
                registry.with(fmt::layer().json().with_writer(file)).try_init()
            } else {
                registry
                    .with(fmt::layer().with_ansi(false).with_writer(file))
                    .try_init()
            }
        }
        (None, true) => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        (None, false) => registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
    };

    installed.map_err(|e| DashboardError::Config(format!("logger already installed: {}", e)))
}

/// Initialize logger from config
pub fn init_from_config(config: &LoggingConfig, terminal_ui: bool) -> Result<LogSink> {
    let sink = resolve_sink(config, terminal_ui);
    let json = config.output == "json";

    match sink {
        LogSink::Off => {}
        LogSink::Stderr => init_logger(&config.level, json, None)?,
        LogSink::File => init_logger(&config.level, json, Some(Path::new(&config.file_path)))?,
    }

    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logging(output: &str, file_path: &str) -> LoggingConfig {
        LoggingConfig {
            level: "debug".to_string(),
            output: output.to_string(),
            file_path: file_path.to_string(),
        }
    }

    #[test]
    fn test_terminal_ui_never_logs_to_stderr() {
        assert_eq!(resolve_sink(&logging("pretty", ""), true), LogSink::Off);
        assert_eq!(resolve_sink(&logging("pretty", ""), false), LogSink::Stderr);
        assert_eq!(resolve_sink(&logging("json", "ui.log"), true), LogSink::File);
    }

    #[test]
    fn test_off_wins_over_file() {
        assert_eq!(resolve_sink(&logging("off", "ui.log"), false), LogSink::Off);
    }
}
