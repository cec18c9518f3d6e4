//! # Logger
//!
//! Installs the global `tracing` subscriber from the `[logging]` configuration section:
//! a compact (or JSON) console layer, an optional non-blocking rolling file layer and an
//! env filter built from `level` + `filter` (with `RUST_LOG` taking precedence).
//!
//! ```rust,no_run
//! use topo_domain::config::LoggingConfig;
//! use topo_logger::Logger;
//!
//! let _logger = Logger::init("topo-classification", &LoggingConfig::default()).unwrap();
//! tracing::info!("ready");
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use std::fs;
use std::str::FromStr;
use topo_domain::config::{LogRotation, LoggingConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const LOG_FILE_SUFFIX: &str = "log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Handle to the installed logging system.
///
/// Holds the file writer's [`WorkerGuard`]; keep it alive until shutdown so buffered
/// lines are flushed.
#[must_use = "Dropping this handle stops the background log writer."]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
}

impl Logger {
    /// Installs the global subscriber. `name` prefixes rolling files (`name.2026-01-01.log`).
    ///
    /// # Errors
    /// [`LoggerError::InvalidConfiguration`] for a blank name, zero `max_files`, an unknown
    /// level or filter directive, or when no layer is enabled;
    /// [`LoggerError::Subscriber`] when a global subscriber is already installed.
    pub fn init(name: &str, config: &LoggingConfig) -> Result<Self, LoggerError> {
        validate(name, config)?;
        let filter = env_filter(config)?;

        let mut layers: Vec<BoxedLayer> = Vec::new();
        if config.console {
            let console = layer().with_ansi(true);
            layers.push(if config.json { console.json().boxed() } else { console.compact().boxed() });
        }

        let guard = match &config.directory {
            Some(directory) => {
                fs::create_dir_all(directory)
                    .context(format!("creating {}", directory.display()))?;

                let appender = RollingFileAppender::builder()
                    .rotation(rotation(config.rotation))
                    .filename_prefix(name)
                    .filename_suffix(LOG_FILE_SUFFIX)
                    .max_log_files(config.max_files)
                    .build(directory)?;
                let (writer, guard) = tracing_appender::non_blocking(appender);

                let file = layer().with_writer(writer).with_ansi(false);
                layers.push(if config.json { file.json().boxed() } else { file.boxed() });
                Some(guard)
            }
            None => None,
        };

        if layers.is_empty() {
            return Err(LoggerError::InvalidConfiguration {
                message: "no output enabled; set console = true or a log directory".into(),
                context: None,
            });
        }

        tracing_subscriber::registry().with(layers).with(filter).try_init()?;

        Ok(Self { guard })
    }

    #[must_use]
    pub const fn guard(&self) -> Option<&WorkerGuard> {
        self.guard.as_ref()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::info!("Logging system shutting down, flushing buffers...");
        }
    }
}

fn validate(name: &str, config: &LoggingConfig) -> Result<(), LoggerError> {
    if name.trim().is_empty() {
        return Err(LoggerError::InvalidConfiguration {
            message: "logger name cannot be empty".into(),
            context: None,
        });
    }
    if config.directory.is_some() && config.max_files == 0 {
        return Err(LoggerError::InvalidConfiguration {
            message: "max_files must be greater than zero".into(),
            context: None,
        });
    }
    Ok(())
}

fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggerError> {
    let level =
        LevelFilter::from_str(config.level.trim()).map_err(|e| LoggerError::InvalidConfiguration {
            message: format!("unknown level '{}': {e}", config.level).into(),
            context: None,
        })?;

    let builder = EnvFilter::builder().with_default_directive(level.into());
    match &config.filter {
        // RUST_LOG still wins when set.
        None => Ok(builder.from_env_lossy()),
        Some(directives) => {
            builder.parse(directives).map_err(|e| LoggerError::InvalidConfiguration {
                message: format!("invalid filter '{directives}': {e}").into(),
                context: None,
            })
        }
    }
}

const fn rotation(rotation: LogRotation) -> Rotation {
    match rotation {
        LogRotation::Minutely => Rotation::MINUTELY,
        LogRotation::Hourly => Rotation::HOURLY,
        LogRotation::Daily => Rotation::DAILY,
        LogRotation::Never => Rotation::NEVER,
    }
}
