//! Structured per-node logging for geofwd
//!
//! The forwarding crates only emit `tracing` events. This crate installs the
//! subscriber that turns them into output: JSON lines by default, a
//! human-readable console format for development, and optional rotating
//! file output.
//!
//! # Quick Start
//!
//! ```ignore
//! use geofwd_logging::{GeoSubscriberBuilder, LogConfig};
//!
//! // JSONL to console
//! let _guard = GeoSubscriberBuilder::new().try_init()?;
//!
//! // Pretty console output
//! let _guard = GeoSubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .try_init()?;
//! ```
//!
//! # Node Context
//!
//! Simulations run every node on one thread. Wrap each node's callbacks in a
//! [`NodeContextGuard`] so spans opened inside carry the node's id:
//!
//! ```ignore
//! use geofwd_logging::{node_span, NodeContextGuard};
//!
//! let _guard = NodeContextGuard::new(node_id);
//! let _span = node_span().entered();
//! tracing::debug!("Selected relays");
//! ```

pub mod config;
pub mod context;
pub mod layers;

pub use config::{
    ConsoleFormat, FileConfig, JsonlFields, LogConfig, RotationStrategy, DEFAULT_ENV_VAR,
};
pub use context::{NodeContextData, NodeContextGuard};
pub use layers::{node_span, NodeContextExtension, NodeContextLayer};

use std::fs::{self, File};

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Errors raised while installing the subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log directory or file could not be created
    #[error("Failed to create log file: {0}")]
    Io(#[from] std::io::Error),

    /// The rolling file appender could not be created
    #[error("Failed to create rolling appender: {0}")]
    Appender(#[from] InitError),

    /// A global subscriber is already installed
    #[error("Subscriber already initialized: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// Builder for configuring and initializing the logging subscriber
///
/// By default, console output uses JSONL format and the filter comes from
/// `GEOFWD_LOG`, falling back to [`LogConfig::filter`]. Use
/// [`LogConfig::development()`] for human-readable output.
pub struct GeoSubscriberBuilder {
    config: LogConfig,
}

impl GeoSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the base log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.level = level.into();
        self
    }

    /// Choose the console format, or turn the console off
    pub fn with_console(mut self, format: ConsoleFormat) -> Self {
        self.config.console = format;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// Install the subscriber globally
    ///
    /// Returns a guard that must be kept alive while file output is in use.
    /// Fails if a global subscriber is already set or the log file cannot be
    /// opened.
    pub fn try_init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let env_filter = EnvFilter::try_from_env(&self.config.env_var)
            .unwrap_or_else(|_| EnvFilter::new(self.config.filter()));

        let (file_writer, guard) = match &self.config.file {
            Some(file_config) => {
                let (writer, guard) = file_writer(file_config)?;
                (Some(writer), Some(guard))
            }
            None => (None, None),
        };

        let fields = self.config.fields;

        let pretty_console = match self.config.console {
            ConsoleFormat::Pretty { ansi } => Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(ansi)
                    .with_target(true),
            ),
            ConsoleFormat::Off | ConsoleFormat::Jsonl => None,
        };

        let jsonl_console = (self.config.console == ConsoleFormat::Jsonl).then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(fields.span_list)
                .flatten_event(fields.flatten)
                .with_file(fields.source_location)
                .with_line_number(fields.source_location)
        });

        let jsonl_file = file_writer.map(|writer| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(fields.span_list)
                .flatten_event(fields.flatten)
                .with_file(fields.source_location)
                .with_line_number(fields.source_location)
                .with_writer(writer)
        });

        Registry::default()
            .with(env_filter)
            .with(NodeContextLayer::new())
            .with(pretty_console)
            .with(jsonl_console)
            .with(jsonl_file)
            .try_init()?;

        Ok(guard)
    }
}

impl Default for GeoSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    let rotation = match config.rotation {
        RotationStrategy::Never => {
            fs::create_dir_all(&config.directory)?;
            return Ok(tracing_appender::non_blocking(File::create(config.single_file())?));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };

    let appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(&config.prefix)
        .build(&config.directory)?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize logging with default settings (JSONL to console)
pub fn init_default() -> Result<(), LoggingError> {
    GeoSubscriberBuilder::new().try_init().map(|_| ())
}

/// Initialize logging for development (verbose, human-readable console)
pub fn init_development() -> Result<(), LoggingError> {
    GeoSubscriberBuilder::new()
        .with_config(LogConfig::development())
        .try_init()
        .map(|_| ())
}

/// Initialize logging for tests (warnings only)
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_testing() {
    let _ = GeoSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .try_init();
}
