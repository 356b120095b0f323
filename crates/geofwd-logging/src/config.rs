//! Log output settings for forwarding runs
//!
//! A [`LogConfig`] is a base level plus per-crate directives, a console
//! format and an optional JSONL file. The directive string it produces is
//! overridden wholesale by the [`LogConfig::env_var`] environment variable.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Environment variable that overrides the configured filter
pub const DEFAULT_ENV_VAR: &str = "GEOFWD_LOG";

/// Scheduler timer tracing fires on every armed and expired neighbor; keep
/// it quiet unless asked for explicitly.
const QUIET_TIMERS: &str = "geofwd_core::scheduler=warn";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Level for everything without a more specific directive
    pub level: String,
    /// Extra `target=level` directives, applied after `level`
    pub directives: Vec<String>,
    /// Environment variable consulted before the configured filter
    pub env_var: String,
    pub console: ConsoleFormat,
    pub file: Option<FileConfig>,
    pub fields: JsonlFields,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directives: vec![QUIET_TIMERS.to_string()],
            env_var: DEFAULT_ENV_VAR.to_string(),
            console: ConsoleFormat::Jsonl,
            file: None,
            fields: JsonlFields::default(),
        }
    }
}

impl LogConfig {
    /// Human-readable console output with forwarding decisions at debug
    pub fn development() -> Self {
        Self {
            level: "info".to_string(),
            directives: vec![
                "geofwd_routing=debug".to_string(),
                "geofwd_wire=debug".to_string(),
                QUIET_TIMERS.to_string(),
            ],
            console: ConsoleFormat::Pretty { ansi: true },
            ..Self::default()
        }
    }

    /// Long multi-node runs: every decision to a JSONL file under `run_dir`,
    /// nothing on the console
    pub fn simulation_run(run_dir: PathBuf) -> Self {
        Self {
            level: "info".to_string(),
            directives: vec!["geofwd_routing=debug".to_string(), QUIET_TIMERS.to_string()],
            console: ConsoleFormat::Off,
            file: Some(FileConfig {
                directory: run_dir,
                rotation: RotationStrategy::Never,
                ..FileConfig::default()
            }),
            fields: JsonlFields {
                source_location: true,
                ..JsonlFields::default()
            },
            ..Self::default()
        }
    }

    /// Warnings only, plain console output
    pub fn testing() -> Self {
        Self {
            level: "warn".to_string(),
            directives: Vec::new(),
            console: ConsoleFormat::Pretty { ansi: false },
            ..Self::default()
        }
    }

    /// Add a `target=level` directive
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// The filter string handed to `EnvFilter` when the environment is silent
    pub fn filter(&self) -> String {
        std::iter::once(self.level.as_str())
            .chain(self.directives.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// How events are written to stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsoleFormat {
    Off,
    Pretty { ansi: bool },
    Jsonl,
}

impl ConsoleFormat {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, ConsoleFormat::Off)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileConfig {
    pub directory: PathBuf,
    /// File name prefix; unrotated logs are written to `<prefix>.jsonl`
    pub prefix: String,
    pub rotation: RotationStrategy,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./geofwd-logs"),
            prefix: "geofwd-sim".to_string(),
            rotation: RotationStrategy::Daily,
        }
    }
}

impl FileConfig {
    /// Path of the log file when rotation is off
    pub fn single_file(&self) -> PathBuf {
        self.directory.join(format!("{}.jsonl", self.prefix))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RotationStrategy {
    #[default]
    Daily,
    Hourly,
    /// One file per run, truncated on start
    Never,
}

/// Which fields a JSONL line carries besides the event itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonlFields {
    /// Event fields at the top level instead of under `fields`
    pub flatten: bool,
    /// The full span stack, which carries the node id of each span
    pub span_list: bool,
    pub source_location: bool,
}

impl Default for JsonlFields {
    fn default() -> Self {
        Self {
            flatten: true,
            span_list: true,
            source_location: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_quiets_timers() {
        let config = LogConfig::default();
        assert_eq!(config.filter(), "info,geofwd_core::scheduler=warn");
        assert_eq!(config.env_var, "GEOFWD_LOG");
        assert_eq!(config.console, ConsoleFormat::Jsonl);
    }

    #[test]
    fn test_with_directive_appends() {
        let config = LogConfig::testing().with_directive("geofwd_routing::table=trace");
        assert_eq!(config.filter(), "warn,geofwd_routing::table=trace");
    }

    #[test]
    fn test_simulation_run_writes_single_file() {
        let config = LogConfig::simulation_run(PathBuf::from("/tmp/run-7"));
        assert!(!config.console.is_enabled());
        let file = config.file.unwrap();
        assert_eq!(file.rotation, RotationStrategy::Never);
        assert_eq!(file.single_file(), PathBuf::from("/tmp/run-7/geofwd-sim.jsonl"));
        assert!(config.fields.source_location);
    }

    #[test]
    fn test_config_serialization() {
        let config = LogConfig::development();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: LogConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
