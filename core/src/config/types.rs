use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Batch names activated in the same scheduling turn into one fetch.
    #[serde(default)]
    pub combine: bool,

    /// Upper bound of names per combined fetch.
    #[serde(default = "default_combo_max_names")]
    pub combo_max_names: usize,

    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,

    /// Default for `UseOptions::sync` when callers do not set it.
    #[serde(default)]
    pub sync_by_default: bool,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_combo_max_names() -> usize {
    40
}

fn default_max_concurrent_fetches() -> usize {
    8
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            combine: false,
            combo_max_names: default_combo_max_names(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            sync_by_default: false,
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "modlink_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    #[serde(default)]
    pub directory: Option<String>,
}

impl LoggingConfig {
    /// Log file directory: `directory` when set, else `<tmp>/modlink`.
    pub fn log_directory(&self) -> PathBuf {
        match self.directory.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => PathBuf::from(d),
            _ => std::env::temp_dir().join("modlink"),
        }
    }

    /// One file per process.
    pub fn log_file_name(&self) -> String {
        format!("modlink.{}.log", std::process::id())
    }

    /// Neither sink is enabled although logging is.
    pub fn has_no_sink(&self) -> bool {
        self.enabled && !self.console && !self.file
    }
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}
