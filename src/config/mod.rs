pub mod error;

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use error::{ConfigError, Result};

/// Name of the configuration file searched for
pub const CONFIG_FILE: &str = "editor-sync.toml";

/// Settings read from editor-sync.toml
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Key of the shared document (required)
    pub document_key: String,

    /// Log level: error, warn, info, debug, trace
    pub log_level: Option<String>,

    /// File receiving every document event as a JSON line
    pub event_log: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            document_key: "untitled".to_string(),
            log_level: None,
            event_log: None,
        }
    }
}

impl Config {
    /// Load configuration from editor-sync.toml
    pub fn load(target_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = find_config_file(target_path.as_ref())?;
        let text = fs::read_to_string(&config_path).map_err(|source| ConfigError::ReadFailed {
            path: config_path.display().to_string(),
            source,
        })?;

        let mut config = Self::parse(&text)?;
        // Relative paths are relative to the file, not the working directory
        if let Some(dir) = config_path.parent() {
            config.resolve_relative_paths(dir);
        }

        Ok(config)
    }

    /// Parse, expand and validate configuration text
    pub fn parse(text: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(text)?;
        config.expand_env_vars();
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.document_key.is_empty() {
            return Err(ConfigError::MissingField("document_key".to_string()));
        }
        Ok(())
    }

    /// Expand ${VAR} references in string fields
    fn expand_env_vars(&mut self) {
        if let Some(expanded) = expand_env_var(&self.document_key) {
            self.document_key = expanded;
        }
        if let Some(level) = &self.log_level {
            if let Some(expanded) = expand_env_var(level) {
                self.log_level = Some(expanded);
            }
        }
    }

    fn resolve_relative_paths(&mut self, config_dir: &Path) {
        if let Some(event_log) = &self.event_log {
            if event_log.is_relative() {
                self.event_log = Some(config_dir.join(event_log));
            }
        }
    }
}

/// Nearest editor-sync.toml in `start_path` or one of its ancestors
fn find_config_file(start_path: &Path) -> Result<PathBuf> {
    let start_dir = if start_path.is_file() {
        start_path.parent().unwrap_or(Path::new("."))
    } else {
        start_path
    };

    start_dir
        .canonicalize()?
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| ConfigError::NotFound(start_path.display().to_string()))
}

/// Expand environment variable in the format ${VAR_NAME}
fn expand_env_var(value: &str) -> Option<String> {
    let var_name = value.strip_prefix("${")?.strip_suffix('}')?;
    env::var(var_name).ok()
}
