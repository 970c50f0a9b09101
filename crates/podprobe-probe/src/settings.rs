//! Local settings file
//!
//! Settings live in `~/.podprobe/config.toml`. Every field is optional and
//! falls back to the defaults below.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ConfigSource;
use crate::error::SettingsError;
use crate::selector::SelectionPolicy;

const DEFAULT_CONFIG_NAMESPACE: &str = "default";
const DEFAULT_CONFIG_MAP: &str = "package-checker-config";
const DEFAULT_CONFIG_KEY: &str = "config";
const DEFAULT_ENV_VAR: &str = "PRODUCTION_IP_MAPPING";
const DEFAULT_ENV_COMMAND: &str = "env";
const DEFAULT_COMMANDS: &[&str] = &["ls -l /usr/local/tomcat/webapps/", "cat ./LS_INFO"];
const DEFAULT_ARTIFACT_SUFFIXES: &[&str] = &[".war"];
const DEFAULT_BENIGN_EXIT_CODES: &[i32] = &[1, 2];

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeSettings {
    /// Namespace holding the target ConfigMap
    pub config_namespace: String,
    pub config_map: String,
    /// Key within the ConfigMap whose value is the JSON target config
    pub config_key: String,

    /// Environment variable whose value identifies a pod
    pub env_var: String,
    /// Command that dumps the container environment
    pub env_command: String,

    /// Diagnostic commands, tried in order
    pub commands: Vec<String>,
    /// File suffixes recognised in listing output (case-insensitive)
    pub artifact_suffixes: Vec<String>,
    /// Exit codes meaning "this probe did not apply"
    pub benign_exit_codes: Vec<i32>,

    pub selection: SelectionPolicy,
    /// Container to exec into; the pod's first container when unset or absent
    pub container: Option<String>,
    /// A TTY merges stderr into stdout, so it stays off unless asked for
    pub tty: bool,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            config_namespace: DEFAULT_CONFIG_NAMESPACE.to_string(),
            config_map: DEFAULT_CONFIG_MAP.to_string(),
            config_key: DEFAULT_CONFIG_KEY.to_string(),
            env_var: DEFAULT_ENV_VAR.to_string(),
            env_command: DEFAULT_ENV_COMMAND.to_string(),
            commands: DEFAULT_COMMANDS.iter().map(|c| c.to_string()).collect(),
            artifact_suffixes: DEFAULT_ARTIFACT_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            benign_exit_codes: DEFAULT_BENIGN_EXIT_CODES.to_vec(),
            selection: SelectionPolicy::default(),
            container: None,
            tty: false,
        }
    }
}

impl ProbeSettings {
    /// Get the default settings file path
    pub fn default_path() -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        Some(home.join(".podprobe").join("config.toml"))
    }

    /// Load settings from `path`, or from the default path if it exists.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        match path {
            Some(path) => Self::read(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::read(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn read(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Where the target configuration is read from
    pub fn config_source(&self) -> ConfigSource {
        ConfigSource {
            namespace: self.config_namespace.clone(),
            name: self.config_map.clone(),
            key: self.config_key.clone(),
        }
    }
}
