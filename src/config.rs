//! Configuration for the watcher.
//!
//! Settings are layered, later sources winning:
//! - Default values
//! - TOML configuration file (`--config <FILE>`, or the nearest `.wf/settings.toml`)
//! - Environment variable overrides
//! - Command-line flags (applied by the binary)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `WF_` and use double underscores
//! to separate nested levels:
//! - `WF_EXEC__MODE=shell` sets `exec.mode`
//! - `WF_EXEC__SHELL=/bin/bash` sets `exec.shell`
//! - `WF_LOGGING__DEFAULT=info` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::template::ExecMode;

/// Directory searched for in the current directory and its ancestors.
pub const CONFIG_DIR: &str = ".wf";
pub const CONFIG_FILE: &str = "settings.toml";
pub const ENV_PREFIX: &str = "WF_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// How commands are run
    #[serde(default)]
    pub exec: ExecConfig,

    /// Log filtering
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ExecConfig {
    /// `exec` spawns the program directly, `shell` runs a quoted line through `shell`
    #[serde(default)]
    pub mode: ExecMode,

    /// Interpreter for shell mode, invoked as `<shell> -c <line>`
    #[serde(default = "default_shell")]
    pub shell: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level for every target
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `wf::exec = "debug"`
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

fn default_version() -> u32 {
    1
}
fn default_shell() -> PathBuf {
    PathBuf::from("/bin/sh")
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            exec: ExecConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            mode: ExecMode::default(),
            shell: default_shell(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    /// Filter directive string in `EnvFilter` syntax.
    pub fn filter_directives(&self) -> String {
        let mut filter = self.default.clone();
        for (module, level) in &self.modules {
            filter.push_str(&format!(",{module}={level}"));
        }
        filter
    }
}

impl Settings {
    /// Load configuration from all sources.
    ///
    /// `explicit` is the `--config` path and must exist; without it the
    /// nearest `.wf/settings.toml` is used if there is one.
    pub fn load(explicit: Option<&Path>) -> Result<Self, Box<figment::Error>> {
        let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));

        // An explicit file must exist and is not searched for in parent directories.
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(Box::new(figment::Error::from(format!(
                    "configuration file {} not found",
                    path.display()
                ))));
            }
            figment = figment.merge(Toml::file_exact(path));
        } else if let Some(path) = Self::find_workspace_config() {
            figment = figment.merge(Toml::file_exact(path));
        }

        figment
            // Double underscore separates nesting, single underscore stays in field names
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Load configuration from a specific file, ignoring the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .extract()
            .map_err(Box::new)
    }

    /// Find `.wf/settings.toml` from the current directory up to the root.
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        for ancestor in current.ancestors() {
            let candidate = ancestor.join(CONFIG_DIR).join(CONFIG_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        None
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }
}
