// SDB - Specification Debugger
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Configuration for SDB.
//!
//! The configuration lives in a TOML file, `~/.sdb.toml` unless another path is given.
//! Every key is optional:
//!
//! ```toml
//! command_prefix = "sdb-"
//! ellipsis_limit = 80
//! gdb_path = "/opt/gnat/bin/gdb"
//! file_logging = true
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use eyre::{eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::render::DEFAULT_ELLIPSIS_LIMIT;

/// Name of the configuration file in the home directory.
pub const CONFIG_FILE_NAME: &str = ".sdb.toml";

/// SDB settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SdbConfig {
    /// Prefix prepended to every command name (`state` becomes `<prefix>state`).
    ///
    /// With the default empty prefix, `break`, `next` and the other SDB commands shadow
    /// the host debugger's commands of the same name: `break gen.adb:12` is taken as a
    /// specification location and GDB's own `next` is unreachable. Set a prefix such as
    /// `sdb-` to keep both command sets available.
    pub command_prefix: String,
    /// Number of characters of a value shown before it gets truncated.
    pub ellipsis_limit: usize,
    /// GDB executable to drive.
    pub gdb_path: PathBuf,
    /// Also write logs to a rotated file.
    pub file_logging: bool,
}

impl Default for SdbConfig {
    fn default() -> Self {
        Self {
            command_prefix: String::new(),
            ellipsis_limit: DEFAULT_ELLIPSIS_LIMIT,
            gdb_path: PathBuf::from("gdb"),
            file_logging: false,
        }
    }
}

impl SdbConfig {
    /// Get the default configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| eyre!("Unable to determine home directory"))?;
        Ok(home.join(CONFIG_FILE_NAME))
    }

    /// Loads the configuration from `path`, or from the default location.
    ///
    /// An explicitly given file must exist. A missing default file yields the default
    /// configuration; nothing is written back.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let path = match Self::config_path() {
                    Ok(path) => path,
                    Err(err) => {
                        debug!("No home directory, using default configuration: {err}");
                        return Ok(Self::default());
                    }
                };
                if !path.exists() {
                    debug!("Config file not found at {}, using defaults", path.display());
                    return Ok(Self::default());
                }
                Self::load_from(&path)
            }
        }
    }

    /// Loads the configuration from `path`.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .wrap_err_with(|| format!("Failed to load config file: {}", path.display()))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parses a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).wrap_err("Failed to parse config file as TOML")?;
        if config.ellipsis_limit == 0 {
            return Err(eyre!("ellipsis_limit must be at least 1"));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SdbConfig::default();
        assert_eq!(config.command_prefix, "");
        assert_eq!(config.ellipsis_limit, 50);
        assert_eq!(config.gdb_path, PathBuf::from("gdb"));
        assert!(!config.file_logging);
        assert_eq!(SdbConfig::from_toml_str("").unwrap(), config);
    }

    #[test]
    fn test_partial_config() {
        let config = SdbConfig::from_toml_str("command_prefix = \"sdb-\"\n").unwrap();
        assert_eq!(config.command_prefix, "sdb-");
        assert_eq!(config.ellipsis_limit, 50);
    }

    #[test]
    fn test_invalid_config() {
        assert!(SdbConfig::from_toml_str("colour = true").is_err());
        assert!(SdbConfig::from_toml_str("ellipsis_limit = \"long\"").is_err());
        assert!(SdbConfig::from_toml_str("ellipsis_limit = 0").is_err());
    }

    #[test]
    fn test_serialization_is_loadable() {
        let config = SdbConfig { ellipsis_limit: 12, ..Default::default() };
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(SdbConfig::from_toml_str(&text).unwrap(), config);
    }
}
