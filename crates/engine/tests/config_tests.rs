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

//! Loading the configuration file.

use std::fs;

use sdb_engine::SdbConfig;
use tempfile::TempDir;
use tracing::info;

#[test]
fn test_load_explicit_config() {
    sdb_common::logging::ensure_test_logging(None);
    info!("Running test");
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sdb.toml");
    fs::write(
        &path,
        "command_prefix = \"lkt-\"\nellipsis_limit = 20\ngdb_path = \"/usr/bin/gdb\"\n",
    )
    .unwrap();

    let config = SdbConfig::load(Some(path.as_path())).unwrap();
    assert_eq!(config.command_prefix, "lkt-");
    assert_eq!(config.ellipsis_limit, 20);
    assert_eq!(config.gdb_path.to_str(), Some("/usr/bin/gdb"));
    assert!(!config.file_logging);
}

#[test]
fn test_missing_explicit_config_is_an_error() {
    sdb_common::logging::ensure_test_logging(None);
    info!("Running test");
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nope.toml");
    let err = SdbConfig::load(Some(path.as_path())).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_unknown_key_is_rejected() {
    sdb_common::logging::ensure_test_logging(None);
    info!("Running test");
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sdb.toml");
    fs::write(&path, "prefix = \"x\"\n").unwrap();
    let err = SdbConfig::load_from(&path).unwrap_err();
    assert!(format!("{err:?}").contains("unknown field"));
}

#[test]
fn test_config_clone() {
    sdb_common::logging::ensure_test_logging(None);
    info!("Running test");
    let config = SdbConfig { file_logging: true, ..Default::default() };
    let cloned = config.clone();
    assert_eq!(config, cloned);
}
