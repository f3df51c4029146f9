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

//! SDB - Specification Debugger
//!
//! Debugs programs produced by a parser generator in terms of the specification they
//! were generated from.

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use eyre::{Result, WrapErr};
use sdb_common::DebugInfo;
use sdb_engine::{GdbMiHost, SdbConfig, Session};

mod editor;
mod repl;

/// Command-line interface for SDB
#[derive(Debug, Parser)]
#[command(name = "sdb")]
#[command(about = "Specification Debugger - debug generated code in terms of its specification")]
#[command(version)]
pub struct Cli {
    /// Debug info of the generated program (JSON)
    #[arg(long, env = "SDB_DEBUG_INFO")]
    pub debug_info: PathBuf,

    /// Configuration file (default: ~/.sdb.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// GDB executable (overrides the configuration)
    #[arg(long, env = "SDB_GDB")]
    pub gdb: Option<PathBuf>,

    /// Program to debug
    pub program: PathBuf,

    /// Arguments passed to the program
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let mut config = SdbConfig::load(cli.config.as_deref())?;
    if let Some(gdb) = &cli.gdb {
        config.gdb_path = gdb.clone();
    }
    sdb_common::logging::init_logging("sdb", config.file_logging)?;

    let info = DebugInfo::from_file(&cli.debug_info)?;
    tracing::info!(
        generated_file = %info.filename.display(),
        properties = info.properties.len(),
        "Debug info loaded"
    );

    let host = GdbMiHost::start(&config.gdb_path, &cli.program, &cli.args)
        .wrap_err_with(|| format!("failed to start {}", config.gdb_path.display()))?;
    tracing::info!(program = %cli.program.display(), "Debugger started");

    let mut session = Session::new(Arc::new(info), config, Box::new(host));
    let mut editor = editor::LineEditor::new(session.commands().clone())?;
    repl::run(&mut session, &mut editor)?;

    tracing::info!("Shutting down SDB...");
    Ok(())
}
