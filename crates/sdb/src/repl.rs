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

//! The interactive command loop.

use std::io;

use eyre::Result;
use sdb_engine::{Interaction, Session};
use tracing::debug;

const PROMPT: &str = "(sdb) ";

/// Reads commands from `io` until end of input or `quit`.
///
/// SDB commands run in `session`; anything else is handed to the host debugger. An
/// interrupted read abandons the command being entered.
pub fn run(session: &mut Session, io: &mut dyn Interaction) -> Result<()> {
    loop {
        let line = match io.read_line(PROMPT) {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                writeln!(io.output(), "Quit")?;
                continue;
            }
            Err(err) => return Err(err.into()),
        };
        let line = line.trim();
        match line {
            "" => continue,
            "quit" | "q" | "exit" => break,
            _ => {}
        }

        match session.execute(line, io) {
            Ok(true) => continue,
            Ok(false) => {}
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {
                writeln!(io.output(), "Quit")?;
                continue;
            }
            Err(err) => return Err(err.into()),
        }

        debug!(command = line, "Forwarding to host debugger");
        match session.host_mut().execute_raw(line) {
            Ok(output) => write!(io.output(), "{output}")?,
            Err(err) => writeln!(io.output(), "{err}")?,
        }
    }
    Ok(())
}
