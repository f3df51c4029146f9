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

//! [`DebugHost`] backed by a GDB process driven through GDB/MI.

use std::{
    cell::RefCell,
    ffi::OsStr,
    io::{BufRead, BufReader, Write},
    path::Path,
    process::{Child, ChildStdin, ChildStdout, Command, Stdio},
};

use sdb_common::GenLocation;
use tracing::{debug, trace, warn};

use super::{
    mi::{parse_record, quote, MiRecord, MiValue},
    BreakpointId, DebugHost, FrameAdapter, HostError, StopEvent,
};

/// Outcome of one MI command.
#[derive(Debug)]
struct MiResponse {
    results: MiValue,
    console: String,
    stop: Option<StopEvent>,
}

struct MiSession {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    next_token: u32,
}

impl MiSession {
    fn read_record(&mut self) -> Result<MiRecord, HostError> {
        loop {
            let mut line = String::new();
            if self.stdout.read_line(&mut line)? == 0 {
                return Err(HostError::Disconnected);
            }
            if line.trim().is_empty() {
                continue;
            }
            match parse_record(&line) {
                Ok(record) => return Ok(record),
                // The inferior shares our stdout unless told otherwise.
                Err(err) => trace!(%err, "Skipping non-MI output"),
            }
        }
    }

    fn wait_for_prompt(&mut self) -> Result<(), HostError> {
        while self.read_record()? != MiRecord::Prompt {}
        Ok(())
    }

    fn execute(&mut self, command: &str) -> Result<MiResponse, HostError> {
        self.next_token += 1;
        let token = self.next_token;
        debug!(token, command, "Sending MI command");
        writeln!(self.stdin, "{token}{command}")?;
        self.stdin.flush()?;

        let mut console = String::new();
        let mut stop = None;
        let (class, results) = loop {
            match self.read_record()? {
                MiRecord::Result { token: Some(t), class, results } if t == token => {
                    break (class, results)
                }
                MiRecord::Stream { kind: '~', text } => console.push_str(&text),
                MiRecord::Async { kind: '*', class, results } if class == "stopped" => {
                    stop = Some(stop_event(&results));
                }
                other => trace!(?other, "Ignoring MI record"),
            }
        };

        match class.as_str() {
            "error" => {
                let msg = results
                    .get("msg")
                    .and_then(MiValue::as_str)
                    .unwrap_or("unknown debugger error")
                    .to_string();
                return Err(HostError::Command(msg));
            }
            "exit" => return Err(HostError::Disconnected),
            "running" => {
                while stop.is_none() {
                    match self.read_record()? {
                        MiRecord::Async { kind: '*', class, results } if class == "stopped" => {
                            stop = Some(stop_event(&results));
                        }
                        MiRecord::Stream { kind: '~', text } => console.push_str(&text),
                        other => trace!(?other, "Ignoring MI record while running"),
                    }
                }
            }
            _ => {}
        }

        Ok(MiResponse { results, console, stop })
    }
}

fn frame_location(frame: &MiValue) -> Option<GenLocation> {
    let file = frame.get("fullname").or_else(|| frame.get("file")).and_then(MiValue::as_str)?;
    let line = frame.get("line").and_then(MiValue::as_str)?.parse().ok()?;
    Some(GenLocation::new(file, line))
}

fn stop_event(results: &MiValue) -> StopEvent {
    let reason = results.get("reason").and_then(MiValue::as_str).unwrap_or_default();
    if reason.starts_with("exited") {
        // GDB reports exit codes in octal.
        let code = results
            .get("exit-code")
            .and_then(MiValue::as_str)
            .and_then(|c| i32::from_str_radix(c, 8).ok())
            .unwrap_or(0);
        return StopEvent::Exited { code };
    }
    StopEvent::Stopped {
        location: results.get("frame").and_then(frame_location),
        breakpoint: results
            .get("bkptno")
            .and_then(MiValue::as_str)
            .and_then(|n| n.parse().ok())
            .map(BreakpointId),
    }
}

/// Host debugger implemented by a GDB subprocess speaking GDB/MI.
pub struct GdbMiHost {
    session: RefCell<MiSession>,
}

impl GdbMiHost {
    /// Spawns `gdb` on `program` with its command-line `args`.
    pub fn start(
        gdb: impl AsRef<OsStr>,
        program: &Path,
        args: impl IntoIterator<Item = impl AsRef<OsStr>>,
    ) -> Result<Self, HostError> {
        let mut child = Command::new(gdb)
            .args(["--interpreter=mi2", "--quiet", "--nx", "--args"])
            .arg(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;

        let stdin = child.stdin.take().ok_or(HostError::Disconnected)?;
        let stdout = child.stdout.take().ok_or(HostError::Disconnected)?;

        let mut session = MiSession { child, stdin, stdout: BufReader::new(stdout), next_token: 0 };
        session.wait_for_prompt()?;
        session.execute("-gdb-set confirm off")?;

        debug!(program = %program.display(), "GDB/MI session started");
        Ok(Self { session: RefCell::new(session) })
    }

    fn execute(&self, command: &str) -> Result<MiResponse, HostError> {
        self.session.borrow_mut().execute(command)
    }

    fn run_to_stop(&self, command: &str) -> Result<StopEvent, HostError> {
        self.execute(command)?
            .stop
            .ok_or_else(|| HostError::Protocol(format!("{command} did not stop the inferior")))
    }
}

impl FrameAdapter for GdbMiHost {
    fn location(&self) -> Result<Option<GenLocation>, HostError> {
        match self.execute("-stack-info-frame") {
            Ok(response) => Ok(response.results.get("frame").and_then(frame_location)),
            // "No registers.", "No stack.": nothing is paused.
            Err(HostError::Command(msg)) => {
                debug!(%msg, "No selected frame");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn read_var(&self, name: &str) -> Result<String, HostError> {
        // Ada names are case-insensitive but GDB/MI lookups are not.
        let response =
            self.execute(&format!("-data-evaluate-expression {}", quote(&name.to_lowercase())))?;
        response
            .results
            .get("value")
            .and_then(MiValue::as_str)
            .map(str::to_string)
            .ok_or_else(|| HostError::Protocol(format!("no value for {name}")))
    }
}

impl DebugHost for GdbMiHost {
    fn insert_breakpoint(
        &mut self,
        loc: &GenLocation,
        internal: bool,
    ) -> Result<BreakpointId, HostError> {
        let response = self.execute(&format!("-break-insert {}", quote(&loc.to_string())))?;
        let number = response
            .results
            .get("bkpt")
            .and_then(|bkpt| bkpt.get("number"))
            .and_then(MiValue::as_str)
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| HostError::Protocol("breakpoint without number".to_string()))?;
        debug!(number, %loc, internal, "Breakpoint inserted");
        Ok(BreakpointId(number))
    }

    fn set_condition(&mut self, id: BreakpointId, condition: &str) -> Result<(), HostError> {
        self.execute(&format!("-break-condition {id} {condition}")).map(|_| ())
    }

    fn delete_breakpoint(&mut self, id: BreakpointId) -> Result<(), HostError> {
        self.execute(&format!("-break-delete {id}")).map(|_| ())
    }

    fn resume(&mut self) -> Result<StopEvent, HostError> {
        self.run_to_stop("-exec-continue")
    }

    fn step_into(&mut self) -> Result<StopEvent, HostError> {
        self.run_to_stop("-exec-step")
    }

    fn execute_raw(&mut self, command: &str) -> Result<String, HostError> {
        let response = self.execute(&format!("-interpreter-exec console {}", quote(command)))?;
        Ok(response.console)
    }
}

impl Drop for GdbMiHost {
    fn drop(&mut self) {
        let session = self.session.get_mut();
        if writeln!(session.stdin, "-gdb-exit").and_then(|_| session.stdin.flush()).is_err() {
            warn!("Failed to ask GDB to exit");
        }
        if session.child.try_wait().ok().flatten().is_none() && session.child.kill().is_ok() {
            let _ = session.child.wait();
        }
    }
}
