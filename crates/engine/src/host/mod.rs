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

//! Capability traits over the host debugger.
//!
//! Everything SDB needs from the debugger it runs in goes through two traits:
//!
//! - [`FrameAdapter`] - read-only access to the selected, paused frame
//! - [`DebugHost`] - breakpoints and execution control
//!
//! Two implementations are provided: [`GdbMiHost`], which drives a GDB process through
//! its machine interface, and [`FakeHost`], an in-memory host used to exercise the
//! engine without a live process.

use std::io;

use auto_impl::auto_impl;
use sdb_common::GenLocation;
use thiserror::Error;

mod fake;
mod gdb;
mod mi;

pub use fake::FakeHost;
pub use gdb::GdbMiHost;
pub use mi::{parse_record, MiParseError, MiRecord, MiValue};

/// Identifier of a breakpoint in the host debugger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub struct BreakpointId(pub u32);

/// Why the inferior gave control back to the debugger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopEvent {
    /// The inferior is paused.
    Stopped {
        /// Where it stopped, when known.
        location: Option<GenLocation>,
        /// The breakpoint that was hit, if any.
        breakpoint: Option<BreakpointId>,
    },
    /// The inferior terminated.
    Exited {
        /// Its exit code.
        code: i32,
    },
}

/// Errors reported by the host debugger.
#[derive(Debug, Error)]
pub enum HostError {
    /// The host rejected a command; the message is the host's own.
    #[error("{0}")]
    Command(String),
    /// The host produced output SDB does not understand.
    #[error("unexpected debugger output: {0}")]
    Protocol(String),
    /// The host process went away.
    #[error("the debugger process is gone")]
    Disconnected,
    /// Talking to the host process failed.
    #[error("debugger I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Read access to the selected frame of a paused inferior.
#[auto_impl(&, &mut, Box)]
pub trait FrameAdapter {
    /// Returns the generated-code location of the frame, or `None` if it has no line
    /// information (e.g. the inferior is not running).
    fn location(&self) -> Result<Option<GenLocation>, HostError>;

    /// Reads the value of the variable `name` visible in the frame, as display text.
    fn read_var(&self, name: &str) -> Result<String, HostError>;
}

/// Breakpoint and execution-control primitives of the host debugger.
#[auto_impl(&mut, Box)]
pub trait DebugHost: FrameAdapter {
    /// Creates a breakpoint. Internal breakpoints are hidden from the user.
    fn insert_breakpoint(
        &mut self,
        loc: &GenLocation,
        internal: bool,
    ) -> Result<BreakpointId, HostError>;

    /// Attaches a condition to an existing breakpoint.
    fn set_condition(&mut self, id: BreakpointId, condition: &str) -> Result<(), HostError>;

    /// Deletes a breakpoint.
    fn delete_breakpoint(&mut self, id: BreakpointId) -> Result<(), HostError>;

    /// Resumes the inferior until it stops again.
    fn resume(&mut self) -> Result<StopEvent, HostError>;

    /// Steps one source line, entering calls.
    fn step_into(&mut self) -> Result<StopEvent, HostError>;

    /// Runs a native host command and returns its output.
    fn execute_raw(&mut self, command: &str) -> Result<String, HostError>;
}
