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

//! Errors reported by SDB commands.
//!
//! The `Display` image of every variant is the exact message shown to the user; no
//! error here is fatal to the debugging session.

use std::io;

use itertools::Itertools;
use sdb_common::{SlocParseError, SpecLocation};
use thiserror::Error;

use crate::host::{BreakpointId, HostError};

/// Failure of a user command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// `state` flags contain unknown characters.
    #[error("Invalid flags: {}", .0.iter().join(", "))]
    InvalidFlags(Vec<char>),
    /// More positional arguments than the command accepts.
    #[error("Invalid extra arguments: {}", .0.join(" "))]
    ExtraArguments(Vec<String>),
    /// An argument was given to a command that takes none.
    #[error("This command takes no argument.")]
    NoArgumentExpected,
    /// `break` without argument.
    #[error("Breakpoint specification missing")]
    MissingBreakSpec,
    /// `break` with a wrong number of arguments.
    #[error("Invalid number of arguments")]
    WrongArgumentCount,
    /// `break <spec> <x> <cond>` where `<x>` is not `if`.
    #[error("Invalid arguments (second arg should be \"if\")")]
    ExpectedIf,
    /// The specification location could not be parsed.
    #[error("Invalid source location: {0}")]
    InvalidSloc(#[from] SlocParseError),
    /// No property has the requested qualified name.
    #[error("No such property: {0}")]
    NoSuchProperty(String),
    /// The property has no executable body.
    #[error("Cannot break on {0}: it has no code")]
    NoCode(String),
    /// No expression maps to the requested specification location.
    #[error("No match for {0}")]
    NoMatch(SpecLocation),
    /// The disambiguation answer is not a number.
    #[error("Invalid index choice: {0}")]
    InvalidChoice(String),
    /// The disambiguation answer is not one of the listed indexes.
    #[error("Choice must be in range 1-{0}")]
    ChoiceOutOfRange(usize),
    /// End of input during disambiguation.
    #[error("Aborting: no breakpoint created")]
    Aborted,
    /// The selected frame is outside every known property.
    #[error("Selected frame is not in a property.")]
    NotInProperty,
    /// `out` while no expression is being evaluated.
    #[error("Not evaluating any expression")]
    NotEvaluating,
    /// `si` could not reach a property.
    #[error("Could not step inside a property")]
    StepInsideFailed,
    /// The breakpoint was created but the host rejected its condition.
    #[error("{source}")]
    ConditionRejected {
        /// The breakpoint, left in place without condition.
        id: BreakpointId,
        /// The host's verbatim complaint.
        source: HostError,
    },
    /// Any other host failure.
    #[error(transparent)]
    Host(#[from] HostError),
    /// Reading from or writing to the user failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
