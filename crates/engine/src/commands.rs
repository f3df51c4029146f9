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

//! Parsing of SDB commands.
//!
//! Commands are validated completely before anything runs, so that a malformed command
//! never has side effects.

use std::{collections::BTreeSet, sync::Arc};

use sdb_common::DebugInfo;

use crate::{error::CommandError, resolver::BreakSpec};

/// A validated SDB command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Display the state of the running property.
    State {
        /// Truncate long values.
        with_ellipsis: bool,
        /// Show the generated variables holding values.
        with_locs: bool,
        /// Only show this binding.
        var_name: Option<String>,
    },
    /// Put a breakpoint on a property or a specification location.
    Break {
        /// Where to break.
        spec: BreakSpec,
        /// Condition to attach, in the host's expression language.
        condition: Option<String>,
    },
    /// Continue until another expression is reached.
    Next,
    /// Continue until the current expression is evaluated.
    Out,
    /// Step inside the property about to be called.
    StepInside,
    /// List the commands.
    Help,
}

/// Static description of a command.
#[derive(Debug, Clone, Copy)]
pub struct CommandInfo {
    /// Name, without prefix.
    pub name: &'static str,
    /// Argument synopsis.
    pub usage: &'static str,
    /// One-line description.
    pub summary: &'static str,
}

/// Every SDB command.
pub const COMMANDS: &[CommandInfo] = &[
    CommandInfo {
        name: "state",
        usage: "[/fs] [VARIABLE]",
        summary: "Display the state of the currently running property \
                  (f: no ellipsis, s: show generated variable names)",
    },
    CommandInfo {
        name: "break",
        usage: "PROPERTY|FILE:LINE [if CONDITION]",
        summary: "Put a breakpoint on a property or on a specification source location",
    },
    CommandInfo {
        name: "next",
        usage: "",
        summary: "Continue execution until reaching another expression",
    },
    CommandInfo {
        name: "out",
        usage: "",
        summary: "Continue execution until the end of the evaluation of the current \
                  sub-expression",
    },
    CommandInfo {
        name: "si",
        usage: "",
        summary: "Step inside the property about to be called, traversing dispatchers",
    },
    CommandInfo { name: "help", usage: "", summary: "List SDB commands" },
];

/// Splits `arg` on whitespace into at most `max` words, the last one holding the
/// untouched remainder.
fn split_args(arg: &str, max: usize) -> Vec<&str> {
    let mut words = vec![];
    let mut rest = arg.trim();
    while !rest.is_empty() {
        if words.len() + 1 == max {
            words.push(rest);
            break;
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        words.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    words
}

/// Recognizes SDB commands among the lines typed by the user.
#[derive(Debug, Clone)]
pub struct Commands {
    prefix: String,
    info: Arc<DebugInfo>,
}

impl Commands {
    /// Creates the command set, every name being prefixed with `prefix`.
    pub fn new(prefix: impl Into<String>, info: Arc<DebugInfo>) -> Self {
        Self { prefix: prefix.into(), info }
    }

    /// Returns the command name prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Parses `line`.
    ///
    /// Returns `None` when the line is not an SDB command, so that it can be handed to
    /// the host debugger.
    pub fn parse(&self, line: &str) -> Option<Result<Command, CommandError>> {
        let line = line.trim();
        let (name, arg) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let name = name.strip_prefix(self.prefix.as_str())?;

        let result = match name {
            "state" => parse_state(arg),
            "break" => parse_break(arg),
            "next" => no_argument(arg, Command::Next),
            "out" => no_argument(arg, Command::Out),
            "si" => no_argument(arg, Command::StepInside),
            "help" => no_argument(arg, Command::Help),
            _ => return None,
        };
        Some(result)
    }

    /// Completes a property name for `break`.
    ///
    /// Matching is a case-insensitive prefix match. Compiler-generated properties are
    /// only offered when `word` starts with `[`.
    pub fn complete_break(&self, word: &str) -> Vec<String> {
        let prefix = word.to_lowercase();
        let with_special = prefix.starts_with('[');
        self.info
            .properties
            .iter()
            .filter(|p| with_special || !p.is_special())
            .filter(|p| p.name.to_lowercase().starts_with(&prefix))
            .map(|p| p.name.clone())
            .collect()
    }

    /// Returns the help text.
    pub fn help(&self) -> String {
        let mut text = String::from("SDB commands:\n");
        for cmd in COMMANDS {
            let synopsis = if cmd.usage.is_empty() {
                format!("{}{}", self.prefix, cmd.name)
            } else {
                format!("{}{} {}", self.prefix, cmd.name, cmd.usage)
            };
            text.push_str(&format!("  {synopsis}\n      {}\n", cmd.summary));
        }
        text
    }
}

fn no_argument(arg: &str, command: Command) -> Result<Command, CommandError> {
    if arg.trim().is_empty() {
        Ok(command)
    } else {
        Err(CommandError::NoArgumentExpected)
    }
}

fn parse_state(arg: &str) -> Result<Command, CommandError> {
    let mut args = arg.split_whitespace().peekable();
    let mut flags = BTreeSet::new();

    if let Some(word) = args.next_if(|w| w.starts_with('/')) {
        flags.extend(word[1..].chars());
        let invalid: Vec<char> =
            flags.iter().copied().filter(|c| !matches!(c, 'f' | 's')).collect();
        if !invalid.is_empty() {
            return Err(CommandError::InvalidFlags(invalid));
        }
    }

    let var_name = args.next().map(str::to_string);
    let extra: Vec<String> = args.map(str::to_string).collect();
    if !extra.is_empty() {
        return Err(CommandError::ExtraArguments(extra));
    }

    Ok(Command::State {
        with_ellipsis: !flags.contains(&'f'),
        with_locs: flags.contains(&'s'),
        var_name,
    })
}

fn parse_break(arg: &str) -> Result<Command, CommandError> {
    let (spec, condition) = match split_args(arg, 3).as_slice() {
        [] => return Err(CommandError::MissingBreakSpec),
        [spec] => (*spec, None),
        [spec, "if", condition] => (*spec, Some(condition.to_string())),
        [_, _, _] => return Err(CommandError::ExpectedIf),
        _ => return Err(CommandError::WrongArgumentCount),
    };
    Ok(Command::Break { spec: spec.parse()?, condition })
}
