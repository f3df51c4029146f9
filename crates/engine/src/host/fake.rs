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

//! In-memory host debugger.
//!
//! [`FakeHost`] simulates a paused inferior: a selected frame with a location and a set
//! of variables, a breakpoint table, and a scripted execution path. Resuming walks the
//! path until a location carrying a breakpoint is reached.

use std::collections::{BTreeMap, HashMap, VecDeque};

use sdb_common::{Breakpoint, GenLocation};
use tracing::debug;

use super::{BreakpointId, DebugHost, FrameAdapter, HostError, StopEvent};

/// In-memory [`DebugHost`] for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct FakeHost {
    location: Option<GenLocation>,
    /// Variables of the selected frame, keyed by lower-cased name.
    variables: HashMap<String, String>,
    breakpoints: BTreeMap<BreakpointId, Breakpoint>,
    next_id: u32,
    /// Locations the inferior will go through, in order, when resumed or stepped.
    path: VecDeque<GenLocation>,
    exit_code: i32,
}

impl FakeHost {
    /// Creates a host with no running inferior.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a host paused at `file:line`.
    pub fn paused_at(file: &str, line: usize) -> Self {
        Self { location: Some(GenLocation::new(file, line)), ..Self::default() }
    }

    /// Sets the value of a variable of the selected frame.
    pub fn set_variable(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.variables.insert(name.to_lowercase(), value.into());
        self
    }

    /// Appends locations to the execution path followed on resume/step.
    pub fn extend_path(&mut self, file: &str, lines: impl IntoIterator<Item = usize>) {
        self.path.extend(lines.into_iter().map(|line| GenLocation::new(file, line)));
    }

    /// Sets the exit code reported when the execution path is exhausted.
    pub fn set_exit_code(&mut self, code: i32) {
        self.exit_code = code;
    }

    /// Returns all live breakpoints, internal ones included.
    pub fn breakpoints(&self) -> impl Iterator<Item = (BreakpointId, &Breakpoint)> {
        self.breakpoints.iter().map(|(id, bp)| (*id, bp))
    }

    /// Returns the live user breakpoints.
    pub fn user_breakpoints(&self) -> Vec<&Breakpoint> {
        self.breakpoints.values().filter(|bp| !bp.internal).collect()
    }

    fn breakpoint_at(&self, loc: &GenLocation) -> Option<BreakpointId> {
        self.breakpoints.iter().find(|(_, bp)| &bp.loc == loc).map(|(id, _)| *id)
    }

    fn advance(&mut self) -> Option<GenLocation> {
        let next = self.path.pop_front();
        self.location = next.clone();
        next
    }

    fn exited(&mut self) -> StopEvent {
        self.location = None;
        StopEvent::Exited { code: self.exit_code }
    }
}

/// Checks that parentheses and quotes are balanced, like a real expression parser
/// would at the very least.
fn check_condition_syntax(condition: &str) -> Result<(), HostError> {
    let mut depth = 0i32;
    let mut in_string = false;
    for (i, c) in condition.char_indices() {
        match c {
            '"' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth -= 1;
                if depth < 0 {
                    return Err(HostError::Command(format!(
                        "A syntax error in expression, near `{}'.",
                        &condition[i..]
                    )));
                }
            }
            _ => {}
        }
    }
    if condition.trim().is_empty() || depth != 0 || in_string {
        return Err(HostError::Command("A syntax error in expression, near `'.".to_string()));
    }
    Ok(())
}

impl FrameAdapter for FakeHost {
    fn location(&self) -> Result<Option<GenLocation>, HostError> {
        Ok(self.location.clone())
    }

    fn read_var(&self, name: &str) -> Result<String, HostError> {
        if self.location.is_none() {
            return Err(HostError::Command("No frame selected.".to_string()));
        }
        self.variables
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| HostError::Command(format!("No symbol \"{name}\" in current context.")))
    }
}

impl DebugHost for FakeHost {
    fn insert_breakpoint(
        &mut self,
        loc: &GenLocation,
        internal: bool,
    ) -> Result<BreakpointId, HostError> {
        self.next_id += 1;
        let id = BreakpointId(self.next_id);
        let bp = if internal { Breakpoint::internal(loc.clone()) } else { Breakpoint::new(loc.clone()) };
        debug!(%id, %bp, "Fake breakpoint inserted");
        self.breakpoints.insert(id, bp);
        Ok(id)
    }

    fn set_condition(&mut self, id: BreakpointId, condition: &str) -> Result<(), HostError> {
        check_condition_syntax(condition)?;
        let bp = self
            .breakpoints
            .get_mut(&id)
            .ok_or_else(|| HostError::Command(format!("No breakpoint number {id}.")))?;
        bp.set_condition(condition);
        Ok(())
    }

    fn delete_breakpoint(&mut self, id: BreakpointId) -> Result<(), HostError> {
        self.breakpoints
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| HostError::Command(format!("No breakpoint number {id}.")))
    }

    fn resume(&mut self) -> Result<StopEvent, HostError> {
        if self.location.is_none() {
            return Err(HostError::Command("The program is not being run.".to_string()));
        }
        while let Some(loc) = self.advance() {
            if let Some(id) = self.breakpoint_at(&loc) {
                return Ok(StopEvent::Stopped { location: Some(loc), breakpoint: Some(id) });
            }
        }
        Ok(self.exited())
    }

    fn step_into(&mut self) -> Result<StopEvent, HostError> {
        if self.location.is_none() {
            return Err(HostError::Command("The program is not being run.".to_string()));
        }
        match self.advance() {
            Some(loc) => Ok(StopEvent::Stopped { location: Some(loc), breakpoint: None }),
            None => Ok(self.exited()),
        }
    }

    fn execute_raw(&mut self, command: &str) -> Result<String, HostError> {
        let name = command.split_whitespace().next().unwrap_or_default();
        Err(HostError::Command(format!("Undefined command: \"{name}\".  Try \"help\".")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_var_is_case_insensitive() {
        let mut host = FakeHost::paused_at("gen.adb", 10);
        host.set_variable("Var_1", "42");
        assert_eq!(host.read_var("var_1").unwrap(), "42");
        assert_eq!(host.read_var("VAR_1").unwrap(), "42");
        let err = host.read_var("Other").unwrap_err();
        assert_eq!(err.to_string(), "No symbol \"Other\" in current context.");
    }

    #[test]
    fn test_resume_stops_at_breakpoints() {
        let mut host = FakeHost::paused_at("gen.adb", 10);
        host.extend_path("gen.adb", [11, 12, 13, 14]);
        let id = host.insert_breakpoint(&GenLocation::new("gen.adb", 13), false).unwrap();

        let stop = host.resume().unwrap();
        assert_eq!(
            stop,
            StopEvent::Stopped { location: Some(GenLocation::new("gen.adb", 13)), breakpoint: Some(id) }
        );

        host.set_exit_code(3);
        assert_eq!(host.resume().unwrap(), StopEvent::Exited { code: 3 });
        assert_eq!(host.location().unwrap(), None);
        assert!(host.resume().is_err());
    }

    #[test]
    fn test_step_into_follows_path() {
        let mut host = FakeHost::paused_at("gen.adb", 10);
        host.extend_path("gen.adb", [20]);
        assert_eq!(
            host.step_into().unwrap(),
            StopEvent::Stopped { location: Some(GenLocation::new("gen.adb", 20)), breakpoint: None }
        );
        assert_eq!(host.step_into().unwrap(), StopEvent::Exited { code: 0 });
    }

    #[test]
    fn test_condition_syntax() {
        let mut host = FakeHost::paused_at("gen.adb", 10);
        let id = host.insert_breakpoint(&GenLocation::new("gen.adb", 12), false).unwrap();

        let err = host.set_condition(id, "bogus(").unwrap_err();
        assert_eq!(err.to_string(), "A syntax error in expression, near `'.");
        assert!(host.set_condition(id, "a)").is_err());
        assert!(host.set_condition(id, "\"open").is_err());
        assert!(host.user_breakpoints()[0].condition.is_none());

        host.set_condition(id, "$match(\"<Node)>\", self)").unwrap();
        assert_eq!(host.user_breakpoints()[0].condition.as_deref(), Some("$match(\"<Node)>\", self)"));
    }

    #[test]
    fn test_delete_breakpoint() {
        let mut host = FakeHost::paused_at("gen.adb", 10);
        let id = host.insert_breakpoint(&GenLocation::new("gen.adb", 12), true).unwrap();
        assert!(host.user_breakpoints().is_empty());
        assert_eq!(host.breakpoints().count(), 1);
        host.delete_breakpoint(id).unwrap();
        assert!(host.delete_breakpoint(id).is_err());
    }
}
