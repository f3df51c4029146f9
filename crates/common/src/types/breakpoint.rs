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

use std::{fmt::Display, path::PathBuf};

use serde::{Deserialize, Serialize};

/// A position in the generated code: a source file and a line in it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GenLocation {
    /// Path to the generated source file.
    pub file: PathBuf,
    /// Line number in the generated source file (1-based).
    pub line: usize,
}

impl GenLocation {
    /// Creates a new generated-code location.
    pub fn new(file: impl Into<PathBuf>, line: usize) -> Self {
        Self { file: file.into(), line }
    }
}

impl Display for GenLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// Represents a breakpoint in the generated code with an optional condition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Breakpoint {
    /// The location where the breakpoint is set.
    pub loc: GenLocation,
    /// Optional condition expression that must evaluate to true for the breakpoint to trigger.
    pub condition: Option<String>,
    /// Internal breakpoints are created by the debugger itself and hidden from the user.
    pub internal: bool,
}

impl Display for Breakpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.loc)?;
        if let Some(cond) = &self.condition {
            write!(f, " if {cond}")?;
        }
        Ok(())
    }
}

impl Breakpoint {
    /// Creates a new user breakpoint at the given location.
    pub fn new(loc: GenLocation) -> Self {
        Self { loc, condition: None, internal: false }
    }

    /// Creates a new internal breakpoint at the given location.
    pub fn internal(loc: GenLocation) -> Self {
        Self { loc, condition: None, internal: true }
    }

    /// Update the condition of the breakpoint.
    pub fn set_condition(&mut self, condition: &str) {
        self.condition = Some(condition.trim().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakpoint_set_condition() {
        let mut bp = Breakpoint::internal(GenLocation::new("libfoo.adb", 7));
        assert!(bp.internal);
        bp.set_condition(" X > 1 ");
        assert_eq!(bp.condition.as_deref(), Some("X > 1"));
        assert_eq!(bp.to_string(), "@libfoo.adb:7 if X > 1");
    }
}
