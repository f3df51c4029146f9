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

//! Breakpoint creation and temporary breakpoint groups.

use std::{collections::BTreeSet, path::Path};

use sdb_common::GenLocation;
use tracing::{debug, info, warn};

use crate::{
    error::CommandError,
    host::{BreakpointId, DebugHost, HostError, StopEvent},
    resolver::{BreakSpec, Interaction, LocationResolver},
};

/// Creates user breakpoints from breakpoint specifications.
#[derive(Debug, Clone)]
pub struct BreakpointCoordinator {
    resolver: LocationResolver,
}

impl BreakpointCoordinator {
    /// Creates a coordinator resolving specifications with `resolver`.
    pub fn new(resolver: LocationResolver) -> Self {
        Self { resolver }
    }

    /// Resolves `spec` and creates a breakpoint there, with `condition` if any.
    ///
    /// Nothing is created when resolution fails. When the host rejects the condition,
    /// the breakpoint stays in place without condition and
    /// [`CommandError::ConditionRejected`] is returned.
    pub fn break_on(
        &self,
        host: &mut dyn DebugHost,
        spec: &BreakSpec,
        condition: Option<&str>,
        io: &mut dyn Interaction,
    ) -> Result<BreakpointId, CommandError> {
        let loc = self.resolver.resolve(spec, io)?;
        let id = host.insert_breakpoint(&loc, false)?;
        info!(%id, %loc, %spec, "Breakpoint created");
        writeln!(io.output(), "Breakpoint {id} at {loc}")?;

        if let Some(condition) = condition {
            host.set_condition(id, condition).map_err(|source| {
                warn!(%id, condition, "Host rejected breakpoint condition: {source}");
                CommandError::ConditionRejected { id, source }
            })?;
        }
        Ok(id)
    }
}

/// Internal breakpoints considered as a single temporary one.
///
/// Whatever stops the inferior next (one of the group's breakpoints, another breakpoint
/// or the inferior's exit), all the breakpoints of the group are deleted.
#[derive(Debug, Default)]
#[must_use = "a breakpoint group must be run or cleaned up"]
pub struct BreakpointGroup {
    ids: Vec<BreakpointId>,
}

impl BreakpointGroup {
    /// Inserts one internal breakpoint per distinct line of `file`.
    ///
    /// If an insertion fails, the breakpoints already inserted are removed.
    pub fn create(
        host: &mut dyn DebugHost,
        file: &Path,
        lines: impl IntoIterator<Item = usize>,
    ) -> Result<Self, HostError> {
        let mut group = Self::default();
        for line in lines.into_iter().collect::<BTreeSet<_>>() {
            match host.insert_breakpoint(&GenLocation::new(file, line), true) {
                Ok(id) => group.ids.push(id),
                Err(err) => {
                    group.cleanup(host);
                    return Err(err);
                }
            }
        }
        debug!(breakpoints = group.ids.len(), "Created breakpoint group");
        Ok(group)
    }

    /// Resumes the inferior until it stops, then deletes the group.
    pub fn run(self, host: &mut dyn DebugHost) -> Result<StopEvent, HostError> {
        let event = host.resume();
        self.cleanup(host);
        event
    }

    /// Deletes every breakpoint of the group.
    ///
    /// Failures are logged and otherwise ignored: the breakpoints may already be gone
    /// with the inferior.
    pub fn cleanup(self, host: &mut dyn DebugHost) {
        for id in self.ids {
            if let Err(err) = host.delete_breakpoint(id) {
                warn!(%id, "Failed to delete internal breakpoint: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::{
        host::FakeHost,
        resolver::Console,
        test_utils::{sample_debug_info, GEN_FILE},
    };

    fn coordinator() -> BreakpointCoordinator {
        BreakpointCoordinator::new(LocationResolver::new(sample_debug_info()))
    }

    fn break_on(
        host: &mut FakeHost,
        spec: &str,
        condition: Option<&str>,
        input: &'static str,
    ) -> (Result<BreakpointId, CommandError>, String) {
        let mut io = Console::new(Cursor::new(input), vec![]);
        let result = coordinator().break_on(host, &spec.parse().unwrap(), condition, &mut io);
        (result, String::from_utf8(io.into_output()).unwrap())
    }

    #[test]
    fn test_break_on_property() {
        let mut host = FakeHost::paused_at(GEN_FILE, 1);
        let (result, out) = break_on(&mut host, "foonode.p_eval", None, "");
        assert_eq!(result.unwrap(), BreakpointId(1));
        assert_eq!(out, "Breakpoint 1 at libfoo-implementation.adb:20\n");
        assert_eq!(host.user_breakpoints()[0].loc, GenLocation::new(GEN_FILE, 20));
    }

    #[test]
    fn test_break_with_condition() {
        let mut host = FakeHost::paused_at(GEN_FILE, 1);
        let (result, _) = break_on(&mut host, "FooNode.p_eval", Some("x == 1"), "");
        result.unwrap();
        assert_eq!(host.user_breakpoints()[0].condition.as_deref(), Some("x == 1"));
    }

    #[test]
    fn test_rejected_condition_keeps_breakpoint() {
        let mut host = FakeHost::paused_at(GEN_FILE, 1);
        let (result, _) = break_on(&mut host, "FooNode.p_eval", Some("bogus("), "");
        match result.unwrap_err() {
            CommandError::ConditionRejected { id, source } => {
                assert_eq!(id, BreakpointId(1));
                assert_eq!(source.to_string(), "A syntax error in expression, near `'.");
            }
            err => panic!("unexpected error: {err}"),
        }
        let bps = host.user_breakpoints();
        assert_eq!(bps.len(), 1);
        assert_eq!(bps[0].condition, None);
    }

    #[test]
    fn test_failed_resolution_creates_nothing() {
        let mut host = FakeHost::paused_at(GEN_FILE, 1);
        assert!(break_on(&mut host, "FooNode.p_missing", None, "").0.is_err());
        assert!(break_on(&mut host, "foo.lkt:12", None, "7\n").0.is_err());
        assert!(break_on(&mut host, "foo.lkt:12", None, "").0.is_err());
        assert!(host.user_breakpoints().is_empty());
    }

    #[test]
    fn test_group_is_deleted_after_stop() {
        let mut host = FakeHost::paused_at(GEN_FILE, 20);
        host.extend_path(GEN_FILE, [21, 22, 23]);

        let group = BreakpointGroup::create(&mut host, Path::new(GEN_FILE), [24, 22, 22]).unwrap();
        assert_eq!(host.breakpoints().filter(|(_, bp)| bp.internal).count(), 2);

        let event = group.run(&mut host).unwrap();
        assert_eq!(
            event,
            StopEvent::Stopped {
                location: Some(GenLocation::new(GEN_FILE, 22)),
                breakpoint: Some(BreakpointId(1)),
            }
        );
        assert_eq!(host.breakpoints().count(), 0);
    }

    #[test]
    fn test_group_is_deleted_after_exit() {
        let mut host = FakeHost::paused_at(GEN_FILE, 20);
        host.extend_path(GEN_FILE, [21]);
        host.set_exit_code(3);

        let group = BreakpointGroup::create(&mut host, Path::new(GEN_FILE), [40]).unwrap();
        assert_eq!(group.run(&mut host).unwrap(), StopEvent::Exited { code: 3 });
        assert_eq!(host.breakpoints().count(), 0);
    }
}
