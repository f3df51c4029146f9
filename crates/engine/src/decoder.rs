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

//! Decoding of the paused execution state in specification terms.
//!
//! Given the selected frame, [`decode_state`] finds the property being executed and
//! walks its scope tree to reconstruct which bindings are visible, which expressions
//! have been evaluated and which one is being evaluated. The result borrows from the
//! [`DebugInfo`] index and is rebuilt for every request.

use std::collections::HashMap;

use sdb_common::{Binding, DebugInfo, Event, ExprEvent, ExprStart, GenLocation, Property, Scope};
use tracing::debug;

use crate::host::{FrameAdapter, HostError};

/// State of one active scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeState<'a> {
    /// The scope itself.
    pub scope: &'a Scope,
    /// Bindings already bound, in declaration order.
    pub bindings: Vec<&'a Binding>,
    /// Evaluated expressions, in completion order.
    pub done_exprs: Vec<&'a ExprStart>,
    /// The innermost expression being evaluated, if any.
    pub last_started: Option<&'a ExprStart>,
}

impl<'a> ScopeState<'a> {
    /// Analyzes `scope` for a frame paused at generated `line`.
    ///
    /// Returns the state of the scope and the nested scope containing `line`, if any.
    fn analyze(scope: &'a Scope, line: usize) -> (Self, Option<&'a Scope>) {
        let bindings = scope.bindings.iter().filter(|b| b.line_no <= line).collect();

        let mut started: HashMap<usize, &'a ExprStart> = HashMap::new();
        let mut in_flight: Vec<usize> = vec![];
        let mut done_exprs = vec![];
        let mut inner = None;

        for event in &scope.events {
            match event {
                Event::Scope(s) if s.lines.contains(line) => {
                    inner = Some(s);
                    break;
                }
                // Already left: what it evaluated is out of scope now.
                Event::Scope(s) if s.lines.last < line => {}
                Event::Scope(_) => break,
                Event::Expr(e) if e.line_no() > line => break,
                Event::Expr(ExprEvent::Start(e)) => {
                    started.insert(e.expr_id, e);
                    in_flight.push(e.expr_id);
                }
                Event::Expr(ExprEvent::Done(e)) => {
                    in_flight.retain(|id| *id != e.expr_id);
                    if let Some(start) = started.get(&e.expr_id) {
                        done_exprs.push(*start);
                    }
                }
            }
        }

        let last_started = in_flight.last().and_then(|id| started.get(id)).copied();
        (Self { scope, bindings, done_exprs, last_started }, inner)
    }

    /// Returns whether there is nothing to show for this scope.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty() && self.done_exprs.is_empty() && self.last_started.is_none()
    }
}

/// What is executing, in specification terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot<'a> {
    /// Location of the frame this snapshot was decoded from.
    pub location: GenLocation,
    /// The running property.
    pub property: &'a Property,
    /// Whether the property is about to return a memoized result.
    pub in_memoization_lookup: bool,
    /// Active scopes, outermost first.
    pub scopes: Vec<ScopeState<'a>>,
}

impl<'a> StateSnapshot<'a> {
    /// Builds the snapshot of `property` for a frame paused at `location`.
    pub fn build(property: &'a Property, location: GenLocation) -> Self {
        let line = location.line;
        let in_memoization_lookup =
            property.memoization_lookup.is_some_and(|lookup| lookup.contains(line));

        let mut scopes = vec![];
        let mut current = Some(&property.scope);
        while let Some(scope) = current {
            let (state, inner) = ScopeState::analyze(scope, line);
            scopes.push(state);
            current = inner;
        }

        Self { location, property, in_memoization_lookup, scopes }
    }

    /// Returns the binding called `dsl_name` in any active scope, innermost last.
    pub fn lookup_binding(&self, dsl_name: &str) -> Option<&'a Binding> {
        self.scopes.iter().flat_map(|s| s.bindings.iter()).find(|b| b.dsl_name == dsl_name).copied()
    }

    /// Returns the innermost expression being evaluated, across all scopes.
    pub fn innermost_in_flight(&self) -> Option<&'a ExprStart> {
        self.scopes.iter().rev().find_map(|s| s.last_started)
    }
}

/// Decodes the state of the selected frame.
///
/// Returns `Ok(None)` when the frame is not inside any known property, e.g. when it is
/// paused in runtime or library code. This is not an error.
pub fn decode_state<'a, F>(info: &'a DebugInfo, frame: &F) -> Result<Option<StateSnapshot<'a>>, HostError>
where
    F: FrameAdapter + ?Sized,
{
    let Some(location) = frame.location()? else {
        debug!("Selected frame has no location");
        return Ok(None);
    };

    if !info.is_generated_file(&location.file) {
        debug!(%location, "Selected frame is outside the generated code");
        return Ok(None);
    }

    let Some(property) = info.lookup_by_line(location.line) else {
        debug!(%location, "Selected frame is not in a property");
        return Ok(None);
    };

    let snapshot = StateSnapshot::build(property, location);
    debug!(
        property = %property.name,
        scopes = snapshot.scopes.len(),
        memoization = snapshot.in_memoization_lookup,
        "Decoded state"
    );
    Ok(Some(snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{host::FakeHost, test_utils::sample_debug_info};

    fn decode_at(line: usize) -> Option<(String, Vec<Vec<String>>, Vec<Vec<String>>, Vec<Option<String>>, bool)> {
        let info = sample_debug_info();
        let host = FakeHost::paused_at("libfoo-implementation.adb", line);
        let snapshot = decode_state(&info, &host).unwrap()?;
        Some((
            snapshot.property.name.clone(),
            snapshot.scopes.iter().map(|s| s.bindings.iter().map(|b| b.dsl_name.clone()).collect()).collect(),
            snapshot.scopes.iter().map(|s| s.done_exprs.iter().map(|e| e.repr.clone()).collect()).collect(),
            snapshot.scopes.iter().map(|s| s.last_started.map(|e| e.repr.clone())).collect(),
            snapshot.in_memoization_lookup,
        ))
    }

    #[test]
    fn test_outside_any_property() {
        assert!(decode_at(5).is_none());
        assert!(decode_at(75).is_none());
    }

    #[test]
    fn test_other_file_is_not_a_property() {
        let info = sample_debug_info();
        let host = FakeHost::paused_at("a-runtime.adb", 20);
        assert!(decode_state(&info, &host).unwrap().is_none());
        assert!(decode_state(&info, &FakeHost::new()).unwrap().is_none());
    }

    #[test]
    fn test_property_prologue() {
        let (name, bindings, done, current, memo) = decode_at(11).unwrap();
        assert_eq!(name, "FooNode.p_eval");
        assert_eq!(bindings, vec![vec!["Self".to_string()]]);
        assert_eq!(done, vec![Vec::<String>::new()]);
        assert_eq!(current, vec![None]);
        assert!(!memo);
    }

    #[test]
    fn test_memoization_lookup() {
        let (_, _, _, _, memo) = decode_at(13).unwrap();
        assert!(memo);
    }

    #[test]
    fn test_finished_and_in_flight() {
        // x bound, x + 1 done, x + 2 started.
        let (_, bindings, done, current, _) = decode_at(27).unwrap();
        assert_eq!(bindings, vec![vec!["Self".to_string()], vec!["x".to_string()]]);
        assert_eq!(done, vec![vec![], vec!["x + 1".to_string()]]);
        assert_eq!(current, vec![None, Some("x + 2".to_string())]);
    }

    #[test]
    fn test_nested_in_flight_reports_innermost() {
        // Both the outer call and its argument have started.
        let (_, _, done, current, _) = decode_at(33).unwrap();
        assert_eq!(done[1], vec!["x + 1".to_string(), "x + 2".to_string()]);
        assert_eq!(current[1], Some("Self.p_helper(y)".to_string()));

        let (_, _, _, current, _) = decode_at(37).unwrap();
        assert_eq!(current, vec![None, Some("Self.p_helper(y)".to_string()), Some("y * 2".to_string())]);
    }

    #[test]
    fn test_left_scope_is_not_active() {
        let (_, bindings, done, current, _) = decode_at(43).unwrap();
        assert_eq!(bindings.len(), 2);
        assert_eq!(done[1], vec!["x + 1".to_string(), "x + 2".to_string(), "Self.p_helper(y)".to_string()]);
        assert_eq!(current[1], None);
    }

    #[test]
    fn test_snapshot_helpers() {
        let info = sample_debug_info();
        let host = FakeHost::paused_at("libfoo-implementation.adb", 37);
        let snapshot = decode_state(&info, &host).unwrap().unwrap();
        assert_eq!(snapshot.lookup_binding("y").unwrap().gen_name, "Var_Y");
        assert!(snapshot.lookup_binding("Y").is_none());
        assert_eq!(snapshot.innermost_in_flight().unwrap().repr, "y * 2");
    }

    #[test]
    fn test_decoding_is_repeatable() {
        let info = sample_debug_info();
        let host = FakeHost::paused_at("libfoo-implementation.adb", 33);
        let first = decode_state(&info, &host).unwrap();
        let second = decode_state(&info, &host).unwrap();
        assert_eq!(first, second);
    }
}
