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

//! Execution control at specification granularity.
//!
//! The engine only relies on the [`Stepper`] trait; [`MarkerStepper`] implements it
//! with temporary breakpoints placed on the expression markers of the debug info.

use auto_impl::auto_impl;
use sdb_common::{DebugInfo, Event, ExprEvent, GenLocation, Property, Scope};
use tracing::debug;

use crate::{
    breakpoints::BreakpointGroup,
    decoder::{decode_state, StateSnapshot},
    error::CommandError,
    host::{DebugHost, StopEvent},
};

/// Default number of single steps `si` may take before giving up.
pub const DEFAULT_MAX_STEPS: usize = 256;

/// Execution control commands.
#[auto_impl(&mut, Box)]
pub trait Stepper {
    /// Continues until another expression starts or completes in the current property,
    /// or until it returns.
    fn next(&mut self, info: &DebugInfo, host: &mut dyn DebugHost)
        -> Result<StopEvent, CommandError>;

    /// Continues until the expression being evaluated completes.
    fn out(&mut self, info: &DebugInfo, host: &mut dyn DebugHost)
        -> Result<StopEvent, CommandError>;

    /// Steps into the property about to be called, going through dispatchers.
    fn step_inside(
        &mut self,
        info: &DebugInfo,
        host: &mut dyn DebugHost,
    ) -> Result<StopEvent, CommandError>;
}

/// [`Stepper`] driven by the expression markers of the debug info.
#[derive(Debug, Clone)]
pub struct MarkerStepper {
    max_steps: usize,
}

impl Default for MarkerStepper {
    fn default() -> Self {
        Self { max_steps: DEFAULT_MAX_STEPS }
    }
}

impl MarkerStepper {
    /// Creates a stepper giving up `si` after `max_steps` single steps.
    pub fn new(max_steps: usize) -> Self {
        Self { max_steps }
    }
}

fn current_state<'a>(
    info: &'a DebugInfo,
    host: &dyn DebugHost,
) -> Result<StateSnapshot<'a>, CommandError> {
    decode_state(info, host)?.ok_or(CommandError::NotInProperty)
}

/// Collects the lines of every expression marker of `scope` and its nested scopes.
fn marker_lines(scope: &Scope, lines: &mut Vec<usize>) {
    for event in &scope.events {
        match event {
            Event::Scope(s) => marker_lines(s, lines),
            Event::Expr(e) => lines.push(e.line_no()),
        }
    }
}

fn done_line(scope: &Scope, expr_id: usize) -> Option<usize> {
    scope.events.iter().find_map(|event| match event {
        Event::Scope(s) => done_line(s, expr_id),
        Event::Expr(ExprEvent::Done(e)) if e.expr_id == expr_id => Some(e.line_no),
        Event::Expr(_) => None,
    })
}

/// Returns whether a frame at `line` has just entered `property`.
fn has_just_entered(property: &Property, line: usize) -> bool {
    property.body_start().is_none_or(|start| line <= start)
}

impl Stepper for MarkerStepper {
    fn next(
        &mut self,
        info: &DebugInfo,
        host: &mut dyn DebugHost,
    ) -> Result<StopEvent, CommandError> {
        let state = current_state(info, host)?;
        let current = state.location.line;

        let mut lines = vec![];
        marker_lines(&state.property.scope, &mut lines);
        lines.retain(|line| *line > current);
        lines.push(state.property.lines.last);
        debug!(property = %state.property.name, ?lines, "next");

        let group = BreakpointGroup::create(host, &info.filename, lines)?;
        Ok(group.run(host)?)
    }

    fn out(
        &mut self,
        info: &DebugInfo,
        host: &mut dyn DebugHost,
    ) -> Result<StopEvent, CommandError> {
        let state = current_state(info, host)?;
        let expr = state.innermost_in_flight().ok_or(CommandError::NotEvaluating)?;
        let line = done_line(&state.property.scope, expr.expr_id)
            .unwrap_or(state.property.lines.last);
        debug!(expr = %expr.repr, line, "out");

        let group = BreakpointGroup::create(host, &info.filename, [line])?;
        Ok(group.run(host)?)
    }

    fn step_inside(
        &mut self,
        info: &DebugInfo,
        host: &mut dyn DebugHost,
    ) -> Result<StopEvent, CommandError> {
        let start = current_state(info, host)?.property.name.clone();

        for _ in 0..self.max_steps {
            let event = host.step_into()?;
            let StopEvent::Stopped { location: Some(location), .. } = &event else {
                if matches!(event, StopEvent::Exited { .. }) {
                    return Ok(event);
                }
                continue;
            };

            // Runtime and library code is stepped through.
            let Some(property) = landed_in(info, location) else { continue };
            if property.is_dispatcher() {
                continue;
            }
            if property.name != start || has_just_entered(property, location.line) {
                debug!(property = %property.name, "Stepped inside");
                return Ok(event);
            }
            debug!(%location, "No property call to step into");
            return Err(CommandError::StepInsideFailed);
        }

        Err(CommandError::StepInsideFailed)
    }
}

fn landed_in<'a>(info: &'a DebugInfo, location: &GenLocation) -> Option<&'a Property> {
    if !info.is_generated_file(&location.file) {
        return None;
    }
    info.lookup_by_line(location.line)
}
