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

//! A debugging session: the command surface wired to a host debugger.

use std::{io, sync::Arc};

use sdb_common::DebugInfo;
use tracing::{debug, warn};

use crate::{
    breakpoints::BreakpointCoordinator,
    commands::{Command, Commands},
    config::SdbConfig,
    decoder::decode_state,
    error::CommandError,
    host::{DebugHost, StopEvent},
    render::StatePrinter,
    resolver::{Interaction, LocationResolver},
    stepping::{MarkerStepper, Stepper},
};

/// Executes SDB commands against a host debugger.
pub struct Session {
    info: Arc<DebugInfo>,
    config: SdbConfig,
    commands: Commands,
    breakpoints: BreakpointCoordinator,
    host: Box<dyn DebugHost>,
    stepper: Box<dyn Stepper>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("generated_file", &self.info.filename)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session over `host`, stepping with a [`MarkerStepper`].
    pub fn new(info: Arc<DebugInfo>, config: SdbConfig, host: Box<dyn DebugHost>) -> Self {
        Self {
            commands: Commands::new(config.command_prefix.clone(), info.clone()),
            breakpoints: BreakpointCoordinator::new(LocationResolver::new(info.clone())),
            stepper: Box::new(MarkerStepper::default()),
            info,
            config,
            host,
        }
    }

    /// Replaces the execution controller.
    pub fn with_stepper(mut self, stepper: Box<dyn Stepper>) -> Self {
        self.stepper = stepper;
        self
    }

    /// Returns the command set.
    pub fn commands(&self) -> &Commands {
        &self.commands
    }

    /// Returns the host debugger.
    pub fn host_mut(&mut self) -> &mut dyn DebugHost {
        self.host.as_mut()
    }

    /// Executes `line` if it is an SDB command.
    ///
    /// Returns `Ok(false)` when the line is not an SDB command. Command failures are
    /// reported to the user through `io`; only failing to talk to the user is an error.
    pub fn execute(&mut self, line: &str, io: &mut dyn Interaction) -> io::Result<bool> {
        let Some(parsed) = self.commands.parse(line) else {
            return Ok(false);
        };
        debug!(?parsed, "Parsed command");

        match parsed.and_then(|command| self.run(command, io)) {
            Ok(()) => {}
            Err(CommandError::Io(err)) => return Err(err),
            Err(err) => {
                if let CommandError::Host(host_err) = &err {
                    warn!("Host debugger failure: {host_err}");
                }
                writeln!(io.output(), "{err}")?;
            }
        }
        Ok(true)
    }

    fn run(&mut self, command: Command, io: &mut dyn Interaction) -> Result<(), CommandError> {
        match command {
            Command::State { with_ellipsis, with_locs, var_name } => {
                self.print_state(io, |printer| {
                    printer
                        .with_ellipsis(with_ellipsis)
                        .with_locs(with_locs)
                        .var_name(var_name.as_deref())
                })?;
            }
            Command::Break { spec, condition } => {
                self.breakpoints.break_on(self.host.as_mut(), &spec, condition.as_deref(), io)?;
            }
            Command::Next => {
                let event = self.stepper.next(&self.info, self.host.as_mut())?;
                self.report_stop(event, io)?;
            }
            Command::Out => {
                let event = self.stepper.out(&self.info, self.host.as_mut())?;
                self.report_stop(event, io)?;
            }
            Command::StepInside => {
                let event = self.stepper.step_inside(&self.info, self.host.as_mut())?;
                self.report_stop(event, io)?;
            }
            Command::Help => write!(io.output(), "{}", self.commands.help())?,
        }
        Ok(())
    }

    fn print_state<'s>(
        &'s self,
        io: &mut dyn Interaction,
        configure: impl FnOnce(StatePrinter<'s, dyn DebugHost>) -> StatePrinter<'s, dyn DebugHost>,
    ) -> Result<(), CommandError> {
        let frame: &dyn DebugHost = self.host.as_ref();
        let snapshot = decode_state(&self.info, frame)?;
        let printer =
            configure(StatePrinter::new(frame).ellipsis_limit(self.config.ellipsis_limit));
        write!(io.output(), "{}", printer.render(snapshot.as_ref()))?;
        Ok(())
    }

    fn report_stop(&self, event: StopEvent, io: &mut dyn Interaction) -> Result<(), CommandError> {
        match event {
            StopEvent::Stopped { .. } => self.print_state(io, |printer| printer),
            StopEvent::Exited { code } => {
                writeln!(io.output(), "[Inferior exited with code {code}]")?;
                Ok(())
            }
        }
    }
}
