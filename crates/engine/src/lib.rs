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

//! SDB engine: specification-level debugging on top of a host debugger.
//!
//! The engine decodes the paused state of a generated program in terms of the
//! specification it was generated from, resolves specification-level breakpoint
//! specifications, and controls execution at expression granularity. All interactions
//! with the debugged process go through the [`DebugHost`] capability trait.

pub mod breakpoints;
pub use breakpoints::*;

pub mod commands;
pub use commands::*;

pub mod config;
pub use config::*;

pub mod decoder;
pub use decoder::*;

pub mod error;
pub use error::*;

pub mod host;
pub use host::*;

pub mod render;
pub use render::*;

pub mod resolver;
pub use resolver::*;

pub mod session;
pub use session::*;

pub mod stepping;
pub use stepping::*;

#[cfg(test)]
mod test_utils;
