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

//! Shared fixtures for unit tests.

use std::sync::Arc;

use sdb_common::DebugInfo;

use crate::host::FakeHost;

/// Generated file of the sample debug info.
pub(crate) const GEN_FILE: &str = "libfoo-implementation.adb";

const SAMPLE_JSON: &str = include_str!("../testdata/sample.json");

/// Loads the sample debug info.
pub(crate) fn sample_debug_info() -> Arc<DebugInfo> {
    Arc::new(DebugInfo::from_json_str(SAMPLE_JSON).expect("sample debug info must load"))
}

/// A host paused in `FooNode.p_eval` right before `x + 2` completes, with the
/// variables of that point set.
pub(crate) fn host_evaluating_x_plus_2() -> FakeHost {
    let mut host = FakeHost::paused_at(GEN_FILE, 27);
    host.set_variable("Self", "<FooNode foo.lkt:1:1-5:1>")
        .set_variable("Var_X", "1")
        .set_variable("Add_1", "2");
    host
}
