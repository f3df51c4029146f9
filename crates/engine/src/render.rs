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

//! Text rendering of a [`StateSnapshot`].

use sdb_common::Binding;

use crate::{decoder::StateSnapshot, host::FrameAdapter};

/// Default number of characters of a value shown before it gets truncated.
pub const DEFAULT_ELLIPSIS_LIMIT: usize = 50;

const ELLIPSIS: &str = "...";

/// Renders the state of the selected frame.
///
/// Values are read lazily through the frame, so the printer must be used while the
/// inferior is still paused at the frame the snapshot was decoded from.
#[derive(Debug)]
pub struct StatePrinter<'a, F: ?Sized> {
    frame: &'a F,
    with_ellipsis: bool,
    with_locs: bool,
    ellipsis_limit: usize,
    var_name: Option<&'a str>,
}

impl<'a, F: FrameAdapter + ?Sized> StatePrinter<'a, F> {
    /// Creates a printer reading values from `frame`.
    pub fn new(frame: &'a F) -> Self {
        Self {
            frame,
            with_ellipsis: true,
            with_locs: false,
            ellipsis_limit: DEFAULT_ELLIPSIS_LIMIT,
            var_name: None,
        }
    }

    /// Truncates long values (enabled by default).
    pub fn with_ellipsis(mut self, enabled: bool) -> Self {
        self.with_ellipsis = enabled;
        self
    }

    /// Shows the generated variable holding each value.
    pub fn with_locs(mut self, enabled: bool) -> Self {
        self.with_locs = enabled;
        self
    }

    /// Sets the truncation threshold.
    pub fn ellipsis_limit(mut self, limit: usize) -> Self {
        self.ellipsis_limit = limit;
        self
    }

    /// Only shows the binding called `name`.
    pub fn var_name(mut self, name: Option<&'a str>) -> Self {
        self.var_name = name;
        self
    }

    /// Renders `snapshot` (`None` meaning the frame is outside every property).
    ///
    /// Every line, the last one included, ends with a newline.
    pub fn render(&self, snapshot: Option<&StateSnapshot<'_>>) -> String {
        let mut out = String::new();
        let mut emit = |line: String| {
            out.push_str(&line);
            out.push('\n');
        };

        let Some(state) = snapshot else {
            emit("Selected frame is not in a property.".to_string());
            return out;
        };

        if let Some(name) = self.var_name {
            match state.lookup_binding(name) {
                Some(binding) => emit(self.binding_line(binding)),
                None => emit(format!("No binding called {name}")),
            }
            return out;
        }

        emit(format!("Running {}", state.property.name));
        if let Some(sloc) = &state.property.dsl_sloc {
            emit(format!("from {sloc}"));
        }
        if state.in_memoization_lookup {
            emit("About to return a memoized result...".to_string());
        }

        for scope in &state.scopes {
            if scope.is_empty() {
                continue;
            }
            emit(String::new());

            for binding in &scope.bindings {
                emit(self.binding_line(binding));
            }
            for expr in &scope.done_exprs {
                emit(format!(
                    "{}{} -> {}",
                    expr.repr,
                    self.loc_image(&expr.result_var),
                    self.value_image(&expr.result_var)
                ));
            }
            if let Some(expr) = scope.last_started {
                emit(format!("Currently evaluating {}", expr.repr));
                if let Some(sloc) = &expr.dsl_sloc {
                    emit(format!("from {sloc}"));
                }
            }
        }

        out
    }

    fn binding_line(&self, binding: &Binding) -> String {
        format!(
            "{}{} = {}",
            binding.dsl_name,
            self.loc_image(&binding.gen_name),
            self.value_image(&binding.gen_name)
        )
    }

    fn loc_image(&self, gen_name: &str) -> String {
        if self.with_locs {
            format!(" ({gen_name})")
        } else {
            String::new()
        }
    }

    fn value_image(&self, gen_name: &str) -> String {
        match self.frame.read_var(gen_name) {
            Ok(value) if self.with_ellipsis => truncate(&value, self.ellipsis_limit),
            Ok(value) => value,
            Err(err) => format!("<unavailable: {err}>"),
        }
    }
}

/// Cuts `value` to `limit` characters, appending an ellipsis when something was cut.
pub fn truncate(value: &str, limit: usize) -> String {
    match value.char_indices().nth(limit) {
        Some((end, _)) => format!("{}{ELLIPSIS}", &value[..end]),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        decoder::decode_state,
        host::FakeHost,
        test_utils::{host_evaluating_x_plus_2, sample_debug_info, GEN_FILE},
    };

    fn render_with(
        host: &FakeHost,
        printer: impl Fn(StatePrinter<'_, FakeHost>) -> StatePrinter<'_, FakeHost>,
    ) -> String {
        let info = sample_debug_info();
        let snapshot = decode_state(&info, host).unwrap();
        printer(StatePrinter::new(host)).render(snapshot.as_ref())
    }

    #[test]
    fn test_truncate() {
        let long = "a".repeat(51);
        assert_eq!(truncate(&long, 50), format!("{}...", "a".repeat(50)));
        assert_eq!(truncate(&"b".repeat(50), 50), "b".repeat(50));
        assert_eq!(truncate("", 50), "");
        assert_eq!(truncate("ééé", 2), "éé...");
    }

    #[test]
    fn test_render_full_state() {
        let host = host_evaluating_x_plus_2();
        let text = render_with(&host, |p| p);
        assert_eq!(
            text,
            "Running FooNode.p_eval\n\
             from foo.lkt:10\n\
             \n\
             Self = <FooNode foo.lkt:1:1-5:1>\n\
             \n\
             x = 1\n\
             x + 1 -> 2\n\
             Currently evaluating x + 2\n\
             from foo.lkt:12:21\n"
        );
    }

    #[test]
    fn test_render_with_locs() {
        let host = host_evaluating_x_plus_2();
        let text = render_with(&host, |p| p.with_locs(true));
        assert!(text.contains("x (Var_X) = 1\n"));
        assert!(text.contains("x + 1 (Add_1) -> 2\n"));
        assert!(text.contains("Currently evaluating x + 2\n"));
    }

    #[test]
    fn test_render_ellipsis() {
        let mut host = host_evaluating_x_plus_2();
        host.set_variable("Var_X", "9".repeat(60));

        let text = render_with(&host, |p| p);
        assert!(text.contains(&format!("x = {}...\n", "9".repeat(50))));

        let text = render_with(&host, |p| p.with_ellipsis(false));
        assert!(text.contains(&format!("x = {}\n", "9".repeat(60))));

        let text = render_with(&host, |p| p.ellipsis_limit(3));
        assert!(text.contains("x = 999...\n"));
    }

    #[test]
    fn test_render_single_binding() {
        let host = host_evaluating_x_plus_2();
        assert_eq!(render_with(&host, |p| p.var_name(Some("x"))), "x = 1\n");
        assert_eq!(render_with(&host, |p| p.var_name(Some("X"))), "No binding called X\n");
        // y is declared further down.
        assert_eq!(render_with(&host, |p| p.var_name(Some("y"))), "No binding called y\n");
    }

    #[test]
    fn test_render_outside_property() {
        let host = FakeHost::paused_at(GEN_FILE, 75);
        assert_eq!(render_with(&host, |p| p), "Selected frame is not in a property.\n");
        assert_eq!(
            render_with(&host, |p| p.var_name(Some("x"))),
            "Selected frame is not in a property.\n"
        );
    }

    #[test]
    fn test_render_memoization_lookup() {
        let host = FakeHost::paused_at(GEN_FILE, 13);
        let text = render_with(&host, |p| p);
        assert!(text.starts_with("Running FooNode.p_eval\nfrom foo.lkt:10\nAbout to return a memoized result...\n"));
    }

    #[test]
    fn test_render_unreadable_value() {
        let mut host = FakeHost::paused_at(GEN_FILE, 27);
        host.set_variable("Var_X", "1");
        let text = render_with(&host, |p| p);
        assert!(text.contains("x + 1 -> <unavailable: No symbol \"Add_1\" in current context.>\n"));
    }

    #[test]
    fn test_render_is_reproducible() {
        let host = host_evaluating_x_plus_2();
        assert_eq!(render_with(&host, |p| p), render_with(&host, |p| p));
    }
}
