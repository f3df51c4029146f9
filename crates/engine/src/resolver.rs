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

//! Resolution of user breakpoint specifications into generated-code locations.
//!
//! A specification is either a qualified property name (`FooNode.p_eval`), which
//! resolves to the start of the property's body, or a specification source location
//! (`foo.lkt:12`), which resolves to the start of an expression evaluation. When a
//! location maps to several expressions, the user is asked to pick one through an
//! [`Interaction`] channel.

use std::{
    fmt,
    io::{self, BufRead, Write},
    str::FromStr,
    sync::Arc,
};

use auto_impl::auto_impl;
use sdb_common::{DebugInfo, GenLocation, Property, SlocParseError, SpecLocation};
use tracing::debug;

use crate::error::CommandError;

/// What the user wants to break on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakSpec {
    /// A qualified property name, case-insensitive.
    Property(String),
    /// A specification source location.
    Location(SpecLocation),
}

impl FromStr for BreakSpec {
    type Err = SlocParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.contains(':') {
            s.parse().map(Self::Location)
        } else {
            Ok(Self::Property(s.to_string()))
        }
    }
}

impl fmt::Display for BreakSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property(name) => f.write_str(name),
            Self::Location(sloc) => write!(f, "{sloc}"),
        }
    }
}

/// An expression whose specification location matches a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'a> {
    /// Property the expression belongs to.
    pub property: &'a Property,
    /// Precise location of the expression.
    pub dsl_sloc: &'a SpecLocation,
    /// Generated-code line where its evaluation starts.
    pub line_no: usize,
}

/// Line-oriented conversation with the user.
#[auto_impl(&mut, Box)]
pub trait Interaction {
    /// Where messages for the user go.
    fn output(&mut self) -> &mut dyn Write;

    /// Shows `prompt` and reads one line of input, without its line terminator.
    ///
    /// Returns `Ok(None)` at end of input.
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;
}

/// [`Interaction`] over a reader and a writer, e.g. stdin and stdout.
#[derive(Debug)]
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    /// Creates a console.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Returns the writer.
    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Interaction for Console<R, W> {
    fn output(&mut self) -> &mut dyn Write {
        &mut self.output
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }
}

/// Resolves breakpoint specifications against a [`DebugInfo`] index.
#[derive(Debug, Clone)]
pub struct LocationResolver {
    info: Arc<DebugInfo>,
}

impl LocationResolver {
    /// Creates a resolver over `info`.
    pub fn new(info: Arc<DebugInfo>) -> Self {
        Self { info }
    }

    /// Resolves `spec`, asking the user through `io` when it is ambiguous.
    pub fn resolve(
        &self,
        spec: &BreakSpec,
        io: &mut dyn Interaction,
    ) -> Result<GenLocation, CommandError> {
        match spec {
            BreakSpec::Property(name) => self.resolve_property(name),
            BreakSpec::Location(sloc) => self.resolve_sloc(sloc, io),
        }
    }

    /// Resolves a qualified property name to the first line of its body, skipping the
    /// prologue.
    pub fn resolve_property(&self, name: &str) -> Result<GenLocation, CommandError> {
        let property = self
            .info
            .lookup_by_name(name)
            .ok_or_else(|| CommandError::NoSuchProperty(name.to_string()))?;
        let line = property.body_start().ok_or_else(|| CommandError::NoCode(property.name.clone()))?;
        debug!(property = %property.name, line, "Resolved property");
        Ok(self.gen_location(line))
    }

    /// Returns every expression matching `query`, in generated-code order.
    pub fn find_matches(&self, query: &SpecLocation) -> Vec<Match<'_>> {
        let mut matches = vec![];
        for property in &self.info.properties {
            property.for_each_expr_start(&mut |expr| {
                if let Some(dsl_sloc) = &expr.dsl_sloc {
                    if dsl_sloc.matches(query) {
                        matches.push(Match { property, dsl_sloc, line_no: expr.line_no });
                    }
                }
            });
        }
        matches
    }

    /// Resolves a specification location, asking the user to pick one location when
    /// several expressions match.
    pub fn resolve_sloc(
        &self,
        query: &SpecLocation,
        io: &mut dyn Interaction,
    ) -> Result<GenLocation, CommandError> {
        let matches = self.find_matches(query);
        debug!(%query, matches = matches.len(), "Resolving specification location");

        let chosen = match matches.as_slice() {
            [] => return Err(CommandError::NoMatch(query.clone())),
            [single] => single,
            _ => &matches[self.choose(query, &matches, io)?],
        };
        Ok(self.gen_location(chosen.line_no))
    }

    /// Lists `matches` and returns the index of the one the user picked.
    fn choose(
        &self,
        query: &SpecLocation,
        matches: &[Match<'_>],
        io: &mut dyn Interaction,
    ) -> Result<usize, CommandError> {
        let out = io.output();
        writeln!(out, "Multiple matches for {query}:")?;

        let idx_fmt = |i: usize| format!("[{i}] ");
        let idx_width = idx_fmt(matches.len()).len();
        for (i, m) in matches.iter().enumerate() {
            writeln!(
                out,
                "{:>idx_width$}In {}, {}",
                idx_fmt(i + 1),
                m.property.name,
                m.dsl_sloc
            )?;
            writeln!(out, "{:idx_width$}at {}", "", self.gen_location(m.line_no))?;
        }
        writeln!(out, "Please choose one of the above locations [default=1]:")?;

        let Some(answer) = io.read_line("> ")? else {
            return Err(CommandError::Aborted);
        };
        let answer = answer.trim();
        if answer.is_empty() {
            return Ok(0);
        }

        let choice: usize =
            answer.parse().map_err(|_| CommandError::InvalidChoice(answer.to_string()))?;
        if !(1..=matches.len()).contains(&choice) {
            return Err(CommandError::ChoiceOutOfRange(matches.len()));
        }
        Ok(choice - 1)
    }

    fn gen_location(&self, line: usize) -> GenLocation {
        GenLocation::new(self.info.filename.clone(), line)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::test_utils::{sample_debug_info, GEN_FILE};

    type TestConsole = Console<Cursor<&'static str>, Vec<u8>>;

    fn console(input: &'static str) -> TestConsole {
        Console::new(Cursor::new(input), vec![])
    }

    fn output(console: TestConsole) -> String {
        String::from_utf8(console.into_output()).unwrap()
    }

    fn resolver() -> LocationResolver {
        LocationResolver::new(sample_debug_info())
    }

    #[test]
    fn test_break_spec_parsing() {
        assert_eq!(
            "FooNode.p_eval".parse::<BreakSpec>().unwrap(),
            BreakSpec::Property("FooNode.p_eval".into())
        );
        assert_eq!(
            "foo.lkt:12".parse::<BreakSpec>().unwrap(),
            BreakSpec::Location(SpecLocation::new("foo.lkt", 12))
        );
        assert!("foo.lkt:twelve".parse::<BreakSpec>().is_err());
    }

    #[test]
    fn test_resolve_property_is_case_insensitive() {
        let resolver = resolver();
        let expected = GenLocation::new(GEN_FILE, 20);
        assert_eq!(resolver.resolve_property("FooNode.p_eval").unwrap(), expected);
        assert_eq!(resolver.resolve_property("foonode.P_EVAL").unwrap(), expected);
    }

    #[test]
    fn test_resolve_property_failures() {
        let resolver = resolver();
        assert_eq!(
            resolver.resolve_property("FooNode.p_missing").unwrap_err().to_string(),
            "No such property: FooNode.p_missing"
        );
        assert_eq!(
            resolver.resolve_property("foonode.p_abstract").unwrap_err().to_string(),
            "Cannot break on FooNode.p_abstract: it has no code"
        );
    }

    #[test]
    fn test_find_matches() {
        let resolver = resolver();
        let lines = |q: &str| {
            resolver.find_matches(&q.parse().unwrap()).iter().map(|m| m.line_no).collect::<Vec<_>>()
        };
        assert_eq!(lines("foo.lkt:12"), vec![22, 26]);
        assert_eq!(lines("foo.lkt:12:21"), vec![26]);
        assert_eq!(lines("foo.lkt:13"), vec![31, 35]);
        assert_eq!(lines("foo.lkt:21"), vec![106]);
        assert_eq!(lines("src/foo.lkt:21"), Vec::<usize>::new());
        assert_eq!(lines("foo.lkt:99"), Vec::<usize>::new());
    }

    #[test]
    fn test_single_match_does_not_prompt() {
        let resolver = resolver();
        let mut io = console("");
        let loc = resolver.resolve_sloc(&"foo.lkt:21".parse().unwrap(), &mut io).unwrap();
        assert_eq!(loc, GenLocation::new(GEN_FILE, 106));
        assert_eq!(output(io), "");
    }

    #[test]
    fn test_no_match() {
        let resolver = resolver();
        let mut io = console("");
        let err = resolver.resolve_sloc(&"foo.lkt:99".parse().unwrap(), &mut io).unwrap_err();
        assert_eq!(err.to_string(), "No match for foo.lkt:99");
    }

    #[test]
    fn test_disambiguation_listing() {
        let resolver = resolver();
        let mut io = console("2\n");
        let loc = resolver.resolve_sloc(&"foo.lkt:12".parse().unwrap(), &mut io).unwrap();
        assert_eq!(loc, GenLocation::new(GEN_FILE, 26));
        assert_eq!(
            output(io),
            "Multiple matches for foo.lkt:12:\n\
             [1] In FooNode.p_eval, foo.lkt:12:13\n    \
             at libfoo-implementation.adb:22\n\
             [2] In FooNode.p_eval, foo.lkt:12:21\n    \
             at libfoo-implementation.adb:26\n\
             Please choose one of the above locations [default=1]:\n\
             > "
        );
    }

    #[test]
    fn test_disambiguation_default_choice() {
        let resolver = resolver();
        let mut io = console("\n");
        let loc = resolver.resolve_sloc(&"foo.lkt:13".parse().unwrap(), &mut io).unwrap();
        assert_eq!(loc, GenLocation::new(GEN_FILE, 31));
    }

    #[test]
    fn test_disambiguation_errors() {
        let resolver = resolver();
        let query: SpecLocation = "foo.lkt:12".parse().unwrap();
        let answer = |input: &'static str| {
            resolver.resolve_sloc(&query, &mut console(input)).unwrap_err().to_string()
        };
        assert_eq!(answer("0\n"), "Choice must be in range 1-2");
        assert_eq!(answer("3\n"), "Choice must be in range 1-2");
        assert_eq!(answer("-1\n"), "Invalid index choice: -1");
        assert_eq!(answer("two\n"), "Invalid index choice: two");
        assert_eq!(answer(""), "Aborting: no breakpoint created");
    }

    #[test]
    fn test_disambiguation_is_not_memoized() {
        let resolver = resolver();
        let query: SpecLocation = "foo.lkt:12".parse().unwrap();
        let first = resolver.resolve_sloc(&query, &mut console("2\n")).unwrap();
        let second = resolver.resolve_sloc(&query, &mut console("1\n")).unwrap();
        assert_eq!(first.line, 26);
        assert_eq!(second.line, 22);
    }
}
