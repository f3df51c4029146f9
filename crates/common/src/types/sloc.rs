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

//! Source locations in the high-level specification.
//!
//! A [`SpecLocation`] points into the high-level specification that produced the
//! generated program, as opposed to a [`GenLocation`](super::GenLocation) which points
//! into the generated code itself.

use std::{fmt, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when parsing a [`SpecLocation`] from its textual form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlocParseError {
    /// The file part of the location is empty.
    #[error("missing file name in source location: {0}")]
    MissingFile(String),
    /// No `:<line>` suffix was found.
    #[error("missing line number in source location: {0}")]
    MissingLine(String),
    /// A numeric component could not be parsed.
    #[error("invalid {what} in source location {input}: {value:?}")]
    InvalidNumber {
        /// Which component was invalid (line, column or discriminator).
        what: &'static str,
        /// The rejected text.
        value: String,
        /// The whole input.
        input: String,
    },
}

/// A position in the specification source.
///
/// Textual form: `<file>:<line>[:<column>][#<discriminator>]`. The discriminator tells
/// apart several constructs that share the same line and column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SpecLocation {
    /// Specification file, as recorded in the debug metadata.
    pub file: String,
    /// Line number (1-based).
    pub line: usize,
    /// Column number (1-based), if known.
    pub column: Option<usize>,
    /// Sub-position discriminator, if several constructs share a position.
    pub discriminator: Option<usize>,
}

impl SpecLocation {
    /// Creates a location with only a file and a line.
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Self { file: file.into(), line, column: None, discriminator: None }
    }

    /// Returns this location with the given column.
    pub fn with_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    /// Returns this location with the given discriminator.
    pub fn with_discriminator(mut self, discriminator: usize) -> Self {
        self.discriminator = Some(discriminator);
        self
    }

    /// Returns whether this (recorded) location matches the `query` location.
    ///
    /// Components absent from the query act as wildcards: `spec.py:12` matches
    /// `spec.py:12:4` and `spec.py:12:9#2`. The converse does not hold: a query carrying
    /// a column never matches a recorded location without one. The query file matches
    /// when it is a trailing path suffix of the recorded file.
    pub fn matches(&self, query: &Self) -> bool {
        file_matches(&self.file, &query.file)
            && self.line == query.line
            && query.column.is_none_or(|column| self.column == Some(column))
            && query.discriminator.is_none_or(|disc| self.discriminator == Some(disc))
    }
}

fn file_matches(recorded: &str, query: &str) -> bool {
    recorded == query || Path::new(recorded).ends_with(Path::new(query))
}

fn parse_number(what: &'static str, value: &str, input: &str) -> Result<usize, SlocParseError> {
    value.trim().parse::<usize>().map_err(|_| SlocParseError::InvalidNumber {
        what,
        value: value.to_string(),
        input: input.to_string(),
    })
}

fn is_number(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

impl FromStr for SpecLocation {
    type Err = SlocParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();

        let (rest, discriminator) = match input.rsplit_once('#') {
            Some((rest, disc)) => (rest, Some(parse_number("discriminator", disc, input)?)),
            None => (input, None),
        };

        let Some((head, last)) = rest.rsplit_once(':') else {
            return Err(SlocParseError::MissingLine(input.to_string()));
        };

        // `file:line:column` when the component before the last one is numeric too.
        let (file, line, column) = match head.rsplit_once(':') {
            Some((file, line)) if is_number(line) => {
                (file, parse_number("line", line, input)?, Some(parse_number("column", last, input)?))
            }
            _ => (head, parse_number("line", last, input)?, None),
        };

        if file.is_empty() {
            return Err(SlocParseError::MissingFile(input.to_string()));
        }

        Ok(Self { file: file.to_string(), line, column, discriminator })
    }
}

impl TryFrom<String> for SpecLocation {
    type Error = SlocParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SpecLocation> for String {
    fn from(value: SpecLocation) -> Self {
        value.to_string()
    }
}

impl fmt::Display for SpecLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)?;
        if let Some(column) = self.column {
            write!(f, ":{column}")?;
        }
        if let Some(disc) = self.discriminator {
            write!(f, "#{disc}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_line() {
        let sloc: SpecLocation = "spec.py:128".parse().unwrap();
        assert_eq!(sloc, SpecLocation::new("spec.py", 128));
        assert_eq!(sloc.to_string(), "spec.py:128");
    }

    #[test]
    fn test_parse_full_form() {
        let sloc: SpecLocation = "lang/spec.py:12:7#2".parse().unwrap();
        assert_eq!(sloc.file, "lang/spec.py");
        assert_eq!(sloc.line, 12);
        assert_eq!(sloc.column, Some(7));
        assert_eq!(sloc.discriminator, Some(2));
        assert_eq!(sloc.to_string(), "lang/spec.py:12:7#2");
    }

    #[test]
    fn test_parse_windows_drive() {
        let sloc: SpecLocation = r"C:\lang\spec.py:40".parse().unwrap();
        assert_eq!(sloc.file, r"C:\lang\spec.py");
        assert_eq!(sloc.line, 40);
        assert_eq!(sloc.column, None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!("spec.py".parse::<SpecLocation>(), Err(SlocParseError::MissingLine(_))));
        assert!(matches!(":12".parse::<SpecLocation>(), Err(SlocParseError::MissingFile(_))));
        assert!(matches!(
            "spec.py:twelve".parse::<SpecLocation>(),
            Err(SlocParseError::InvalidNumber { what: "line", .. })
        ));
        assert!(matches!(
            "spec.py:12#x".parse::<SpecLocation>(),
            Err(SlocParseError::InvalidNumber { what: "discriminator", .. })
        ));
    }

    #[test]
    fn test_columnless_query_matches_any_column() {
        let query = SpecLocation::new("spec.py", 12);
        assert!(SpecLocation::new("spec.py", 12).with_column(4).matches(&query));
        assert!(SpecLocation::new("spec.py", 12).with_column(9).with_discriminator(1).matches(&query));
        assert!(!SpecLocation::new("spec.py", 13).with_column(4).matches(&query));
        assert!(!SpecLocation::new("other.py", 12).matches(&query));
    }

    #[test]
    fn test_column_query_does_not_match_columnless_record() {
        let query = SpecLocation::new("spec.py", 12).with_column(4);
        assert!(!SpecLocation::new("spec.py", 12).matches(&query));
        assert!(SpecLocation::new("spec.py", 12).with_column(4).matches(&query));
        assert!(!SpecLocation::new("spec.py", 12).with_column(5).matches(&query));
    }

    #[test]
    fn test_match_is_reflexive() {
        for sloc in [
            SpecLocation::new("spec.py", 1),
            SpecLocation::new("a/spec.py", 3).with_column(2),
            SpecLocation::new("spec.py", 3).with_column(2).with_discriminator(7),
        ] {
            assert!(sloc.matches(&sloc));
        }
    }

    #[test]
    fn test_query_file_suffix() {
        let recorded = SpecLocation::new("lang/nodes/spec.py", 5);
        assert!(recorded.matches(&SpecLocation::new("spec.py", 5)));
        assert!(recorded.matches(&SpecLocation::new("nodes/spec.py", 5)));
        assert!(!recorded.matches(&SpecLocation::new("pec.py", 5)));
    }

    #[test]
    fn test_serde_as_string() {
        let sloc = SpecLocation::new("spec.py", 3).with_column(1);
        let json = serde_json::to_string(&sloc).unwrap();
        assert_eq!(json, "\"spec.py:3:1\"");
        let back: SpecLocation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sloc);
        assert!(serde_json::from_str::<SpecLocation>("\"nope\"").is_err());
    }
}
