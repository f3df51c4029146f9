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

//! Minimal parser for GDB/MI output records.
//!
//! Only what [`GdbMiHost`](super::GdbMiHost) needs is supported: result and async
//! records with their `name=value` payload, stream records and the prompt.

use std::{iter::Peekable, str::Chars};

use thiserror::Error;

/// Error raised on malformed MI output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed MI record ({reason}): {line}")]
pub struct MiParseError {
    reason: &'static str,
    line: String,
}

/// A value in an MI record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiValue {
    /// A C string.
    Const(String),
    /// `{name=value,...}`.
    Tuple(Vec<(String, MiValue)>),
    /// `[value,...]`, or `[name=value,...]` stored as single-entry tuples.
    List(Vec<MiValue>),
}

impl MiValue {
    /// Returns the field `key` of a tuple.
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Tuple(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Returns the string of a constant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Const(s) => Some(s),
            _ => None,
        }
    }
}

/// One line of MI output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiRecord {
    /// `[token]^class,results` - the answer to a command.
    Result {
        /// Token of the command this answers.
        token: Option<u32>,
        /// `done`, `running`, `connected`, `error` or `exit`.
        class: String,
        /// Payload, as a tuple.
        results: MiValue,
    },
    /// `[token]*class,...`, `+class,...` or `=class,...` - asynchronous notifications.
    Async {
        /// `*` (exec), `+` (status) or `=` (notify).
        kind: char,
        /// e.g. `stopped`, `running`, `breakpoint-modified`.
        class: String,
        /// Payload, as a tuple.
        results: MiValue,
    },
    /// `~"..."`, `@"..."` or `&"..."` - console, target and log output.
    Stream {
        /// `~`, `@` or `&`.
        kind: char,
        /// Unescaped text.
        text: String,
    },
    /// `(gdb)`, end of a batch of output.
    Prompt,
}

/// Parses one line of MI output.
pub fn parse_record(line: &str) -> Result<MiRecord, MiParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim() == "(gdb)" {
        return Ok(MiRecord::Prompt);
    }

    let mut parser = Parser { chars: line.chars().peekable(), line };

    let digits: String = std::iter::from_fn(|| parser.chars.next_if(char::is_ascii_digit)).collect();
    let token = if digits.is_empty() { None } else { digits.parse().ok() };

    match parser.chars.next() {
        Some('^') => {
            let (class, results) = parser.class_and_results()?;
            Ok(MiRecord::Result { token, class, results })
        }
        Some(kind @ ('*' | '+' | '=')) => {
            let (class, results) = parser.class_and_results()?;
            Ok(MiRecord::Async { kind, class, results })
        }
        Some(kind @ ('~' | '@' | '&')) => {
            let text = parser.c_string()?;
            Ok(MiRecord::Stream { kind, text })
        }
        _ => Err(parser.error("unknown record type")),
    }
}

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
    line: &'a str,
}

impl Parser<'_> {
    fn error(&self, reason: &'static str) -> MiParseError {
        MiParseError { reason, line: self.line.to_string() }
    }

    fn class_and_results(&mut self) -> Result<(String, MiValue), MiParseError> {
        let class = self.identifier();
        if class.is_empty() {
            return Err(self.error("missing record class"));
        }
        let mut fields = vec![];
        while self.chars.next_if_eq(&',').is_some() {
            fields.push(self.result()?);
        }
        if self.chars.peek().is_some() {
            return Err(self.error("trailing characters"));
        }
        Ok((class, MiValue::Tuple(fields)))
    }

    fn identifier(&mut self) -> String {
        std::iter::from_fn(|| self.chars.next_if(|c| c.is_alphanumeric() || matches!(*c, '-' | '_')))
            .collect()
    }

    fn result(&mut self) -> Result<(String, MiValue), MiParseError> {
        let name = self.identifier();
        if name.is_empty() || self.chars.next() != Some('=') {
            return Err(self.error("expected name=value"));
        }
        Ok((name, self.value()?))
    }

    fn value(&mut self) -> Result<MiValue, MiParseError> {
        match self.chars.peek() {
            Some('"') => Ok(MiValue::Const(self.c_string()?)),
            Some('{') => {
                self.chars.next();
                let mut fields = vec![];
                if self.chars.next_if_eq(&'}').is_none() {
                    loop {
                        fields.push(self.result()?);
                        match self.chars.next() {
                            Some(',') => continue,
                            Some('}') => break,
                            _ => return Err(self.error("unterminated tuple")),
                        }
                    }
                }
                Ok(MiValue::Tuple(fields))
            }
            Some('[') => {
                self.chars.next();
                let mut items = vec![];
                if self.chars.next_if_eq(&']').is_none() {
                    loop {
                        let item = if matches!(self.chars.peek(), Some('"' | '{' | '[')) {
                            self.value()?
                        } else {
                            MiValue::Tuple(vec![self.result()?])
                        };
                        items.push(item);
                        match self.chars.next() {
                            Some(',') => continue,
                            Some(']') => break,
                            _ => return Err(self.error("unterminated list")),
                        }
                    }
                }
                Ok(MiValue::List(items))
            }
            _ => Err(self.error("expected a value")),
        }
    }

    fn c_string(&mut self) -> Result<String, MiParseError> {
        if self.chars.next() != Some('"') {
            return Err(self.error("expected a string"));
        }
        let mut s = String::new();
        loop {
            match self.chars.next() {
                Some('"') => return Ok(s),
                Some('\\') => match self.chars.next() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('r') => s.push('\r'),
                    Some(c) => s.push(c),
                    None => return Err(self.error("unterminated string")),
                },
                Some(c) => s.push(c),
                None => return Err(self.error("unterminated string")),
            }
        }
    }
}

/// Quotes `s` as a C string for an MI command argument.
pub(super) fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            '\n' => quoted.push_str("\\n"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
