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

//! The debug-metadata index embedded in generated programs.
//!
//! The generator annotates its output with markers that relate generated-code lines to
//! specification-level constructs. Once parsed, these markers form a [`DebugInfo`]
//! index: a list of [`Property`] entries, each being the outermost [`Scope`] of a tree
//! of nested scopes and expression-evaluation markers.
//!
//! The index is built once per debugging session and never mutated afterwards. It is
//! meant to be shared behind an [`Arc`](std::sync::Arc).

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use eyre::{bail, Result, WrapErr};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::SpecLocation;

/// An inclusive range of generated-code lines.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[display("{first}-{last}")]
pub struct LineRange {
    /// First line of the range.
    pub first: usize,
    /// Last line of the range (inclusive).
    pub last: usize,
}

impl LineRange {
    /// Creates a new line range.
    pub fn new(first: usize, last: usize) -> Self {
        Self { first, last }
    }

    /// Returns whether `line` lies within this range.
    pub fn contains(&self, line: usize) -> bool {
        self.first <= line && line <= self.last
    }

    /// Returns whether `other` is entirely nested in this range.
    pub fn encloses(&self, other: &Self) -> bool {
        self.first <= other.first && other.last <= self.last
    }
}

/// A specification-level variable visible in a [`Scope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    /// Name of the variable in the specification.
    pub dsl_name: String,
    /// Name of the generated-code variable holding its value.
    pub gen_name: String,
    /// Generated-code line where the variable gets bound.
    pub line_no: usize,
}

/// Marker for the beginning of the evaluation of a specification-level expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExprStart {
    /// Identifier shared with the matching [`ExprDone`].
    pub expr_id: usize,
    /// Human readable image of the expression.
    pub repr: String,
    /// Generated-code variable that holds the result once evaluated.
    pub result_var: String,
    /// Where the expression comes from in the specification.
    #[serde(default)]
    pub dsl_sloc: Option<SpecLocation>,
    /// Generated-code line of the marker.
    pub line_no: usize,
}

/// Marker for the end of the evaluation of a specification-level expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExprDone {
    /// Identifier of the matching [`ExprStart`].
    pub expr_id: usize,
    /// Generated-code line of the marker.
    pub line_no: usize,
}

/// Expression evaluation markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::From)]
#[serde(rename_all = "snake_case")]
pub enum ExprEvent {
    /// The expression starts being evaluated.
    Start(ExprStart),
    /// The expression has been evaluated.
    Done(ExprDone),
}

impl ExprEvent {
    /// Returns the identifier of the expression this marker belongs to.
    pub fn expr_id(&self) -> usize {
        match self {
            Self::Start(e) => e.expr_id,
            Self::Done(e) => e.expr_id,
        }
    }

    /// Returns the generated-code line of this marker.
    pub fn line_no(&self) -> usize {
        match self {
            Self::Start(e) => e.line_no,
            Self::Done(e) => e.line_no,
        }
    }
}

/// Something that happens, in order, inside a [`Scope`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::From)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    /// A nested scope.
    Scope(Scope),
    /// An expression evaluation marker.
    Expr(ExprEvent),
}

/// A lexical nesting level in generated code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// Generated-code lines covered by this scope.
    pub lines: LineRange,
    /// Variables bound in this scope, in declaration order.
    #[serde(default)]
    pub bindings: Vec<Binding>,
    /// Events, in generated-code order.
    #[serde(default)]
    pub events: Vec<Event>,
}

impl Scope {
    /// Returns the first nested scope, if any.
    pub fn first_subscope(&self) -> Option<&Self> {
        self.events.iter().find_map(|e| match e {
            Event::Scope(s) => Some(s),
            Event::Expr(_) => None,
        })
    }

    /// Calls `f` on every expression start marker of this scope and its nested scopes,
    /// in generated-code order.
    pub fn for_each_expr_start<'a>(&'a self, f: &mut impl FnMut(&'a ExprStart)) {
        for event in &self.events {
            match event {
                Event::Scope(s) => s.for_each_expr_start(f),
                Event::Expr(ExprEvent::Start(e)) => f(e),
                Event::Expr(ExprEvent::Done(_)) => {}
            }
        }
    }

    fn validate(&self, owner: &str) -> Result<()> {
        if self.lines.first > self.lines.last {
            bail!("scope {} of {owner} has an empty line range", self.lines);
        }
        for event in &self.events {
            match event {
                Event::Scope(s) => {
                    if !self.lines.encloses(&s.lines) {
                        bail!("scope {} of {owner} escapes its parent {}", s.lines, self.lines);
                    }
                    s.validate(owner)?;
                }
                Event::Expr(e) => {
                    if !self.lines.contains(e.line_no()) {
                        bail!(
                            "expression marker at line {} of {owner} lies outside scope {}",
                            e.line_no(),
                            self.lines
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

/// A named unit of specification-level executable logic.
///
/// A property is itself the outermost scope of its generated body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::Deref)]
pub struct Property {
    /// Qualified name, e.g. `FooNode.p_resolve`. Special properties generated by the
    /// compiler (dispatchers, wrappers) are named `[kind]Qualified.name`.
    pub name: String,
    /// Declaration location in the specification.
    #[serde(default)]
    pub dsl_sloc: Option<SpecLocation>,
    /// Generated-code lines where a memoized result is returned without evaluation.
    #[serde(default)]
    pub memoization_lookup: Option<LineRange>,
    /// The outermost scope: the generated body of the property.
    #[deref]
    #[serde(flatten)]
    pub scope: Scope,
}

impl Property {
    /// Prefix of the name of properties that only dispatch to other properties.
    pub const DISPATCHER_PREFIX: &'static str = "[dispatcher]";

    /// Returns the generated-code line where the body of this property starts.
    ///
    /// This is the first line of the first nested scope, so that the prologue (argument
    /// and local variable setup) is skipped. Properties without executable code (e.g.
    /// abstract or external ones) have no body start.
    pub fn body_start(&self) -> Option<usize> {
        self.scope.first_subscope().map(|s| s.lines.first)
    }

    /// Returns whether this is a compiler-generated property, as opposed to one written
    /// in the specification.
    pub fn is_special(&self) -> bool {
        self.name.starts_with('[')
    }

    /// Returns whether this property only dispatches to other properties.
    pub fn is_dispatcher(&self) -> bool {
        self.name.starts_with(Self::DISPATCHER_PREFIX)
    }
}

#[derive(Deserialize)]
struct RawDebugInfo {
    filename: PathBuf,
    #[serde(default)]
    properties: Vec<Property>,
}

/// Index of all specification-level constructs of a generated program.
#[derive(Debug, Clone, Serialize)]
pub struct DebugInfo {
    /// Generated source file the line numbers refer to.
    pub filename: PathBuf,
    /// All properties, in generated-code order.
    pub properties: Vec<Property>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
}

impl DebugInfo {
    /// Builds the index, checking that property names are unique (case-insensitively)
    /// and that scopes are well nested.
    pub fn new(filename: impl Into<PathBuf>, properties: Vec<Property>) -> Result<Self> {
        let mut by_name = HashMap::with_capacity(properties.len());
        for (i, prop) in properties.iter().enumerate() {
            if by_name.insert(prop.name.to_lowercase(), i).is_some() {
                bail!("duplicate property name in debug info: {}", prop.name);
            }
            prop.scope.validate(&prop.name)?;
            if let Some(lookup) = prop.memoization_lookup {
                if !prop.lines.encloses(&lookup) {
                    bail!("memoization lookup {lookup} of {} is outside its body", prop.name);
                }
            }
        }

        Ok(Self { filename: filename.into(), properties, by_name })
    }

    /// Parses an index from its JSON representation.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let raw: RawDebugInfo = serde_json::from_str(s).wrap_err("malformed debug info")?;
        Self::new(raw.filename, raw.properties)
    }

    /// Loads an index from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read debug info: {}", path.display()))?;
        let info = Self::from_json_str(&content)
            .wrap_err_with(|| format!("failed to load debug info: {}", path.display()))?;
        debug!(
            path = %path.display(),
            properties = info.properties.len(),
            "Loaded debug info"
        );
        Ok(info)
    }

    /// Returns the property whose qualified name is `name`, ignoring case.
    pub fn lookup_by_name(&self, name: &str) -> Option<&Property> {
        self.by_name.get(&name.to_lowercase()).map(|&i| &self.properties[i])
    }

    /// Returns the property whose generated body contains `line`, if any.
    pub fn lookup_by_line(&self, line: usize) -> Option<&Property> {
        self.properties.iter().find(|p| p.lines.contains(line))
    }

    /// Returns whether `path` designates the generated source file of this index.
    pub fn is_generated_file(&self, path: &Path) -> bool {
        path == self.filename || path.ends_with(&self.filename) || self.filename.ends_with(path)
    }
}
