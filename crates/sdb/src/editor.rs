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

//! Terminal line editing: history, and Tab completion of property names after `break`.

use std::io::{self, Stdout, Write};

use rustyline::{
    completion::Completer, error::ReadlineError, highlight::Highlighter, hint::Hinter,
    history::DefaultHistory, validate::Validator, Context, Editor, Helper,
};
use sdb_engine::{Commands, Interaction};
use tracing::warn;

/// Returns where the word to complete starts in `line`, and the candidates for it.
///
/// Only the specification argument of `<prefix>break` is completed.
pub fn complete_line(commands: &Commands, line: &str) -> (usize, Vec<String>) {
    let none = (line.len(), vec![]);
    let Some(rest) = line
        .trim_start()
        .strip_prefix(commands.prefix())
        .and_then(|rest| rest.strip_prefix("break"))
    else {
        return none;
    };
    if !rest.starts_with(char::is_whitespace) {
        return none;
    }
    let word = rest.trim_start();
    if word.contains(char::is_whitespace) {
        return none;
    }
    (line.len() - word.len(), commands.complete_break(word))
}

/// Completion hooks of the SDB line editor.
#[derive(Debug)]
pub struct SdbHelper {
    commands: Commands,
}

impl Completer for SdbHelper {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        Ok(complete_line(&self.commands, &line[..pos]))
    }
}

impl Hinter for SdbHelper {
    type Hint = String;
}

impl Highlighter for SdbHelper {}

impl Validator for SdbHelper {}

impl Helper for SdbHelper {}

/// [`Interaction`] over the terminal.
///
/// Interrupting a read with Ctrl-C surfaces as an [`io::ErrorKind::Interrupted`] error.
pub struct LineEditor {
    editor: Editor<SdbHelper, DefaultHistory>,
    output: Stdout,
}

impl LineEditor {
    /// Creates an editor completing the commands of `commands`.
    pub fn new(commands: Commands) -> rustyline::Result<Self> {
        let mut editor = Editor::new()?;
        editor.set_helper(Some(SdbHelper { commands }));
        Ok(Self { editor, output: io::stdout() })
    }
}

impl Interaction for LineEditor {
    fn output(&mut self) -> &mut dyn Write {
        &mut self.output
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        self.output.flush()?;
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    if let Err(err) = self.editor.add_history_entry(line.as_str()) {
                        warn!("Failed to record history: {err}");
                    }
                }
                Ok(Some(line))
            }
            Err(ReadlineError::Eof) => Ok(None),
            Err(ReadlineError::Interrupted) => Err(io::ErrorKind::Interrupted.into()),
            Err(ReadlineError::Io(err)) => Err(err),
            Err(err) => Err(io::Error::other(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sdb_common::DebugInfo;

    use super::*;

    fn commands(prefix: &str) -> Commands {
        let info = DebugInfo::from_json_str(
            r#"{
                "filename": "gen.adb",
                "properties": [
                    {"name": "Foo.p_a", "lines": {"first": 1, "last": 9}},
                    {"name": "Foo.p_b", "lines": {"first": 10, "last": 12}},
                    {"name": "[dispatcher]Foo.p_a", "lines": {"first": 13, "last": 14}}
                ]
            }"#,
        )
        .unwrap();
        Commands::new(prefix, Arc::new(info))
    }

    #[test]
    fn test_complete_break_argument() {
        let commands = commands("");
        assert_eq!(
            complete_line(&commands, "break foo.p"),
            (6, vec!["Foo.p_a".to_string(), "Foo.p_b".to_string()])
        );
        assert_eq!(complete_line(&commands, "  break   Foo.p_b"), (10, vec!["Foo.p_b".to_string()]));
        assert_eq!(
            complete_line(&commands, "break ["),
            (6, vec!["[dispatcher]Foo.p_a".to_string()])
        );
        assert_eq!(complete_line(&commands, "break ").1.len(), 2);
    }

    #[test]
    fn test_no_completion_elsewhere() {
        let commands = commands("");
        assert_eq!(complete_line(&commands, "break"), (5, vec![]));
        assert_eq!(complete_line(&commands, "breakfoo"), (8, vec![]));
        assert_eq!(complete_line(&commands, "state foo"), (9, vec![]));
        assert_eq!(complete_line(&commands, "break Foo.p_a if x"), (18, vec![]));
    }

    #[test]
    fn test_complete_with_prefix() {
        let commands = commands("sdb-");
        assert_eq!(complete_line(&commands, "sdb-break Foo.p_b"), (10, vec!["Foo.p_b".to_string()]));
        assert_eq!(complete_line(&commands, "break Foo"), (9, vec![]));
    }
}
