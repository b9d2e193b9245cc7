//! Input Surface
//!
//! The REPL reads lines through the [`LineInput`] trait. [`Terminal`] is the
//! interactive implementation, built on `rustyline` with file-backed history
//! and keyword completion.

use super::parser::complete_keyword;
use super::session::ReplError;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, Editor, Helper};
use std::io::ErrorKind;
use std::path::Path;

/// The result of one read from the input surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadLine {
    /// A complete line, without its newline
    Line(String),
    /// The read was interrupted (Ctrl-C); the partial line is discarded
    Interrupted,
    /// No more input
    Eof,
}

/// A source of input lines with history.
pub trait LineInput {
    /// Shows `prompt` and blocks until a line is available or input ends.
    fn read_line(&mut self, prompt: &str) -> Result<ReadLine, ReplError>;

    /// Appends `line` to the in-memory history.
    fn add_history(&mut self, line: &str) -> Result<(), ReplError>;

    /// Loads history from `path`. A missing file leaves history empty.
    fn load_history(&mut self, path: &Path) -> Result<(), ReplError>;

    /// Writes the full history to `path`.
    fn save_history(&mut self, path: &Path) -> Result<(), ReplError>;
}

/// Treats a missing history file as empty history.
pub(crate) fn ignore_missing(result: rustyline::Result<()>) -> Result<(), ReplError> {
    match result {
        Err(ReadlineError::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => Ok(other?),
    }
}

/// Interactive terminal input.
pub struct Terminal {
    editor: Editor<KeywordHelper, DefaultHistory>,
}

impl Terminal {
    /// Creates a line editor with keyword completion installed.
    pub fn new() -> Result<Self, ReplError> {
        let config = Config::builder()
            .completion_type(CompletionType::List)
            .auto_add_history(false)
            .build();

        let mut editor: Editor<KeywordHelper, DefaultHistory> = Editor::with_config(config)?;
        editor.set_helper(Some(KeywordHelper));
        Ok(Self { editor })
    }
}

impl LineInput for Terminal {
    fn read_line(&mut self, prompt: &str) -> Result<ReadLine, ReplError> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadLine::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadLine::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadLine::Eof),
            Err(e) => Err(e.into()),
        }
    }

    fn add_history(&mut self, line: &str) -> Result<(), ReplError> {
        self.editor.add_history_entry(line)?;
        Ok(())
    }

    fn load_history(&mut self, path: &Path) -> Result<(), ReplError> {
        ignore_missing(self.editor.load_history(path))
    }

    fn save_history(&mut self, path: &Path) -> Result<(), ReplError> {
        self.editor.save_history(path)?;
        Ok(())
    }
}

/// Completes the command keyword from the first typed character.
pub struct KeywordHelper;

impl Helper for KeywordHelper {}
impl Validator for KeywordHelper {}
impl Highlighter for KeywordHelper {}
impl Hinter for KeywordHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Completer for KeywordHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        // the suggestion replaces the whole buffer
        let candidates = complete_keyword(&line[..pos])
            .into_iter()
            .map(|keyword| Pair {
                display: keyword.to_string(),
                replacement: keyword.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}
