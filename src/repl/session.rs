//! REPL Session
//!
//! The session owns the dispatcher and the command context (store handle,
//! quit flag, output streams) and drives the read-dispatch loop.
//!
//! ## Loop
//!
//! ```text
//!        ┌───────────────────────────────────────────────┐
//!        ▼                                               │
//!   read line ──Eof──> stop                              │
//!        │                                               │
//!        ├── empty ──────────────────────────────────────┤
//!        ▼                                               │
//!   match keyword ──none──> "Unrecognized command"       │
//!        │                          │                    │
//!        ▼                          ▼                    │
//!   emit(keyword) ─────────> quit? ──no──> save history ─┘
//!                                  │
//!                                 yes──> "Goodbye :)" ──> stop
//! ```

use super::input::{LineInput, ReadLine};
use super::parser::parse_command;
use crate::commands::{register_builtins, Command, CommandContext};
use crate::dispatch::{DispatchError, Dispatcher, Payload};
use crate::storage::{Store, StoreConfig, StoreError};
use rustyline::error::ReadlineError;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default prompt.
pub const PROMPT: &str = "sophia> ";

/// Default history file, relative to the working directory.
pub const HISTORY_FILE: &str = ".sprepl_history";

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The store rejected its directory/mode/GC configuration
    #[error("Failed to configure store.\n{0}")]
    Configuration(StoreError),

    /// The store could not be opened
    #[error("{0}")]
    Open(StoreError),

    /// A built-in handler could not be registered
    #[error("Failed to register commands: {0}")]
    Dispatch(#[from] DispatchError),
}

impl From<StoreError> for SetupError {
    fn from(err: StoreError) -> Self {
        if matches!(err, StoreError::ConfigurationFailed(_)) {
            SetupError::Configuration(err)
        } else {
            SetupError::Open(err)
        }
    }
}

/// Errors that end a running session.
#[derive(Debug, Error)]
pub enum ReplError {
    /// The line editor failed
    #[error("line editor error: {0}")]
    Readline(#[from] ReadlineError),

    /// Writing to the output streams failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How to open the store
    pub store: StoreConfig,
    /// Where history is loaded from and saved to
    pub history_file: PathBuf,
    /// Prompt shown before each read
    pub prompt: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            history_file: PathBuf::from(HISTORY_FILE),
            prompt: PROMPT.to_string(),
        }
    }
}

impl SessionConfig {
    pub fn new(store: StoreConfig) -> Self {
        Self {
            store,
            ..Self::default()
        }
    }

    pub fn history_file(mut self, path: impl AsRef<Path>) -> Self {
        self.history_file = path.as_ref().to_path_buf();
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

/// What the session did with one input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// Blank line; nothing happened
    Empty,
    /// No keyword matched; a diagnostic was printed
    Unrecognized,
    /// The command was emitted on the dispatcher
    Dispatched(Command),
}

/// An interactive session over one store.
pub struct Session {
    config: SessionConfig,
    dispatcher: Dispatcher<CommandContext>,
    ctx: CommandContext,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .field("ctx", &self.ctx)
            .finish()
    }
}

impl Session {
    /// Opens the store and registers the built-in commands, writing output
    /// to stdout and stderr.
    pub fn open(config: SessionConfig) -> Result<Self, SetupError> {
        let store = Store::open(config.store.clone())?;
        Self::with_context(config, CommandContext::new(store))
    }

    /// Builds a session around an existing context.
    ///
    /// If registration fails the context is dropped, which closes its store.
    pub fn with_context(config: SessionConfig, ctx: CommandContext) -> Result<Self, SetupError> {
        let mut dispatcher = Dispatcher::new();
        register_builtins(&mut dispatcher)?;

        info!(
            database = %config.store.path.display(),
            history = %config.history_file.display(),
            "Session ready"
        );

        Ok(Self {
            config,
            dispatcher,
            ctx,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn context(&self) -> &CommandContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut CommandContext {
        &mut self.ctx
    }

    /// The dispatcher, for registering extra handlers.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher<CommandContext> {
        &mut self.dispatcher
    }

    pub fn quit_requested(&self) -> bool {
        self.ctx.quit_requested()
    }

    /// Matches one input line and emits the command it names.
    pub fn process_line(&mut self, line: &str) -> Result<LineOutcome, ReplError> {
        if line.trim().is_empty() {
            return Ok(LineOutcome::Empty);
        }

        let Some(command) = parse_command(line) else {
            debug!(line, "Unrecognized command");
            self.ctx.eprint(format_args!("Unrecognized command '{}'", line))?;
            return Ok(LineOutcome::Unrecognized);
        };

        let payload = if command.takes_line() {
            Payload::Line(line)
        } else {
            Payload::Empty
        };
        self.dispatcher.emit(command.keyword(), &mut self.ctx, payload);

        Ok(LineOutcome::Dispatched(command))
    }

    /// Runs the loop until `exit` or end of input.
    pub fn run<I: LineInput>(&mut self, input: &mut I) -> Result<(), ReplError> {
        let history = self.config.history_file.clone();
        if let Err(e) = input.load_history(&history) {
            warn!(path = %history.display(), error = %e, "Failed to load history");
        }

        while !self.quit_requested() {
            let line = match input.read_line(&self.config.prompt)? {
                ReadLine::Line(line) => line,
                ReadLine::Interrupted => continue,
                ReadLine::Eof => {
                    debug!("End of input");
                    break;
                }
            };

            if self.process_line(&line)? == LineOutcome::Empty {
                continue;
            }

            if self.quit_requested() {
                self.ctx.print("Goodbye :)")?;
                break;
            }

            record_history(input, &line, &history);
            self.ctx.flush()?;
        }

        self.ctx.flush()?;
        Ok(())
    }

    /// Ends the session, closing the store.
    pub fn close(self) {
        let mut store = self.ctx.into_store();
        store.close();
        info!("Session closed");
    }
}

fn record_history<I: LineInput>(input: &mut I, line: &str, path: &Path) {
    let result = input
        .add_history(line)
        .and_then(|()| input.save_history(path));
    if let Err(e) = result {
        warn!(path = %path.display(), error = %e, "Failed to persist history");
    }
}
