//! Built-in Command Handlers
//!
//! Each handler is a plain function registered on the dispatcher under its
//! keyword. Handlers never fail the session: errors are printed and the
//! handler returns.
//!
//! ## Commands
//!
//! - `help` - Display list of commands
//! - `get <key>` - Get the value of `key`
//! - `list` - List all keys
//! - `count` - Count all keys
//! - `exit` - Leave the shell

use super::context::CommandContext;
use crate::dispatch::{DispatchError, Dispatcher, Payload};
use crate::storage::StoreError;
use bytes::Bytes;
use std::borrow::Cow;
use std::io;
use thiserror::Error;
use tracing::{debug, warn};

/// Byte offset of the key in a `get` line: the keyword plus one separator.
const GET_ARG_OFFSET: usize = 4;

/// The built-in commands, in the order input lines are matched against them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Help,
    Get,
    Exit,
    List,
    Count,
}

impl Command {
    /// Every built-in command, in match priority order.
    pub const ALL: [Command; 5] = [
        Command::Help,
        Command::Get,
        Command::Exit,
        Command::List,
        Command::Count,
    ];

    /// The literal keyword typed at the prompt.
    pub fn keyword(self) -> &'static str {
        match self {
            Command::Help => "help",
            Command::Get => "get",
            Command::Exit => "exit",
            Command::List => "list",
            Command::Count => "count",
        }
    }

    /// One-line description shown by `help`.
    pub fn usage(self) -> (&'static str, &'static str) {
        match self {
            Command::Help => ("help", "Display list of commands"),
            Command::Get => ("get <key>", "Get the value of `key`"),
            Command::List => ("list", "List all keys"),
            Command::Count => ("count", "Count all keys"),
            Command::Exit => ("exit", "Close the database and exit"),
        }
    }

    /// Whether the handler needs the raw input line as its payload.
    pub fn takes_line(self) -> bool {
        matches!(self, Command::Get)
    }

    fn handler(self) -> fn(&mut CommandContext, Payload<'_>) {
        match self {
            Command::Help => on_help,
            Command::Get => on_get,
            Command::Exit => on_exit,
            Command::List => on_list,
            Command::Count => on_count,
        }
    }
}

/// Registers one handler per built-in command.
pub fn register_builtins(
    dispatcher: &mut Dispatcher<CommandContext>,
) -> Result<(), DispatchError> {
    for command in Command::ALL {
        dispatcher.register(command.keyword(), command.handler())?;
    }
    Ok(())
}

/// Errors a handler can hit while running.
#[derive(Debug, Error)]
pub enum CommandError {
    /// `get` was typed without a key
    #[error("Key required.")]
    KeyRequired,

    /// A cursor could not be opened
    #[error("Failed to create Sophia cursor.\n{0}")]
    CursorFailed(StoreError),

    /// Any other store failure, shown verbatim
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Writing output failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Prints a handler error where the operator expects to see it.
fn report(ctx: &mut CommandContext, command: Command, err: CommandError) {
    let written = match &err {
        CommandError::KeyRequired => ctx.print(format_args!("  {}", err)),
        CommandError::CursorFailed(_) | CommandError::Store(_) => ctx.eprint(&err),
        CommandError::Io(_) => {
            warn!(command = command.keyword(), error = %err, "Failed to write command output");
            return;
        }
    };

    if let Err(e) = written {
        warn!(command = command.keyword(), error = %e, "Failed to report command error");
    }
}

fn run(
    ctx: &mut CommandContext,
    command: Command,
    result: impl FnOnce(&mut CommandContext) -> Result<(), CommandError>,
) {
    debug!(command = command.keyword(), "Running command");
    if let Err(err) = result(ctx) {
        report(ctx, command, err);
    }
}

fn on_help(ctx: &mut CommandContext, _payload: Payload<'_>) {
    run(ctx, Command::Help, help);
}

fn on_get(ctx: &mut CommandContext, payload: Payload<'_>) {
    run(ctx, Command::Get, |ctx| get(ctx, payload));
}

fn on_exit(ctx: &mut CommandContext, _payload: Payload<'_>) {
    // the store stays open until the session shuts down
    ctx.request_quit();
}

fn on_list(ctx: &mut CommandContext, _payload: Payload<'_>) {
    run(ctx, Command::List, list);
}

fn on_count(ctx: &mut CommandContext, _payload: Payload<'_>) {
    run(ctx, Command::Count, count);
}

fn help(ctx: &mut CommandContext) -> Result<(), CommandError> {
    ctx.print("")?;
    ctx.print("  Commands:")?;
    ctx.print("")?;
    for command in [
        Command::Help,
        Command::Get,
        Command::List,
        Command::Count,
        Command::Exit,
    ] {
        let (synopsis, description) = command.usage();
        ctx.print(format_args!("    {:<11}{}", synopsis, description))?;
    }
    ctx.print("")?;
    Ok(())
}

fn get(ctx: &mut CommandContext, payload: Payload<'_>) -> Result<(), CommandError> {
    let key = payload
        .line()
        .and_then(extract_key)
        .ok_or(CommandError::KeyRequired)?;

    let value = ctx.store.get(&nul_terminated(key))?;
    let key = display(key);
    match value {
        Some(value) => ctx.print(format_args!("{} => {}", key, display(&value)))?,
        None => ctx.print(format_args!("{} => null", key))?,
    }
    Ok(())
}

fn count(ctx: &mut CommandContext) -> Result<(), CommandError> {
    let mut cursor = ctx.store.cursor(None).map_err(CommandError::CursorFailed)?;

    let mut count = 0u64;
    while let Some((key, _)) = cursor.fetch() {
        if !key.is_empty() {
            count += 1;
        }
    }
    cursor.release();

    ctx.print(count)?;
    Ok(())
}

fn list(ctx: &mut CommandContext) -> Result<(), CommandError> {
    let cursor = ctx.store.cursor(None).map_err(CommandError::CursorFailed)?;

    // an output error returns early and drops (releases) the cursor
    for (key, value) in cursor {
        ctx.output
            .print(format_args!("{} => {}", display(&key), display(&value)))?;
    }
    Ok(())
}

/// Extracts the key from a raw `get` line: everything after the keyword and
/// its separator. Returns `None` when nothing follows.
pub fn extract_key(line: &str) -> Option<&[u8]> {
    line.as_bytes()
        .get(GET_ARG_OFFSET..)
        .filter(|key| !key.is_empty())
}

/// Appends the NUL terminator stored keys and values carry.
pub fn nul_terminated(bytes: &[u8]) -> Bytes {
    let mut buf = Vec::with_capacity(bytes.len() + 1);
    buf.extend_from_slice(bytes);
    buf.push(0);
    Bytes::from(buf)
}

/// Renders a stored key or value as text, dropping one trailing NUL.
pub fn display(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_suffix(b"\0").unwrap_or(bytes);
    String::from_utf8_lossy(bytes)
}
