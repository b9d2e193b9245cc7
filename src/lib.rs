//! # sprepl - An Interactive Shell for an Embedded Ordered Key-Value Store
//!
//! sprepl lets an operator inspect a store directory without writing code:
//! look up a key, list every entry in key order, or count the entries.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                sprepl                                   │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │  Terminal   │───>│   Session   │───>│ Dispatcher  │                  │
//! │  │ (rustyline) │    │ (REPL loop) │    │ name -> [h] │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │         ▲                  │                  │                         │
//! │         │ history          │ owns             ▼                         │
//! │  ┌──────┴──────┐    ┌──────┴──────────────────────────────┐             │
//! │  │ .sprepl_    │    │          CommandContext             │             │
//! │  │  history    │    │  Store ──> Cursor   quit   out/err  │             │
//! │  └─────────────┘    └─────────────────────────────────────┘             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use sprepl::repl::{Session, SessionConfig, Terminal};
//! use sprepl::storage::StoreConfig;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut session = Session::open(SessionConfig::new(StoreConfig::new("./db")))?;
//!     let mut terminal = Terminal::new()?;
//!     session.run(&mut terminal)?;
//!     session.close();
//!     Ok(())
//! }
//! ```
//!
//! ## Commands
//!
//! - `help` - Display list of commands
//! - `get <key>` - Get the value of `key`
//! - `list` - List all keys
//! - `count` - Count all keys
//! - `exit` - Leave the shell
//!
//! ## Module Overview
//!
//! - [`storage`]: The embedded ordered store, its cursors and record log
//! - [`dispatch`]: Name-keyed handler registry
//! - [`commands`]: The built-in command handlers
//! - [`repl`]: Keyword parsing, input surface and the session loop
//!
//! ## Design Highlights
//!
//! ### Scoped Cursors
//!
//! A cursor borrows the store handle and is released when dropped. Every
//! exit path of a handler, including `?` returns, releases its cursor, and
//! the handle cannot be closed while a cursor is alive.
//!
//! ### Loose Keyword Matching
//!
//! Keywords match on a fixed-length prefix: `getfoo` runs `get`, and the
//! `get` handler reads its key from byte 4 of the raw line.

pub mod commands;
pub mod dispatch;
pub mod repl;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::{Command, CommandContext};
pub use dispatch::{DispatchError, Dispatcher, Payload};
pub use repl::{LineInput, ReplError, Session, SessionConfig, SetupError, Terminal};
pub use storage::{Cursor, OpenMode, Store, StoreConfig, StoreError};

/// The default database directory
pub const DEFAULT_DATABASE_PATH: &str = ".";

/// Version of sprepl
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
