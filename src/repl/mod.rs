//! REPL Module
//!
//! Connects the input surface, the dispatcher and the store into an
//! interactive loop.
//!
//! - [`parser`]: keyword matching and completion
//! - [`input`]: the input surface trait and its terminal implementation
//! - [`session`]: the session that owns the store and runs the loop

pub mod input;
pub mod parser;
pub mod session;

pub use input::{KeywordHelper, LineInput, ReadLine, Terminal};
pub use parser::{complete_keyword, parse_command};
pub use session::{
    LineOutcome, ReplError, Session, SessionConfig, SetupError, HISTORY_FILE, PROMPT,
};
