//! Command Module
//!
//! The built-in commands of the shell and the context they run against.
//!
//! ## Architecture
//!
//! ```text
//! REPL line
//!       │
//!       ▼
//! ┌─────────────────┐
//! │ keyword parser  │  (repl module)
//! └────────┬────────┘
//!          │ emit(keyword, payload)
//!          ▼
//! ┌─────────────────┐
//! │ Dispatcher      │  (dispatch module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐      ┌─────────────────┐
//! │ handlers        │─────>│ CommandContext  │
//! │ help get list   │      │ store, quit,    │
//! │ count exit      │      │ output streams  │
//! └─────────────────┘      └─────────────────┘
//! ```

pub mod context;
pub mod handler;

pub use context::{CommandContext, Output};
pub use handler::{
    display, extract_key, nul_terminated, register_builtins, Command, CommandError,
};
