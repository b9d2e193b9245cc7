//! Command Dispatch
//!
//! A name-keyed registry of handlers. The REPL decides which names are valid;
//! the dispatcher only maps a name to the handlers registered under it and
//! runs them in order.
//!
//! ```text
//!   emit("get", ctx, payload)
//!          │
//!          ▼
//!   ┌──────────────┐     ┌──────────┬──────────┬─────┐
//!   │ "get"        │────>│ handler0 │ handler1 │ ... │   (registration order)
//!   │ "list"       │──┐  └──────────┴──────────┴─────┘
//!   │ ...          │  └─>┌──────────┐
//!   └──────────────┘     │ handler0 │
//!                        └──────────┘
//! ```

pub mod emitter;

pub use emitter::{DispatchError, Dispatcher, Handler, Payload};
