//! Storage Module
//!
//! This module provides the embedded ordered key-value store the shell
//! inspects: a store handle with point lookups, and forward cursors over
//! the keyspace.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Store                               │
//! │  ┌───────────────────┐        ┌──────────────────────────┐  │
//! │  │ BTreeMap (memory) │<─replay│ sophia.log (record log)  │  │
//! │  └─────────┬─────────┘        └──────────────────────────┘  │
//! │            │ borrow                        ▲                │
//! │            ▼                               │ compact (gc)   │
//! │  ┌───────────────────┐                     │                │
//! │  │ Cursor<'store>    │           ┌─────────┴──────────┐     │
//! │  └───────────────────┘           │ open (read-write)  │     │
//! │                                  └────────────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use sprepl::storage::{OpenMode, Store, StoreConfig};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let mut store = Store::open(
//!     StoreConfig::new(dir.path()).mode(OpenMode::ReadWriteCreate),
//! ).unwrap();
//!
//! store.put("b", "2").unwrap();
//! store.put("a", "1").unwrap();
//!
//! let keys: Vec<_> = store.cursor(None).unwrap().map(|(k, _)| k).collect();
//! assert_eq!(keys, ["a", "b"]);
//! ```

pub mod config;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod gc;
pub mod log;

pub use config::{OpenMode, StoreConfig};
pub use cursor::Cursor;
pub use engine::{Store, StoreStats, LOCK_FILE};
pub use error::{StoreError, StoreResult};
pub use log::LOG_FILE;
