//! Forward Cursor
//!
//! A cursor walks the store's keyspace in ascending key order, starting
//! strictly after an optional lower bound.
//!
//! ## State Machine
//!
//! ```text
//!   Created ──fetch──> Positioned ──fetch──> ... ──fetch──> Exhausted
//!      │                   │                                    │
//!      └───────────────────┴──────────── drop / release ────────┴──> Released
//! ```
//!
//! `Exhausted` is terminal: every further [`fetch`](Cursor::fetch) returns
//! `None`. Release happens exactly once, when the cursor is dropped or passed
//! to [`release`](Cursor::release); both consume the value, so a released
//! cursor cannot be used again.

use super::engine::Store;
use bytes::Bytes;
use std::ops::Bound;

#[derive(Debug, Clone, PartialEq, Eq)]
enum CursorState {
    /// Nothing fetched yet; the next entry is the first key after `lower`
    Created { lower: Option<Bytes> },
    /// The last key returned
    Positioned(Bytes),
    Exhausted,
}

/// A forward iterator over a [`Store`].
///
/// The cursor re-seeks from its last returned key on every fetch, so it
/// holds no borrow into the map between calls.
#[derive(Debug)]
pub struct Cursor<'a> {
    store: &'a Store,
    id: u64,
    state: CursorState,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(store: &'a Store, id: u64, lower: Option<Bytes>) -> Self {
        Self {
            store,
            id,
            state: CursorState::Created { lower },
        }
    }

    /// Advances and returns the next entry, or `None` once exhausted.
    pub fn fetch(&mut self) -> Option<(Bytes, Bytes)> {
        let entries = self.store.entries();

        let next = match &self.state {
            CursorState::Exhausted => return None,
            CursorState::Created { lower: None } => entries.iter().next(),
            CursorState::Created { lower: Some(lower) } => entries
                .range::<[u8], _>((Bound::Excluded(lower.as_ref()), Bound::Unbounded))
                .next(),
            CursorState::Positioned(last) => entries
                .range::<[u8], _>((Bound::Excluded(last.as_ref()), Bound::Unbounded))
                .next(),
        };

        match next {
            Some((key, value)) => {
                let entry = (key.clone(), value.clone());
                self.state = CursorState::Positioned(key.clone());
                Some(entry)
            }
            None => {
                self.state = CursorState::Exhausted;
                None
            }
        }
    }

    /// Returns true once the cursor has run past the last key.
    pub fn is_exhausted(&self) -> bool {
        self.state == CursorState::Exhausted
    }

    /// Releases the cursor. Equivalent to dropping it.
    pub fn release(self) {}
}

impl Iterator for Cursor<'_> {
    type Item = (Bytes, Bytes);

    fn next(&mut self) -> Option<Self::Item> {
        self.fetch()
    }
}

impl Drop for Cursor<'_> {
    fn drop(&mut self) {
        self.store.cursor_released(self.id);
    }
}
