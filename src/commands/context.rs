//! Command Context
//!
//! The state every handler runs against: the store handle, the quit flag,
//! and the output streams. It is built once at startup and owned by the
//! REPL session.

use crate::storage::Store;
use std::fmt;
use std::io::{self, Write};

/// The regular and diagnostic output streams.
///
/// Kept apart from the store so a handler can print while a cursor borrows
/// the store.
pub struct Output {
    out: Box<dyn Write>,
    err: Box<dyn Write>,
}

impl Output {
    pub fn new(out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        Self { out, err }
    }

    /// Writes a line to the regular output stream.
    pub fn print(&mut self, line: impl fmt::Display) -> io::Result<()> {
        writeln!(self.out, "{}", line)
    }

    /// Writes a line to the diagnostic stream.
    pub fn eprint(&mut self, line: impl fmt::Display) -> io::Result<()> {
        writeln!(self.err, "{}", line)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()?;
        self.err.flush()
    }
}

/// Shared state passed to every command handler.
pub struct CommandContext {
    pub(crate) store: Store,
    pub(crate) quit: bool,
    pub(crate) output: Output,
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("store", &self.store)
            .field("quit", &self.quit)
            .finish()
    }
}

impl CommandContext {
    /// Creates a context that writes to stdout and stderr.
    pub fn new(store: Store) -> Self {
        Self::with_output(store, Box::new(io::stdout()), Box::new(io::stderr()))
    }

    /// Creates a context with explicit output streams.
    pub fn with_output(store: Store, out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        Self {
            store,
            quit: false,
            output: Output::new(out, err),
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store {
        &mut self.store
    }

    /// Returns true once a handler has asked the session to end.
    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    pub fn request_quit(&mut self) {
        self.quit = true;
    }

    /// Writes a line to the regular output stream.
    pub fn print(&mut self, line: impl fmt::Display) -> io::Result<()> {
        self.output.print(line)
    }

    /// Writes a line to the diagnostic stream.
    pub fn eprint(&mut self, line: impl fmt::Display) -> io::Result<()> {
        self.output.eprint(line)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }

    /// Consumes the context, returning the store handle.
    pub fn into_store(self) -> Store {
        self.store
    }
}

/// An in-memory writer whose contents stay readable after being boxed.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct SharedBuffer(std::rc::Rc<std::cell::RefCell<Vec<u8>>>);

#[cfg(test)]
impl SharedBuffer {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    pub(crate) fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

#[cfg(test)]
impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
