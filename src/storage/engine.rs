//! Embedded Ordered Store
//!
//! This module implements the store the shell inspects: an ordered
//! key-value map kept in memory and persisted to an append-only record log
//! inside the database directory.
//!
//! ## Design Decisions
//!
//! 1. **Ordered Map**: Entries live in a `BTreeMap`, so cursors walk keys in
//!    ascending byte order without sorting.
//! 2. **Replay on Open**: The record log is replayed in full at open; the
//!    latest record for a key wins.
//! 3. **Single Writer**: Read-write opens take an exclusive lock file in the
//!    directory. Read-only opens take no lock.
//! 4. **Borrowed Cursors**: A [`Cursor`] borrows the handle, so a handle can
//!    never be closed or dropped while a cursor derived from it is alive.
//!
//! ## Directory Layout
//!
//! ```text
//! <database>/
//! ├── sophia.log    record log (see `log` module)
//! └── sophia.lock   present while a read-write handle is open
//! ```

use super::config::{OpenMode, StoreConfig};
use super::cursor::Cursor;
use super::error::{StoreError, StoreResult};
use super::gc;
use super::log::{self, Record, LOG_FILE};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, trace, warn};

/// Lock file name inside the database directory.
pub const LOCK_FILE: &str = "sophia.lock";

/// A handle to an open store.
///
/// # Example
///
/// ```
/// use sprepl::storage::{OpenMode, Store, StoreConfig};
///
/// let dir = tempfile::tempdir().unwrap();
/// let config = StoreConfig::new(dir.path()).mode(OpenMode::ReadWriteCreate);
/// let mut store = Store::open(config).unwrap();
///
/// store.put("name", "Ariz").unwrap();
/// assert_eq!(store.get(b"name").unwrap(), Some(bytes::Bytes::from("Ariz")));
///
/// store.close();
/// ```
pub struct Store {
    config: StoreConfig,

    /// Live entries in key order
    entries: BTreeMap<Bytes, Bytes>,

    /// Append handle for the record log (read-write mode only)
    log: Option<File>,

    /// Lock file to remove on close (read-write mode only)
    lock_path: Option<PathBuf>,

    closed: bool,

    /// Statistics: point lookups served
    lookup_count: AtomicU64,

    /// Statistics: cursors created
    cursors_opened: AtomicU64,

    /// Statistics: cursors released
    cursors_released: AtomicU64,

    /// Statistics: records replayed at open
    records_replayed: u64,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.config.path)
            .field("mode", &self.config.mode)
            .field("keys", &self.entries.len())
            .field("closed", &self.closed)
            .finish()
    }
}

impl Store {
    /// Opens the store described by `config`.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ConfigurationFailed`] if the path is not a directory,
    ///   or is missing in read-only mode, or cannot be created
    /// - [`StoreError::OpenFailed`] if the lock is held, the log cannot be
    ///   read, or the log is corrupted
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        prepare_directory(&config.path, config.mode)?;

        let mut store = Self {
            config,
            entries: BTreeMap::new(),
            log: None,
            lock_path: None,
            closed: false,
            lookup_count: AtomicU64::new(0),
            cursors_opened: AtomicU64::new(0),
            cursors_released: AtomicU64::new(0),
            records_replayed: 0,
        };

        // From here on, an early return drops `store`, which releases the
        // lock file if it was taken.
        if store.config.mode.is_writable() {
            store.lock_path = Some(acquire_lock(&store.config.path)?);
        }

        let log_path = store.log_path();
        let data = match fs::read(&log_path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(StoreError::OpenFailed(format!(
                    "{}: {}",
                    log_path.display(),
                    e
                )))
            }
        };

        let replay = log::replay(&data)?;
        store.records_replayed = replay.records;
        let dead = replay.dead;
        store.entries = replay.entries;

        match store.config.mode {
            OpenMode::ReadWriteCreate => {
                if replay.valid_len < data.len() {
                    warn!(
                        valid = replay.valid_len,
                        total = data.len(),
                        "Truncating torn write from record log"
                    );
                    truncate_log(&log_path, replay.valid_len as u64)?;
                }

                if store.config.gc && gc::needs_compaction(dead) {
                    gc::compact(&log_path, &store.entries, dead).map_err(|e| {
                        StoreError::OpenFailed(format!("log compaction failed: {}", e))
                    })?;
                }

                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&log_path)
                    .map_err(|e| {
                        StoreError::OpenFailed(format!("{}: {}", log_path.display(), e))
                    })?;
                store.log = Some(file);
            }
            OpenMode::ReadOnly => {
                if store.config.gc {
                    debug!("GC has no effect on a read-only store");
                }
            }
        }

        info!(
            path = %store.config.path.display(),
            mode = ?store.config.mode,
            keys = store.entries.len(),
            records = store.records_replayed,
            "Store opened"
        );

        Ok(store)
    }

    /// Returns the configuration this store was opened with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn log_path(&self) -> PathBuf {
        self.config.path.join(LOG_FILE)
    }

    /// Looks up `key`.
    ///
    /// The key is matched byte for byte; callers following the
    /// NUL-terminated convention must include the terminator.
    pub fn get(&self, key: &[u8]) -> StoreResult<Option<Bytes>> {
        if self.closed {
            return Err(StoreError::LookupFailed("store is closed".to_string()));
        }
        self.lookup_count.fetch_add(1, Ordering::Relaxed);
        Ok(self.entries.get(key).cloned())
    }

    /// Sets `key` to `value`, appending a record to the log.
    pub fn put(&mut self, key: impl Into<Bytes>, value: impl Into<Bytes>) -> StoreResult<()> {
        let key = key.into();
        if key.is_empty() {
            return Err(StoreError::InvalidKey("key must not be empty"));
        }
        let value = value.into();

        self.append(&Record::Put(key.clone(), value.clone()))?;
        self.entries.insert(key, value);
        Ok(())
    }

    /// Removes `key`. Returns `true` if it was present.
    pub fn delete(&mut self, key: &[u8]) -> StoreResult<bool> {
        if !self.entries.contains_key(key) {
            self.check_writable()?;
            return Ok(false);
        }

        self.append(&Record::Delete(Bytes::copy_from_slice(key)))?;
        self.entries.remove(key);
        Ok(true)
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.closed {
            return Err(StoreError::Closed);
        }
        if !self.config.mode.is_writable() {
            return Err(StoreError::ReadOnly);
        }
        Ok(())
    }

    fn append(&mut self, record: &Record) -> StoreResult<()> {
        self.check_writable()?;
        let file = self.log.as_mut().ok_or(StoreError::ReadOnly)?;

        let mut buf = Vec::new();
        record.encode(&mut buf);
        file.write_all(&buf)?;
        Ok(())
    }

    /// Creates a forward cursor positioned strictly after
    /// `lower_bound_exclusive`, or at the first key when `None`.
    pub fn cursor(&self, lower_bound_exclusive: Option<&[u8]>) -> StoreResult<Cursor<'_>> {
        if self.closed {
            return Err(StoreError::CursorFailed("store is closed".to_string()));
        }

        let id = self.cursors_opened.fetch_add(1, Ordering::Relaxed) + 1;
        trace!(cursor = id, "Cursor created");
        Ok(Cursor::new(
            self,
            id,
            lower_bound_exclusive.map(Bytes::copy_from_slice),
        ))
    }

    pub(crate) fn entries(&self) -> &BTreeMap<Bytes, Bytes> {
        &self.entries
    }

    pub(crate) fn cursor_released(&self, id: u64) {
        self.cursors_released.fetch_add(1, Ordering::Relaxed);
        trace!(cursor = id, "Cursor released");
    }

    /// Returns the number of keys in the store.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true once [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            keys: self.entries.len() as u64,
            lookups: self.lookup_count.load(Ordering::Relaxed),
            cursors_opened: self.cursors_opened.load(Ordering::Relaxed),
            cursors_released: self.cursors_released.load(Ordering::Relaxed),
            records_replayed: self.records_replayed,
        }
    }

    /// Releases every resource held by the handle.
    ///
    /// Calling this more than once is a no-op. Dropping the handle calls it.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Some(file) = self.log.take() {
            if let Err(e) = file.sync_all() {
                warn!(error = %e, "Failed to sync record log");
            }
        }

        if let Some(lock_path) = self.lock_path.take() {
            if let Err(e) = fs::remove_file(&lock_path) {
                warn!(path = %lock_path.display(), error = %e, "Failed to remove lock file");
            }
        }

        info!(path = %self.config.path.display(), "Store closed");
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        self.close();
    }
}

/// Store statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of keys currently stored
    pub keys: u64,
    /// Point lookups served
    pub lookups: u64,
    /// Cursors created
    pub cursors_opened: u64,
    /// Cursors released
    pub cursors_released: u64,
    /// Records replayed from the log at open
    pub records_replayed: u64,
}

/// Validates (and in read-write mode creates) the database directory.
fn prepare_directory(path: &Path, mode: OpenMode) -> StoreResult<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(StoreError::ConfigurationFailed(format!(
            "{}: not a directory",
            path.display()
        ))),
        Err(e) if e.kind() == ErrorKind::NotFound => match mode {
            OpenMode::ReadOnly => Err(StoreError::ConfigurationFailed(format!(
                "{}: directory does not exist",
                path.display()
            ))),
            OpenMode::ReadWriteCreate => fs::create_dir_all(path).map_err(|e| {
                StoreError::ConfigurationFailed(format!("{}: {}", path.display(), e))
            }),
        },
        Err(e) => Err(StoreError::ConfigurationFailed(format!(
            "{}: {}",
            path.display(),
            e
        ))),
    }
}

/// Takes the single-writer lock for `dir`.
fn acquire_lock(dir: &Path) -> StoreResult<PathBuf> {
    let lock_path = dir.join(LOCK_FILE);
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&lock_path)
        .map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => StoreError::OpenFailed(format!(
                "{}: lock held by another process",
                lock_path.display()
            )),
            _ => StoreError::OpenFailed(format!("{}: {}", lock_path.display(), e)),
        })?;

    // the pid is informational only
    if let Err(e) = writeln!(file, "{}", std::process::id()) {
        debug!(error = %e, "Failed to record pid in lock file");
    }

    Ok(lock_path)
}

fn truncate_log(path: &Path, len: u64) -> StoreResult<()> {
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|e| StoreError::OpenFailed(format!("{}: {}", path.display(), e)))?;
    file.set_len(len)
        .map_err(|e| StoreError::OpenFailed(format!("{}: {}", path.display(), e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn writable(dir: &TempDir) -> Store {
        Store::open(StoreConfig::new(dir.path()).mode(OpenMode::ReadWriteCreate)).unwrap()
    }

    #[test]
    fn test_put_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = writable(&dir);

        store.put("key", "value").unwrap();
        assert_eq!(store.get(b"key").unwrap(), Some(Bytes::from("value")));
        assert_eq!(store.get(b"missing").unwrap(), None);
        assert_eq!(store.stats().lookups, 2);
    }

    #[test]
    fn test_reopen_replays_log() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = writable(&dir);
            store.put("a", "1").unwrap();
            store.put("b", "2").unwrap();
            store.put("a", "3").unwrap();
            store.delete(b"b").unwrap();
        }

        let store = Store::open(StoreConfig::new(dir.path()).gc(false)).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(b"a").unwrap(), Some(Bytes::from("3")));
        assert_eq!(store.stats().records_replayed, 4);
    }

    #[test]
    fn test_gc_compacts_on_open() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = writable(&dir);
            store.put("a", "1").unwrap();
            store.put("a", "2").unwrap();
        }

        // compacts on this open
        drop(writable(&dir));

        let store = Store::open(StoreConfig::new(dir.path())).unwrap();
        assert_eq!(store.stats().records_replayed, 1);
        assert_eq!(store.get(b"a").unwrap(), Some(Bytes::from("2")));
    }

    #[test]
    fn test_gc_disabled_keeps_log() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = writable(&dir);
            store.put("a", "1").unwrap();
            store.put("a", "2").unwrap();
        }

        drop(
            Store::open(
                StoreConfig::new(dir.path())
                    .mode(OpenMode::ReadWriteCreate)
                    .gc(false),
            )
            .unwrap(),
        );

        let store = Store::open(StoreConfig::new(dir.path())).unwrap();
        assert_eq!(store.stats().records_replayed, 2);
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = Store::open(StoreConfig::new(dir.path())).unwrap();

        assert!(store.is_empty());
        assert!(matches!(store.put("a", "1"), Err(StoreError::ReadOnly)));
        assert!(matches!(store.delete(b"a"), Err(StoreError::ReadOnly)));
    }

    #[test]
    fn test_read_only_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let err = Store::open(StoreConfig::new(&missing)).unwrap_err();
        assert!(matches!(err, StoreError::ConfigurationFailed(_)));
        assert!(!missing.exists());
    }

    #[test]
    fn test_read_write_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("db");

        let store =
            Store::open(StoreConfig::new(&nested).mode(OpenMode::ReadWriteCreate)).unwrap();
        assert!(nested.is_dir());
        assert!(nested.join(LOCK_FILE).exists());
        drop(store);
        assert!(!nested.join(LOCK_FILE).exists());
    }

    #[test]
    fn test_path_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, b"x").unwrap();

        let err = Store::open(StoreConfig::new(&file)).unwrap_err();
        assert!(matches!(err, StoreError::ConfigurationFailed(msg) if msg.contains("not a directory")));
    }

    #[test]
    fn test_lock_held() {
        let dir = tempfile::tempdir().unwrap();
        let _first = writable(&dir);

        let err = Store::open(StoreConfig::new(dir.path()).mode(OpenMode::ReadWriteCreate))
            .unwrap_err();
        assert!(matches!(err, StoreError::OpenFailed(msg) if msg.contains("lock held")));

        // a failed open must not remove the holder's lock
        assert!(dir.path().join(LOCK_FILE).exists());
    }

    #[test]
    fn test_corrupted_log_releases_lock() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = writable(&dir);
            store.put("key", "value").unwrap();
        }

        let log_path = dir.path().join(LOG_FILE);
        let mut data = fs::read(&log_path).unwrap();
        data[10] ^= 0xff;
        fs::write(&log_path, data).unwrap();

        let err = Store::open(StoreConfig::new(dir.path()).mode(OpenMode::ReadWriteCreate))
            .unwrap_err();
        assert!(matches!(err, StoreError::OpenFailed(_)));
        assert!(!dir.path().join(LOCK_FILE).exists());
    }

    #[test]
    fn test_torn_write_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = writable(&dir);
            store.put("a", "1").unwrap();
        }

        let log_path = dir.path().join(LOG_FILE);
        let good_len = fs::metadata(&log_path).unwrap().len();
        let mut file = OpenOptions::new().append(true).open(&log_path).unwrap();
        file.write_all(&[1, 5, 0]).unwrap();
        drop(file);

        {
            let mut store = writable(&dir);
            assert_eq!(fs::metadata(&log_path).unwrap().len(), good_len);
            store.put("b", "2").unwrap();
        }

        let store = Store::open(StoreConfig::new(dir.path())).unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_corrupted_length_fails_open_and_keeps_log() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = writable(&dir);
            for key in ["a", "b", "c"] {
                store.put(key, format!("v_{}", key)).unwrap();
            }
        }

        let log_path = dir.path().join(LOG_FILE);
        let mut data = fs::read(&log_path).unwrap();
        data[1..5].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
        fs::write(&log_path, &data).unwrap();

        let err = Store::open(StoreConfig::new(dir.path())).unwrap_err();
        assert!(matches!(&err, StoreError::OpenFailed(msg) if msg.contains("offset 0")));

        let err = Store::open(StoreConfig::new(dir.path()).mode(OpenMode::ReadWriteCreate))
            .unwrap_err();
        assert!(matches!(err, StoreError::OpenFailed(_)));
        assert_eq!(fs::read(&log_path).unwrap(), data);
        assert!(!dir.path().join(LOCK_FILE).exists());
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = writable(&dir);

        store.close();
        store.close();
        assert!(store.is_closed());
        assert!(matches!(store.get(b"a"), Err(StoreError::LookupFailed(_))));
        assert!(matches!(store.cursor(None), Err(StoreError::CursorFailed(_))));
        assert!(matches!(store.put("a", "1"), Err(StoreError::Closed)));
    }

    #[test]
    fn test_empty_key_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = writable(&dir);

        assert!(matches!(
            store.put(Bytes::new(), "1"),
            Err(StoreError::InvalidKey(_))
        ));
    }
}
