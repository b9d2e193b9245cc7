//! Log Compaction
//!
//! Overwrites and deletes leave dead records behind in `sophia.log`. When the
//! store is opened read-write with GC enabled, the log is rewritten so it
//! holds exactly one put record per live key.
//!
//! ## Procedure
//!
//! 1. Encode every live entry, in key order, into `sophia.log.compact`
//! 2. Sync the temporary file
//! 3. Rename it over the live log
//!
//! A crash before the rename leaves the old log untouched; the stale
//! temporary file is overwritten by the next compaction.

use super::error::StoreResult;
use super::log::Record;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

/// Suffix of the temporary file written during compaction.
const COMPACT_SUFFIX: &str = "compact";

/// Outcome of a compaction pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionStats {
    /// Records written to the new log
    pub live: u64,
    /// Records dropped
    pub reclaimed: u64,
    /// Size of the new log in bytes
    pub bytes: u64,
}

/// Returns `true` if a log with `dead` superseded records is worth rewriting.
pub fn needs_compaction(dead: u64) -> bool {
    dead > 0
}

/// Rewrites the log at `log_path` so it only contains `entries`.
pub fn compact(
    log_path: &Path,
    entries: &BTreeMap<Bytes, Bytes>,
    dead: u64,
) -> StoreResult<CompactionStats> {
    let tmp_path = log_path.with_extension(format!("log.{}", COMPACT_SUFFIX));
    debug!(path = %tmp_path.display(), live = entries.len(), "Writing compacted log");

    let mut buf = Vec::new();
    for (key, value) in entries {
        Record::Put(key.clone(), value.clone()).encode(&mut buf);
    }

    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(&buf)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, log_path)?;

    let stats = CompactionStats {
        live: entries.len() as u64,
        reclaimed: dead,
        bytes: buf.len() as u64,
    };
    info!(
        live = stats.live,
        reclaimed = stats.reclaimed,
        bytes = stats.bytes,
        "Compacted record log"
    );

    Ok(stats)
}
