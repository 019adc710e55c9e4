// Append-only line log for timestamped records: `[YYYY-MM-DD HH:MM:SS] {json}` per line.
// Writers and rotation hold an exclusive advisory lock on the file, readers a shared one.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::TimeZone;
use fd_lock::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use crate::models::{Stamp, Timestamped};

/// Suffix of the single-generation backup written by rotation.
pub const BACKUP_SUFFIX: &str = ".old";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StorageError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(io::Error) -> StorageError + '_ {
        move |source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RotationResult {
    pub purged: usize,
    pub kept: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsStorage;

impl MetricsStorage {
    pub fn new() -> Self {
        Self
    }

    /// Appends every entry as one line. An empty batch touches nothing.
    #[instrument(skip(self, entries), fields(operation = "write_batch", path = %path.display(), entries = entries.len()))]
    pub fn write_batch<T: Serialize + Timestamped>(
        &self,
        path: &Path,
        entries: &[T],
    ) -> Result<(), StorageError> {
        if entries.is_empty() {
            return Ok(());
        }

        // Serialize up front so a bad entry never leaves half a batch on disk.
        let mut buf = String::new();
        for entry in entries {
            buf.push('[');
            buf.push_str(&line_stamp(entry.timestamp()));
            buf.push_str("] ");
            buf.push_str(&serde_json::to_string(entry)?);
            buf.push('\n');
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(StorageError::io(parent))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(StorageError::io(path))?;
        let mut lock = RwLock::new(file);
        let mut guard = lock.write().map_err(StorageError::io(path))?;
        let file: &mut File = &mut guard;
        file.write_all(buf.as_bytes())
            .and_then(|_| file.flush())
            .map_err(StorageError::io(path))?;
        Ok(())
    }

    /// Entries with `timestamp > since`, ascending by timestamp. Malformed lines are skipped.
    /// A missing file reads as empty.
    pub fn read<T: DeserializeOwned + Timestamped>(
        &self,
        path: &Path,
        since: i64,
    ) -> Result<Vec<T>, StorageError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(path)(e)),
        };
        let lock = RwLock::new(file);
        let guard = lock.read().map_err(StorageError::io(path))?;

        let mut entries: Vec<T> = Vec::new();
        for_each_line(BufReader::new(&*guard), path, |line| {
            if let Some(entry) = parse_line::<T>(line)
                && entry.timestamp() > since
            {
                entries.push(entry);
            }
        })?;
        drop(guard);

        entries.sort_by_key(|e| e.timestamp());
        Ok(entries)
    }

    pub fn rotate(&self, path: &Path, retention_secs: i64) -> Result<RotationResult, StorageError> {
        self.rotate_at(path, retention_secs, BACKUP_SUFFIX, crate::rollup::unix_now())
    }

    /// Drops lines older than `now - retention_secs`. Kept lines are copied verbatim.
    /// Nothing is rewritten (and no backup made) when nothing expired.
    ///
    /// The live file is rewritten in place under the exclusive lock, so appenders blocked on
    /// the lock land in the rewritten file. The previous contents go to `path + backup_suffix`.
    #[instrument(skip(self), fields(operation = "rotate", path = %path.display()))]
    pub fn rotate_at(
        &self,
        path: &Path,
        retention_secs: i64,
        backup_suffix: &str,
        now: i64,
    ) -> Result<RotationResult, StorageError> {
        let file = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(RotationResult::default()),
            Err(e) => return Err(StorageError::io(path)(e)),
        };
        let mut lock = RwLock::new(file);
        let mut guard = lock.write().map_err(StorageError::io(path))?;

        let mut current = Vec::new();
        (&*guard)
            .read_to_end(&mut current)
            .map_err(StorageError::io(path))?;

        let cutoff = now - retention_secs;
        let mut kept_lines = String::new();
        let mut result = RotationResult::default();
        for_each_line(current.as_slice(), path, |line| {
            match parse_line::<Stamp>(line) {
                Some(stamp) if stamp.timestamp >= cutoff => {
                    kept_lines.push_str(line);
                    kept_lines.push('\n');
                    result.kept += 1;
                }
                Some(_) => result.purged += 1,
                None => {}
            }
        })?;

        if result.purged == 0 {
            debug!(kept = result.kept, "nothing to rotate");
            return Ok(result);
        }

        let tmp = with_suffix(path, ".tmp");
        let backup = with_suffix(path, backup_suffix);
        fs::write(&tmp, &current).map_err(StorageError::io(&tmp))?;
        fs::rename(&tmp, &backup).map_err(StorageError::io(&tmp))?;

        let file: &mut File = &mut guard;
        truncate_and_write(file, kept_lines.as_bytes()).map_err(StorageError::io(path))?;
        drop(guard);

        info!(
            purged = result.purged,
            kept = result.kept,
            "metrics purge"
        );
        Ok(result)
    }
}

/// Replaces the whole content of an open file.
pub(crate) fn truncate_and_write(file: &mut File, bytes: &[u8]) -> io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(bytes)?;
    file.flush()
}

/// `path` with `suffix` appended to the full file name (`raw.log` -> `raw.log.old`).
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_owned();
    s.push(suffix);
    PathBuf::from(s)
}

/// Parses `[datetime] {json}` or a bare `{json}` line.
fn parse_line<T: DeserializeOwned>(line: &str) -> Option<T> {
    let line = line.trim();
    let json = match line.strip_prefix('[') {
        Some(rest) => rest.split_once(']')?.1.trim_start(),
        None => line,
    };
    if !json.starts_with('{') {
        return None;
    }
    serde_json::from_str(json).ok()
}

fn line_stamp(timestamp: i64) -> String {
    match chrono::Local.timestamp_opt(timestamp, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}

/// Feeds each line (without its newline) to `f`. Lines that are not valid UTF-8 are skipped.
fn for_each_line<R: BufRead>(
    mut reader: R,
    path: &Path,
    mut f: impl FnMut(&str),
) -> Result<(), StorageError> {
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .map_err(StorageError::io(path))?;
        if n == 0 {
            return Ok(());
        }
        if let Ok(line) = std::str::from_utf8(&buf) {
            f(line.trim_end_matches(['\n', '\r']));
        }
    }
}
