//! The JSON note store.
//!
//! The whole file is read into memory on open and rewritten on every
//! mutation. Writes are atomic (temp file + rename) and mutations run under
//! an exclusive advisory lock on a sidecar `<file>.lock`, re-reading the
//! file first, so two processes sharing a store do not overwrite each
//! other's uploads.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::StoreData;

pub struct NoteStore {
    path: PathBuf,
    data: StoreData,
}

impl NoteStore {
    /// Opens the store at `path`, creating nothing on disk.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = load(&path)?;
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &StoreData {
        &self.data
    }

    /// Re-reads the file, picking up changes made by other processes.
    pub fn reload(&mut self) -> Result<()> {
        self.data = load(&self.path)?;
        Ok(())
    }

    /// Applies `mutate` to the latest on-disk state and persists it.
    ///
    /// The in-memory copy is replaced only after the write succeeded; on
    /// error the store is left exactly as it was.
    pub fn commit<T>(&mut self, mutate: impl FnOnce(&mut StoreData) -> T) -> Result<T> {
        let _lock = StoreLock::acquire(&self.path)?;
        let mut next = load(&self.path)?;
        let out = mutate(&mut next);
        save(&self.path, &next)?;
        self.data = next;
        Ok(out)
    }
}

/// Reads the store file.
///
/// A missing file is an empty store. An unparseable file is copied aside to
/// `<file>.corrupt`, reported, and replaced by an empty store.
pub fn load(path: &Path) -> Result<StoreData> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(StoreData::default()),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read note store: {}", path.display()))
        }
    };

    match serde_json::from_str::<StoreData>(&content) {
        Ok(data) => Ok(data),
        Err(e) => {
            let backup = corrupt_backup_path(path);
            if let Err(copy_err) = std::fs::copy(path, &backup) {
                tracing::warn!(error = %copy_err, "could not back up corrupted note store");
            }
            tracing::warn!(
                path = %path.display(),
                backup = %backup.display(),
                error = %e,
                "corrupted notes file, starting fresh"
            );
            Ok(StoreData::default())
        }
    }
}

/// Serializes `data` to `path` via a temp file in the same directory.
pub fn save(path: &Path, data: &StoreData) -> Result<()> {
    let dir = parent_dir(path);
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create store directory: {}", dir.display()))?;

    let json = serde_json::to_string_pretty(data)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(json.as_bytes())?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .with_context(|| format!("Failed to write note store: {}", path.display()))?;
    Ok(())
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn corrupt_backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".corrupt");
    PathBuf::from(name)
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Exclusive advisory lock held for the duration of a read-modify-write.
struct StoreLock {
    file: File,
}

impl StoreLock {
    fn acquire(store_path: &Path) -> Result<Self> {
        let dir = parent_dir(store_path);
        std::fs::create_dir_all(dir)?;
        let path = lock_path(store_path);
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .with_context(|| format!("Failed to open lock file: {}", path.display()))?;
        file.lock_exclusive()
            .with_context(|| format!("Failed to lock note store: {}", path.display()))?;
        Ok(Self { file })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
