//! Directory-based storage backend for persistent storage.
//!
//! Each database gets its own directory:
//!
//! ```text
//! <db_path>/
//! ├─ LOCK              # Advisory lock for single-process access
//! ├─ metadata.json     # Schema metadata
//! └─ rows/
//!    └─ <table>.json   # Row data, one document per table
//! ```

use crate::backend::{validate_document_name, StorageBackend};
use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Lock file name within the directory.
const LOCK_FILE: &str = "LOCK";
/// Suffix for in-flight atomic writes.
const TEMP_SUFFIX: &str = ".tmp";

/// A directory-backed document store.
///
/// # Durability
///
/// Writes go to `<name>.tmp`, are synced when `sync_writes` is set, and
/// are then renamed over the target, so a failed write never leaves a
/// half-written document behind.
///
/// # Thread Safety
///
/// Writers are serialized by an internal mutex. The directory itself is
/// guarded by an exclusive advisory lock on `LOCK` for as long as the
/// backend is alive.
///
/// # Example
///
/// ```no_run
/// use tabula_storage::{StorageBackend, FileBackend};
/// use std::path::Path;
///
/// let backend = FileBackend::open(Path::new("data/shop"), true).unwrap();
/// backend.write("metadata.json", b"{}").unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    root: PathBuf,
    sync_writes: bool,
    write_lock: Mutex<()>,
    _lock_file: File,
}

impl FileBackend {
    /// Opens or creates a backend rooted at `root`.
    ///
    /// # Errors
    ///
    /// Returns `Locked` if another process holds the directory, or an
    /// I/O error if the directory cannot be created.
    pub fn open(root: &Path, sync_writes: bool) -> StorageResult<Self> {
        fs::create_dir_all(root)?;

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(root.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked(root.display().to_string()));
        }

        Ok(Self {
            root: root.to_path_buf(),
            sync_writes,
            write_lock: Mutex::new(()),
            _lock_file: lock_file,
        })
    }

    /// Returns the root directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> StorageResult<PathBuf> {
        validate_document_name(name)?;
        Ok(name.split('/').fold(self.root.clone(), |path, segment| path.join(segment)))
    }

    fn collect(&self, dir: &Path, relative: &str, out: &mut Vec<String>) -> io::Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };

        for entry in entries {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let name = if relative.is_empty() {
                file_name.clone()
            } else {
                format!("{relative}/{file_name}")
            };

            if entry.file_type()?.is_dir() {
                self.collect(&entry.path(), &name, out)?;
            } else if name != LOCK_FILE && !file_name.ends_with(TEMP_SUFFIX) {
                out.push(name);
            }
        }
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, name: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.resolve(name)?;
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, name: &str, data: &[u8]) -> StorageResult<()> {
        let path = self.resolve(name)?;
        let _guard = self.write_lock.lock();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut temp = path.clone().into_os_string();
        temp.push(TEMP_SUFFIX);
        let temp = PathBuf::from(temp);

        let mut file = File::create(&temp)?;
        file.write_all(data)?;
        if self.sync_writes {
            file.sync_all()?;
        }
        drop(file);

        fs::rename(&temp, &path)?;
        Ok(())
    }

    fn remove(&self, name: &str) -> StorageResult<()> {
        let path = self.resolve(name)?;
        let _guard = self.write_lock.lock();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut names = Vec::new();
        self.collect(&self.root, "", &mut names)?;
        names.retain(|name| name.starts_with(prefix));
        names.sort();
        Ok(names)
    }
}
