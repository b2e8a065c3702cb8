//! Registry of databases.
//!
//! Databases are opened lazily and cached. On disk each database lives in
//! its own directory under the registry root:
//!
//! ```text
//! <root>/
//! ├─ shop/
//! │  ├─ LOCK
//! │  ├─ metadata.json
//! │  └─ rows/
//! └─ inventory/
//! ```

use crate::access::Principal;
use crate::config::Config;
use crate::database::Database;
use crate::error::{CoreError, CoreResult};
use crate::metadata::METADATA_DOCUMENT;
use crate::schema::validate_name;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabula_storage::{FileBackend, InMemoryBackend, StorageBackend, StorageError};
use tracing::{debug, info};

/// Outcome of [`Registry::select_database`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// The database did not exist and was created for the caller.
    Created,
    /// An existing database was selected.
    Selected,
}

#[derive(Debug)]
enum Location {
    Directory(PathBuf),
    Memory,
}

/// Opens, creates and caches databases.
#[derive(Debug)]
pub struct Registry {
    location: Location,
    config: Config,
    databases: RwLock<BTreeMap<String, Arc<Database>>>,
}

impl Registry {
    /// Opens a registry rooted at a directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the directory cannot be created.
    pub fn open(root: &Path, config: Config) -> CoreResult<Self> {
        fs::create_dir_all(root).map_err(StorageError::from)?;
        debug!(root = %root.display(), "registry opened");
        Ok(Self {
            location: Location::Directory(root.to_path_buf()),
            config,
            databases: RwLock::new(BTreeMap::new()),
        })
    }

    /// Creates a registry whose databases live in memory only.
    #[must_use]
    pub fn in_memory(config: Config) -> Self {
        Self {
            location: Location::Memory,
            config,
            databases: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns the configuration applied to every database.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Selects a database, creating it owned by `owner` if it is missing
    /// and the configuration allows it.
    ///
    /// Selecting an existing database does not check ownership; mutations
    /// do.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseNotFound` if the database is missing and creation
    /// is disabled, a schema error for an invalid name, or a persistence
    /// error.
    pub fn select_database(
        &self,
        name: &str,
        owner: &Principal,
    ) -> CoreResult<(Arc<Database>, Selection)> {
        validate_name("database", name)?;
        if let Some(db) = self.databases.read().get(name) {
            return Ok((Arc::clone(db), Selection::Selected));
        }

        let mut databases = self.databases.write();
        if let Some(db) = databases.get(name) {
            return Ok((Arc::clone(db), Selection::Selected));
        }

        let (db, selection) = if self.exists_on_disk(name) {
            (self.load(name)?, Selection::Selected)
        } else if self.config.create_if_missing {
            let db = Database::create(name, owner, self.backend(name)?, self.config.clone())?;
            info!(database = name, owner = %owner, "database created on selection");
            (db, Selection::Created)
        } else {
            return Err(CoreError::DatabaseNotFound {
                name: name.to_string(),
            });
        };

        let db = Arc::new(db);
        databases.insert(name.to_string(), Arc::clone(&db));
        Ok((db, selection))
    }

    /// Returns an existing database.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseNotFound` if no such database exists, or a
    /// persistence error if it cannot be loaded.
    pub fn database(&self, name: &str) -> CoreResult<Arc<Database>> {
        validate_name("database", name)?;
        if let Some(db) = self.databases.read().get(name) {
            return Ok(Arc::clone(db));
        }

        let mut databases = self.databases.write();
        if let Some(db) = databases.get(name) {
            return Ok(Arc::clone(db));
        }
        if !self.exists_on_disk(name) {
            return Err(CoreError::DatabaseNotFound {
                name: name.to_string(),
            });
        }

        let db = Arc::new(self.load(name)?);
        databases.insert(name.to_string(), Arc::clone(&db));
        Ok(db)
    }

    /// Lists known databases: those loaded plus those found on disk.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the root cannot be read.
    pub fn database_names(&self) -> CoreResult<Vec<String>> {
        let mut names: Vec<String> = self.databases.read().keys().cloned().collect();
        if let Location::Directory(root) = &self.location {
            for entry in fs::read_dir(root).map_err(StorageError::from)? {
                let entry = entry.map_err(StorageError::from)?;
                if let Some(name) = entry.file_name().to_str() {
                    if entry.path().join(METADATA_DOCUMENT).is_file() {
                        names.push(name.to_string());
                    }
                }
            }
        }
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn exists_on_disk(&self, name: &str) -> bool {
        match &self.location {
            Location::Directory(root) => root.join(name).join(METADATA_DOCUMENT).is_file(),
            Location::Memory => false,
        }
    }

    fn load(&self, name: &str) -> CoreResult<Database> {
        Database::open(name, self.backend(name)?, self.config.clone())
    }

    fn backend(&self, name: &str) -> CoreResult<Arc<dyn StorageBackend>> {
        Ok(match &self.location {
            Location::Directory(root) => {
                let backend = FileBackend::open(&root.join(name), self.config.sync_writes)?;
                debug!(database = name, path = %backend.path().display(), "database directory locked");
                Arc::new(backend)
            }
            Location::Memory => Arc::new(InMemoryBackend::new()),
        })
    }
}
