use std::{
    fs::File,
    io::{self, ErrorKind, Write},
    ops::Deref,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use tracing::{debug, info, warn};

use super::database::Database;

/// Key the snapshot is stored under. A change of the document shape needs a new key, old
/// snapshots are never migrated.
pub const STORAGE_KEY: &str = "timeflow.mockdb.v1";

/// Interface for abstracting the durable medium behind [DocumentStore](super::DocumentStore).
/// Always reads and writes the complete snapshot.
#[cfg_attr(test, mockall::automock)]
pub trait PersistenceAdapter {
    /// Returns `None` when nothing was stored yet.
    fn load(&self) -> Result<Option<Database>>;

    fn save(&self, database: &Database) -> Result<()>;
}

impl<T: Deref> PersistenceAdapter for T
where
    T::Target: PersistenceAdapter,
{
    fn load(&self) -> Result<Option<Database>> {
        self.deref().load()
    }

    fn save(&self, database: &Database) -> Result<()> {
        self.deref().save(database)
    }
}

/// Keeps the snapshot as a JSON file named after the storage key inside a directory.
pub struct JsonFilePersistence {
    dir: PathBuf,
    key: String,
}

impl JsonFilePersistence {
    pub fn new(dir: PathBuf) -> Result<Self, io::Error> {
        Self::with_key(dir, STORAGE_KEY)
    }

    pub fn with_key(dir: PathBuf, key: impl Into<String>) -> Result<Self, io::Error> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            key: key.into(),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.key))
    }

    fn lock_file(&self) -> Result<File, io::Error> {
        File::options()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(format!("{}.lock", self.key)))
    }

    fn read(path: &Path) -> Result<Option<Database>> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let database = serde_json::from_str(&content)
                    .with_context(|| format!("Snapshot {path:?} is not a valid document"))?;
                Ok(Some(database))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes next to the snapshot first and renames it into place, so an interrupted write
    /// never leaves a truncated document behind.
    fn write(path: &Path, database: &Database) -> Result<()> {
        let temporary = path.with_extension("json.tmp");
        let mut file = File::create(&temporary)?;
        serde_json::to_writer_pretty(&mut file, database)?;
        file.write_all(b"\n")?;
        file.sync_all()?;
        std::fs::rename(&temporary, path)?;
        Ok(())
    }
}

impl PersistenceAdapter for JsonFilePersistence {
    fn load(&self) -> Result<Option<Database>> {
        let path = self.path();
        debug!("Loading snapshot {path:?}");
        let lock = self.lock_file()?;
        lock.lock_shared()?;
        let result = Self::read(&path);
        released(result, FileExt::unlock(&lock))
    }

    fn save(&self, database: &Database) -> Result<()> {
        let path = self.path();
        let lock = self.lock_file()?;
        lock.lock_exclusive()?;
        let result = Self::write(&path, database);
        released(result, FileExt::unlock(&lock))?;
        info!(
            "Saved snapshot with {} clients and {} projects",
            database.clients.len(),
            database.projects.len()
        );
        Ok(())
    }
}

/// The locked operation's own result wins. Unlock failures are only logged, closing the handle
/// releases the lock.
fn released<T>(result: Result<T>, unlock: io::Result<()>) -> Result<T> {
    if let Err(e) = unlock {
        warn!("Failed to release snapshot lock {e}");
    }
    result
}

/// Snapshot kept as serialized JSON in memory. Goes through the same serde path as
/// [JsonFilePersistence] without touching the disk.
#[derive(Default)]
pub struct MemoryPersistence {
    document: Mutex<Option<String>>,
    writes: Mutex<usize>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> usize {
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn document(&self) -> Option<String> {
        self.document
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PersistenceAdapter for MemoryPersistence {
    fn load(&self) -> Result<Option<Database>> {
        match self.document() {
            Some(document) => Ok(Some(serde_json::from_str(&document)?)),
            None => Ok(None),
        }
    }

    fn save(&self, database: &Database) -> Result<()> {
        let document = serde_json::to_string(database)?;
        *self.document.lock().unwrap_or_else(PoisonError::into_inner) = Some(document);
        *self.writes.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}
