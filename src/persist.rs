//! Durable storage for engine snapshots.
//!
//! The engine only needs a blob store: read the last snapshot, or replace it
//! wholesale.  [`FileStore`] is the production implementation; [`MemoryStore`]
//! is for tests and for embedding the engine without a filesystem.
//!
//! Loading comes in two flavors:
//! - [`LinUcbEngine::try_load`]: strict, every failure is returned.
//! - [`LinUcbEngine::load`] / [`LinUcbEngine::load_or`]: never fails.  A
//!   missing snapshot is a cold start; an unreadable, corrupt, or
//!   unknown-version snapshot is logged and replaced by a fresh engine.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::snapshot::Snapshot;
use crate::{BanditError, EngineConfig, LinUcbEngine};

/// Minimal key-value blob storage for a single snapshot.
pub trait BlobStore {
    /// Return the stored bytes, or `None` if nothing was ever written.
    fn read(&self) -> io::Result<Option<Vec<u8>>>;

    /// Replace the stored bytes.
    ///
    /// Must be all-or-nothing: a failed write leaves the previous contents readable.
    fn write(&self, bytes: &[u8]) -> io::Result<()>;
}

impl<T: BlobStore + ?Sized> BlobStore for &T {
    fn read(&self) -> io::Result<Option<Vec<u8>>> {
        (**self).read()
    }
    fn write(&self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes)
    }
}

impl<T: BlobStore + ?Sized> BlobStore for Arc<T> {
    fn read(&self) -> io::Result<Option<Vec<u8>>> {
        (**self).read()
    }
    fn write(&self, bytes: &[u8]) -> io::Result<()> {
        (**self).write(bytes)
    }
}

/// Snapshot stored as a single file, replaced atomically.
///
/// Writes go to `<path>.tmp`, are flushed to disk, then renamed over `path`
/// (atomic on the same filesystem).
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl BlobStore for FileStore {
    fn read(&self) -> io::Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.tmp_path();
        let result = (|| {
            let mut f = File::create(&tmp)?;
            f.write_all(bytes)?;
            f.sync_all()?;
            fs::rename(&tmp, &self.path)
        })();
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }
}

/// In-memory blob store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    bytes: Mutex<Option<Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeded store (e.g. to simulate a corrupt snapshot).
    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Mutex::new(Some(bytes.into())),
        }
    }

    pub fn contents(&self) -> Option<Vec<u8>> {
        self.bytes.lock().clone()
    }
}

impl BlobStore for MemoryStore {
    fn read(&self) -> io::Result<Option<Vec<u8>>> {
        Ok(self.bytes.lock().clone())
    }

    fn write(&self, bytes: &[u8]) -> io::Result<()> {
        *self.bytes.lock() = Some(bytes.to_vec());
        Ok(())
    }
}

impl Snapshot {
    /// Encode and write to `store`, replacing any previous snapshot.
    pub fn write_to<S: BlobStore + ?Sized>(&self, store: &S) -> Result<(), BanditError> {
        let bytes = self.to_json_bytes()?;
        store.write(&bytes)?;
        debug!(
            arms = self.arms.len(),
            dim = self.dim,
            bytes = bytes.len(),
            "Saved bandit snapshot"
        );
        Ok(())
    }
}

impl LinUcbEngine {
    /// Write the full snapshot (parameters and every arm), replacing any previous one.
    pub fn save<S: BlobStore + ?Sized>(&self, store: &S) -> Result<(), BanditError> {
        self.snapshot().write_to(store)
    }

    /// Strict load: `Ok(None)` if no snapshot exists, `Err` on any read or decode failure.
    pub fn try_load<S: BlobStore + ?Sized>(store: &S) -> Result<Option<Self>, BanditError> {
        let Some(bytes) = store.read()? else {
            return Ok(None);
        };
        let snap = Snapshot::from_json_bytes(&bytes)?;
        Self::from_snapshot(snap).map(Some)
    }

    /// Graceful load with the default parameters (`d = 5`, `alpha = 1.5`) as fallback.
    pub fn load<S: BlobStore + ?Sized>(store: &S) -> Self {
        Self::load_or(store, EngineConfig::default())
    }

    /// Graceful load: any failure yields a fresh engine built from `fallback`.
    ///
    /// If `fallback` itself is invalid, the default parameters are used.
    pub fn load_or<S: BlobStore + ?Sized>(store: &S, fallback: EngineConfig) -> Self {
        match Self::try_load(store) {
            Ok(Some(engine)) => {
                info!(
                    arms = engine.arms().len(),
                    dim = engine.dim(),
                    alpha = engine.alpha(),
                    "Loaded bandit snapshot"
                );
                engine
            }
            Ok(None) => {
                info!(
                    dim = fallback.dim,
                    alpha = fallback.alpha,
                    "No bandit snapshot found, starting cold"
                );
                Self::fresh(fallback)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    code = e.stable_code(),
                    "Bandit snapshot unusable, starting from fresh state"
                );
                Self::fresh(fallback)
            }
        }
    }

    fn fresh(cfg: EngineConfig) -> Self {
        Self::new(cfg).unwrap_or_else(|e| {
            warn!(error = %e, "Invalid fallback engine config, using defaults");
            Self::default()
        })
    }
}
