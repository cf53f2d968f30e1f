//! Thread-safe engine handle with single-writer persistence.
//!
//! Readers (`predict`, `score`) share a read lock and run concurrently.
//! Every writer first takes the store mutex, which serializes writers with
//! each other, and then holds the engine write lock only long enough to
//! mutate state and capture a snapshot.  Encoding and disk I/O run under the
//! store mutex alone, so readers never wait on the disk.
//!
//! Lock order is always store, then engine.
//!
//! Only one process should write a given snapshot; this handle does not
//! coordinate across processes.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::engine::UcbScore;
use crate::persist::BlobStore;
use crate::{ArmId, BanditError, EngineConfig, LinUcbEngine};

/// Cloneable handle to one engine instance and the store it persists to.
#[derive(Debug)]
pub struct SharedEngine<S> {
    engine: Arc<RwLock<LinUcbEngine>>,
    store: Arc<Mutex<S>>,
}

impl<S> Clone for SharedEngine<S> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: BlobStore> SharedEngine<S> {
    pub fn new(engine: LinUcbEngine, store: S) -> Self {
        Self {
            engine: Arc::new(RwLock::new(engine)),
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Load from `store` (gracefully, falling back to `fallback`) and wrap.
    pub fn open(store: S, fallback: EngineConfig) -> Self {
        let engine = LinUcbEngine::load_or(&store, fallback);
        Self::new(engine, store)
    }

    pub fn config(&self) -> EngineConfig {
        self.engine.read().config()
    }

    pub fn predict(&self, arm: &ArmId, context: &[f64]) -> Result<f64, BanditError> {
        self.engine.read().predict(arm, context)
    }

    pub fn score(&self, arm: &ArmId, context: &[f64]) -> Result<UcbScore, BanditError> {
        self.engine.read().score(arm, context)
    }

    /// Run `f` against a consistent read-only view of the engine.
    pub fn with_engine<R>(&self, f: impl FnOnce(&LinUcbEngine) -> R) -> R {
        f(&self.engine.read())
    }

    /// In-memory update only; see [`Self::update_and_save`] for the durable form.
    ///
    /// Waits for any in-flight save or rebuild to finish.
    pub fn update(&self, arm: &ArmId, context: &[f64], reward: f64) -> Result<(), BanditError> {
        let _writer = self.store.lock();
        self.engine.write().update(arm, context, reward)
    }

    /// Persist the current state.
    pub fn save(&self) -> Result<(), BanditError> {
        let store = self.store.lock();
        let snap = self.engine.read().snapshot();
        snap.write_to(&*store)
    }

    /// Update then persist, with no other writer interleaving between the two.
    ///
    /// If the update is rejected nothing is written.  If the write fails the
    /// update stays applied in memory and the error is returned; the next
    /// successful save persists it.  Retrying the same update after a write
    /// error counts it twice.
    pub fn update_and_save(
        &self,
        arm: &ArmId,
        context: &[f64],
        reward: f64,
    ) -> Result<(), BanditError> {
        let store = self.store.lock();
        let snap = {
            let mut engine = self.engine.write();
            engine.update(arm, context, reward)?;
            engine.snapshot()
        };
        snap.write_to(&*store)?;
        debug!(%arm, reward, "Recorded reward");
        Ok(())
    }

    /// Build a replacement engine, swap it in and persist it, as one writer.
    ///
    /// `build` receives the live parameters and runs while the writer lock is
    /// held: readers keep scoring against the old engine, while updates wait
    /// and land on the new engine after the swap.  An error from `build`
    /// leaves the live engine untouched.  The swap happens even if the final
    /// write fails; the error is still returned.
    pub fn rebuild_and_save<R>(
        &self,
        build: impl FnOnce(EngineConfig) -> Result<(LinUcbEngine, R), BanditError>,
    ) -> Result<R, BanditError> {
        let store = self.store.lock();
        let cfg = self.engine.read().config();
        let (rebuilt, out) = build(cfg)?;
        let snap = {
            let mut engine = self.engine.write();
            *engine = rebuilt;
            engine.snapshot()
        };
        snap.write_to(&*store)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryStore;
    use std::thread;

    #[test]
    fn concurrent_updates_are_all_applied() {
        let shared = SharedEngine::new(LinUcbEngine::default(), MemoryStore::new());
        let x = [0.5, 0.5, 0.5, 0.5, 0.5];
        let mut handles = Vec::new();
        for t in 0..4u64 {
            let h = shared.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..25 {
                    h.update(&ArmId::Num(t % 2), &x, 1.0).unwrap();
                    let _ = h.predict(&ArmId::Num(0), &x).unwrap();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        shared.with_engine(|e| {
            assert_eq!(e.arms().get(&ArmId::Num(0)).unwrap().uses(), 50);
            assert_eq!(e.arms().get(&ArmId::Num(1)).unwrap().uses(), 50);
        });
    }

    #[test]
    fn update_and_save_persists_immediately() {
        let shared = SharedEngine::new(LinUcbEngine::default(), MemoryStore::new());
        shared
            .update_and_save(&ArmId::Num(3), &[1.0, 0.0, 0.0, 0.0, 0.0], 1.0)
            .unwrap();
        let bytes = shared.store.lock().contents().unwrap();
        let snap = crate::Snapshot::from_json_bytes(&bytes).unwrap();
        assert_eq!(snap.arms.len(), 1);
        assert_eq!(snap.arms[0].arm, ArmId::Num(3));
    }

    /// Store whose writes can be switched off.
    #[derive(Default)]
    struct Flaky {
        inner: MemoryStore,
        broken: std::sync::atomic::AtomicBool,
    }

    impl BlobStore for Flaky {
        fn read(&self) -> std::io::Result<Option<Vec<u8>>> {
            self.inner.read()
        }
        fn write(&self, bytes: &[u8]) -> std::io::Result<()> {
            if self.broken.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(std::io::Error::other("disk full"));
            }
            self.inner.write(bytes)
        }
    }

    #[test]
    fn failed_write_keeps_update_in_memory_until_next_save() {
        let shared = SharedEngine::new(LinUcbEngine::default(), Flaky::default());
        let x = [0.2; 5];
        shared
            .store
            .lock()
            .broken
            .store(true, std::sync::atomic::Ordering::SeqCst);
        assert!(matches!(
            shared.update_and_save(&ArmId::Num(1), &x, 1.0),
            Err(BanditError::Io(_))
        ));
        shared.with_engine(|e| assert_eq!(e.arms().get(&ArmId::Num(1)).unwrap().uses(), 1));
        assert!(shared.store.lock().inner.contents().is_none());

        shared
            .store
            .lock()
            .broken
            .store(false, std::sync::atomic::Ordering::SeqCst);
        shared.save().unwrap();
        let snap = crate::Snapshot::from_json_bytes(&shared.store.lock().inner.contents().unwrap())
            .unwrap();
        assert_eq!(snap.arms[0].uses, 1);
    }

    #[test]
    fn readers_are_not_blocked_by_a_held_writer() {
        let shared = SharedEngine::new(LinUcbEngine::default(), MemoryStore::new());
        let _writer = shared.store.lock();
        // A save or rebuild in progress holds only the store mutex.
        let x = [0.5; 5];
        assert!(shared.predict(&ArmId::Num(1), &x).is_ok());
        shared.with_engine(|e| assert!(e.arms().is_empty()));
    }

    #[test]
    fn rebuild_swaps_and_persists_or_leaves_state_alone() {
        let shared = SharedEngine::new(LinUcbEngine::default(), MemoryStore::new());
        let x = [0.5; 5];
        shared.update(&ArmId::Num(1), &x, 1.0).unwrap();

        let err = shared.rebuild_and_save(|_| -> Result<(LinUcbEngine, ()), BanditError> {
            Err(BanditError::InvalidConfig("nope".to_string()))
        });
        assert!(err.is_err());
        shared.with_engine(|e| assert_eq!(e.arms().len(), 1));
        assert!(shared.store.lock().contents().is_none());

        let n = shared
            .rebuild_and_save(|cfg| {
                let mut e = LinUcbEngine::new(cfg)?;
                e.update(&ArmId::Num(2), &x, 0.2)?;
                Ok((e, 7))
            })
            .unwrap();
        assert_eq!(n, 7);
        shared.with_engine(|e| {
            assert!(!e.arms().contains(&ArmId::Num(1)));
            assert!(e.arms().contains(&ArmId::Num(2)));
        });
        let snap = crate::Snapshot::from_json_bytes(&shared.store.lock().contents().unwrap()).unwrap();
        assert_eq!(snap.arms.len(), 1);
    }

    #[test]
    fn failed_update_does_not_save() {
        let shared = SharedEngine::new(LinUcbEngine::default(), MemoryStore::new());
        assert!(shared.update_and_save(&ArmId::Num(3), &[1.0], 1.0).is_err());
        assert!(shared.store.lock().contents().is_none());
    }
}
