//! Tracked Feature Accumulation
//!
//! Producer-side storage for the spatial feature points reported by the AR
//! tracking engine. Each sighting arrives as `(id, x, y, z, r, g, b)`; the
//! store deduplicates by `id` so repeated sightings refine a point instead
//! of growing the cloud.
//!
//! # Threading
//!
//! The tracking callback is the only writer. Readouts (status displays,
//! diagnostics) take short read locks or copy out a [`FeatureSnapshot`]:
//!
//! ```text
//! Tracking callback ──write──> SharedFeatureStore <──read── Readout / logging
//! ```

pub mod error;
pub mod store;

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

pub use error::{FeatureError, Result};
pub use store::{FeatureStore, Upsert, Vec3, DEFAULT_CAPACITY, MAX_CAPACITY};

/// Point-in-time copy of the store for diagnostic output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    /// Number of distinct features
    pub count: usize,
    /// Positions in first-sighting order
    pub positions: Vec<Vec3>,
    /// Colors in first-sighting order
    pub colors: Vec<Vec3>,
}

/// Feature store shared between the tracking callback and readers
#[derive(Debug, Clone)]
pub struct SharedFeatureStore {
    inner: Arc<RwLock<FeatureStore>>,
}

impl SharedFeatureStore {
    /// Wrap a store for shared access
    pub fn new(store: FeatureStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Insert or overwrite a feature (writer side)
    #[allow(clippy::too_many_arguments)]
    pub fn upsert(&self, id: i64, x: f32, y: f32, z: f32, r: f32, g: f32, b: f32) -> Result<Upsert> {
        self.inner.write().upsert(id, x, y, z, r, g, b)
    }

    /// Number of distinct features
    pub fn size(&self) -> usize {
        self.inner.read().size()
    }

    /// Forget every feature
    pub fn clear(&self) {
        self.inner.write().clear();
    }

    /// Run `f` against the store under a read lock
    pub fn with_store<R>(&self, f: impl FnOnce(&FeatureStore) -> R) -> R {
        f(&self.inner.read())
    }

    /// Copy the current contents out of the lock
    pub fn snapshot(&self) -> FeatureSnapshot {
        let store = self.inner.read();
        FeatureSnapshot {
            count: store.size(),
            positions: store.positions().to_vec(),
            colors: store.colors().to_vec(),
        }
    }
}

impl Default for SharedFeatureStore {
    fn default() -> Self {
        Self::new(FeatureStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_snapshot_matches_store() {
        let shared = SharedFeatureStore::new(FeatureStore::with_capacity(32));
        shared.upsert(3, 1.0, 2.0, 3.0, 0.0, 0.5, 1.0).unwrap();
        shared.upsert(1, 4.0, 5.0, 6.0, 1.0, 0.5, 0.0).unwrap();

        let snapshot = shared.snapshot();
        assert_eq!(snapshot.count, 2);
        assert_eq!(snapshot.positions[1], Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(snapshot.colors[0], Vec3::new(0.0, 0.5, 1.0));

        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"count\":2"));
    }

    #[test]
    fn test_writer_and_readers_concurrently() {
        let shared = SharedFeatureStore::new(FeatureStore::with_capacity(1000));

        let writer = {
            let shared = shared.clone();
            thread::spawn(move || {
                for round in 0..5 {
                    for id in 0..1000 {
                        shared
                            .upsert(id, round as f32, 0.0, 0.0, 0.0, 0.0, 0.0)
                            .unwrap();
                    }
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        let snapshot = shared.snapshot();
                        assert_eq!(snapshot.positions.len(), snapshot.count);
                        assert_eq!(snapshot.colors.len(), snapshot.count);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }

        assert_eq!(shared.size(), 1000);
        shared.with_store(|store| {
            assert!(store.positions().iter().all(|p| p.x == 4.0));
        });
    }
}
