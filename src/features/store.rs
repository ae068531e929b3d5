//! Identity-keyed feature accumulator
//!
//! The tracking engine reports the same physical feature many times under a
//! stable integer id. The store keeps one dense slot per distinct id:
//!
//! ```text
//! index table (capacity entries)        dense slots (count entries)
//! ┌────┬────┬────┬────┬─────┐           ┌───────────┬───────────┐
//! │ -  │ 1  │ -  │ 0  │ ... │  id → ──> │ positions │  colors   │
//! └────┴────┴────┴────┴─────┘           └───────────┴───────────┘
//! ```
//!
//! Slots are handed out in order of first sighting and never move, so the
//! dense views stay stable while positions are overwritten in place.

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::features::error::{FeatureError, Result};

/// Default number of distinct identities a store accepts
pub const DEFAULT_CAPACITY: usize = 100_000;

/// Largest id range a store supports; slots are indexed with `u32`
pub const MAX_CAPACITY: usize = u32::MAX as usize;

/// Three-component vector used for both positions and colors
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component (or red)
    pub x: f32,
    /// Y component (or green)
    pub y: f32,
    /// Z component (or blue)
    pub z: f32,
}

impl Vec3 {
    /// Create a vector from its components
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// What an accepted upsert did to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// First sighting; the id now owns this slot
    Inserted(usize),
    /// Known id; the slot was overwritten in place
    Updated(usize),
}

impl Upsert {
    /// Dense slot touched by the upsert
    pub fn slot(&self) -> usize {
        match self {
            Upsert::Inserted(slot) | Upsert::Updated(slot) => *slot,
        }
    }
}

/// Bounded, identity-deduplicating point cloud accumulator
#[derive(Debug, Clone)]
pub struct FeatureStore {
    /// id → dense slot; `None` until the id is first seen
    index: Vec<Option<u32>>,

    /// Positions in first-sighting order
    positions: Vec<Vec3>,

    /// Colors, parallel to `positions`
    colors: Vec<Vec3>,

    /// Upper bound on distinct identities, never above the id range
    max_features: usize,
}

impl FeatureStore {
    /// Create a store with [`DEFAULT_CAPACITY`]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a store accepting ids in `[0, capacity)`
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_limits(capacity, capacity)
    }

    /// Create a store accepting ids in `[0, capacity)` but holding at most
    /// `max_features` distinct identities
    pub fn with_limits(capacity: usize, max_features: usize) -> Self {
        Self {
            index: vec![None; capacity],
            positions: Vec::new(),
            colors: Vec::new(),
            max_features: max_features.min(capacity).min(MAX_CAPACITY),
        }
    }

    /// Insert a new feature or overwrite a known one
    ///
    /// Refused sightings leave the store untouched and are logged; the
    /// returned error lets callers count them.
    #[allow(clippy::too_many_arguments)]
    pub fn upsert(
        &mut self,
        id: i64,
        x: f32,
        y: f32,
        z: f32,
        r: f32,
        g: f32,
        b: f32,
    ) -> Result<Upsert> {
        let result = self.try_upsert(id, Vec3::new(x, y, z), Vec3::new(r, g, b));
        if let Err(e) = &result {
            warn!("{}", e);
        }
        result
    }

    fn try_upsert(&mut self, id: i64, position: Vec3, color: Vec3) -> Result<Upsert> {
        let capacity = self.capacity();
        let key = usize::try_from(id)
            .ok()
            .filter(|key| *key < capacity)
            .ok_or(FeatureError::RejectedIdentity { id, capacity })?;

        if let Some(slot) = self.index[key] {
            let slot = slot as usize;
            self.positions[slot] = position;
            self.colors[slot] = color;
            return Ok(Upsert::Updated(slot));
        }

        if self.positions.len() >= self.max_features {
            return Err(FeatureError::CapacityExhausted {
                id,
                capacity: self.max_features,
            });
        }

        let slot = self.positions.len();
        let packed = u32::try_from(slot).map_err(|_| FeatureError::CapacityExhausted {
            id,
            capacity: self.max_features,
        })?;
        self.index[key] = Some(packed);
        self.positions.push(position);
        self.colors.push(color);

        trace!(id, slot, "New feature");
        Ok(Upsert::Inserted(slot))
    }

    /// Number of distinct identities stored
    pub fn size(&self) -> usize {
        self.positions.len()
    }

    /// True when no feature has been seen
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Size of the accepted id range
    pub fn capacity(&self) -> usize {
        self.index.len()
    }

    /// Maximum number of distinct identities
    pub fn max_features(&self) -> usize {
        self.max_features
    }

    /// True once no new identity can be placed
    pub fn is_full(&self) -> bool {
        self.positions.len() >= self.max_features
    }

    /// Positions in first-sighting order
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Colors in first-sighting order
    pub fn colors(&self) -> &[Vec3] {
        &self.colors
    }

    /// Dense slot owned by `id`, if it has been seen
    pub fn slot_of(&self, id: i64) -> Option<usize> {
        let key = usize::try_from(id).ok()?;
        self.index.get(key).copied().flatten().map(|s| s as usize)
    }

    /// Forget every feature (session end)
    pub fn clear(&mut self) {
        self.index.iter_mut().for_each(|entry| *entry = None);
        self.positions.clear();
        self.colors.clear();
    }
}

impl Default for FeatureStore {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_same_id_never_grows(id in 0i64..64, n in 1usize..20) {
            let mut store = FeatureStore::with_capacity(64);
            store.upsert(id, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0).unwrap();
            for i in 0..n {
                let v = i as f32;
                store.upsert(id, v, v, v, v, v, v).unwrap();
                prop_assert_eq!(store.size(), 1);
                prop_assert_eq!(store.positions()[0], Vec3::new(v, v, v));
            }
        }

        #[test]
        fn prop_invalid_ids_never_mutate(
            seed in proptest::collection::vec(0i64..32, 0..32),
            bad in prop_oneof![i64::MIN..0i64, 32i64..i64::MAX],
        ) {
            let mut store = FeatureStore::with_capacity(32);
            for id in &seed {
                store.upsert(*id, *id as f32, 0.0, 0.0, 0.0, 0.0, 0.0).unwrap();
            }
            let before_positions = store.positions().to_vec();
            let before_colors = store.colors().to_vec();

            prop_assert!(store.upsert(bad, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0).is_err());
            prop_assert_eq!(store.positions(), before_positions.as_slice());
            prop_assert_eq!(store.colors(), before_colors.as_slice());
        }

        #[test]
        fn prop_size_counts_distinct_ids(ids in proptest::collection::vec(0i64..128, 0..256)) {
            let mut store = FeatureStore::with_capacity(128);
            for id in &ids {
                store.upsert(*id, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0).unwrap();
            }
            let distinct: std::collections::HashSet<_> = ids.iter().collect();
            prop_assert_eq!(store.size(), distinct.len());
            prop_assert_eq!(store.positions().len(), store.colors().len());
        }
    }
}
