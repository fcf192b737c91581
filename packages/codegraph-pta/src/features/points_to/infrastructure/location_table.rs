//! Interning table for abstract locations
//!
//! `location_for` is a memoizing constructor: equal keys always map to the
//! same [`LocationId`], so points-to bookkeeping can index by id.

use crate::features::call_graph::domain::CallGraph;
use crate::features::points_to::domain::{LocationId, PointerKey};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Default)]
pub struct LocationTable {
    keys: Vec<PointerKey>,
    index: FxHashMap<PointerKey, LocationId>,
}

impl LocationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `key`, returning its id and whether it was just created.
    ///
    /// # Panics
    /// If `key` is owned by a node the call graph does not contain.
    pub fn location_for(&mut self, key: PointerKey, call_graph: &CallGraph) -> (LocationId, bool) {
        if let Some(&id) = self.index.get(&key) {
            return (id, false);
        }
        if let Some(owner) = key.owner_node() {
            assert!(
                call_graph.contains(owner),
                "location {} owned by unregistered node",
                key
            );
        }
        let id = LocationId::from_index(self.keys.len());
        self.keys.push(key.clone());
        self.index.insert(key, id);
        (id, true)
    }

    /// Look a key up without creating it
    #[inline]
    pub fn find(&self, key: &PointerKey) -> Option<LocationId> {
        self.index.get(key).copied()
    }

    #[inline]
    pub fn get(&self, id: LocationId) -> Option<&PointerKey> {
        self.keys.get(id.index())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LocationId, &PointerKey)> + '_ {
        self.keys
            .iter()
            .enumerate()
            .map(|(i, key)| (LocationId::from_index(i), key))
    }
}
