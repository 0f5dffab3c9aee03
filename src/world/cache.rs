use std::collections::HashMap;

use super::model::{Model, Ref, Slot};

/// A flattened, top-down-merged view of an ancestor chain, built
/// opportunistically by `World::lock` once the chain of uncached ancestors
/// gets deep (spec section 4.5). `Model::writes` in a cached entry holds the
/// *resolved* current value of each slot, not a pending write.
#[derive(Debug, Default, Clone)]
pub struct LookupCache {
    pub(super) flattened: HashMap<Ref, Model>,
}

impl LookupCache {
    pub fn get_slot(&self, id: &Ref, slot: usize) -> Option<Slot> {
        self.flattened.get(id).and_then(|m| m.writes.get(slot).cloned())
    }

    pub fn get_model(&self, id: &Ref) -> Option<&Model> {
        self.flattened.get(id)
    }

    pub fn len(&self) -> usize {
        self.flattened.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flattened.is_empty()
    }
}
