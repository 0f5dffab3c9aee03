//! Process-wide, populated-at-startup, never-mutated-afterward type
//! registry binding a Model class's name to its declared slots (spec
//! section 5, 6). Stands in for the source's per-class `binaryKeys`.

use crate::error::{ChronError, Result};
use std::collections::HashMap;

/// A Model subclass's static shape: its cross-world/wire class name and its
/// declared slot names in order (the slot's position is its property
/// index).
pub trait ModelClass {
    const NAME: &'static str;
    const SLOTS: &'static [&'static str];
}

#[derive(Debug, Clone)]
struct ClassSchema {
    slots: Vec<&'static str>,
}

/// Maps a registered class name to its slot schema. Registration happens
/// once at startup; nothing in the core mutates it afterward.
#[derive(Debug, Default, Clone)]
pub struct TypeRegistry {
    classes: HashMap<&'static str, ClassSchema>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T`. Fails with `SchemaConflict` if `T::SLOTS` reuses a slot
    /// name (a duplicate property index within the same layer) or if `NAME`
    /// was already registered with a different slot list.
    pub fn register<T: ModelClass>(&mut self) -> Result<()> {
        for (i, name) in T::SLOTS.iter().enumerate() {
            if T::SLOTS[..i].contains(name) {
                return Err(ChronError::SchemaConflict { type_name: T::NAME, index: i });
            }
        }
        let schema = ClassSchema { slots: T::SLOTS.to_vec() };
        if let Some(existing) = self.classes.get(T::NAME) {
            if existing.slots != schema.slots {
                return Err(ChronError::SchemaConflict { type_name: T::NAME, index: existing.slots.len() });
            }
            return Ok(());
        }
        self.classes.insert(T::NAME, schema);
        Ok(())
    }

    pub fn slot_count(&self, class_name: &str) -> Option<usize> {
        self.classes.get(class_name).map(|s| s.slots.len())
    }

    pub fn contains(&self, class_name: &str) -> bool {
        self.classes.contains_key(class_name)
    }

    /// Recover the `&'static str` form of a registered class name from a
    /// dynamically-decoded string - what `codec::decode` calls to give a
    /// rebuilt `Model` the same `'static` class name it has in every other
    /// process sharing this registry.
    pub fn resolve_name(&self, class_name: &str) -> Option<&'static str> {
        self.classes.keys().find(|&&k| k == class_name).copied()
    }
}
