//! World: an MVCC layer of Models stacked over a parent World, the way a
//! child transaction stacks over its parent (spec section 5). Worlds form a
//! tree: `WaveApp` keeps one linear chain as its undo stack, but nothing in
//! `World` itself assumes that - `child` can be called more than once from
//! the same parent.

pub mod cache;
pub mod model;

pub use cache::LookupCache;
pub use model::{Model, Primitive, Ref, Slot, SlotType, Value};

use crate::error::{ChronError, Result};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Once an uncached ancestor chain gets this deep, `lock` builds a
/// `LookupCache` so future reads from this point don't re-walk it.
const LOCK_CACHE_THRESHOLD: usize = 64;

struct Inner {
    parent: Option<World>,
    models: RefCell<HashMap<Ref, Model>>,
    /// Shared with every World descended from the same root, so ids are
    /// unique across the whole tree rather than just one branch.
    next_key: Rc<Cell<u64>>,
    locked: Cell<bool>,
    cache: RefCell<Option<LookupCache>>,
    children: RefCell<Vec<Weak<Inner>>>,
}

/// A cheaply-cloneable handle onto one layer of the World tree. Single
/// threaded by design (spec section 5: "cooperative, not preemptive... it
/// does not use locks" in the OS sense) - `Rc`/`RefCell` rather than
/// `Arc`/`Mutex`.
#[derive(Clone)]
pub struct World(Rc<Inner>);

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).expect("base36 digits are ascii")
}

impl World {
    /// A fresh root World with no parent and its own id counter.
    pub fn new() -> Self {
        World(Rc::new(Inner {
            parent: None,
            models: RefCell::new(HashMap::new()),
            next_key: Rc::new(Cell::new(0)),
            locked: Cell::new(false),
            cache: RefCell::new(None),
            children: RefCell::new(Vec::new()),
        }))
    }

    /// A new, empty, mutable World layered directly over `self`.
    pub fn child(&self) -> World {
        let child = World(Rc::new(Inner {
            parent: Some(self.clone()),
            models: RefCell::new(HashMap::new()),
            next_key: Rc::clone(&self.0.next_key),
            locked: Cell::new(false),
            cache: RefCell::new(None),
            children: RefCell::new(Vec::new()),
        }));
        self.0.children.borrow_mut().push(Rc::downgrade(&child.0));
        child
    }

    pub fn parent(&self) -> Option<&World> {
        self.0.parent.as_ref()
    }

    pub fn is_locked(&self) -> bool {
        self.0.locked.get()
    }

    /// Draw the next id in this tree's shared counter, base-36 encoded.
    pub fn new_id(&self) -> Ref {
        let n = self.0.next_key.get() + 1;
        self.0.next_key.set(n);
        Ref::new(to_base36(n))
    }

    /// Materialize a brand-new Model in this (live) World and return its id.
    pub fn create_model(&self, class_name: &'static str, slot_count: usize) -> Result<Ref> {
        if self.is_locked() {
            return Err(ChronError::LockedWrite);
        }
        let id = self.new_id();
        let model = Model::new(id.clone(), class_name, slot_count);
        self.0.models.borrow_mut().insert(id.clone(), model);
        Ok(id)
    }

    /// The nearest World (`self` or an ancestor) holding a local copy of
    /// `id`, without consulting any cache.
    fn find_owning_world(&self, id: &Ref) -> Option<World> {
        if self.0.models.borrow().contains_key(id) {
            return Some(self.clone());
        }
        self.0.parent.as_ref().and_then(|p| p.find_owning_world(id))
    }

    /// Return the Model for `id` as seen from this World: the local shadow
    /// if one already exists here, otherwise a freshly materialized
    /// child-local shadow copied from the nearest ancestor that has one.
    pub fn bind(&self, id: &Ref) -> Result<Model> {
        if let Some(m) = self.0.models.borrow().get(id) {
            return Ok(m.clone());
        }
        let owner = self
            .0
            .parent
            .as_ref()
            .and_then(|p| p.find_owning_world(id))
            .ok_or_else(|| ChronError::UnknownRef(id.to_string()))?;
        let source = owner.0.models.borrow().get(id).expect("find_owning_world guarantees presence").clone();
        let shadow = Model::shadow(id.clone(), source.class_name, source.slot_count());
        self.0.models.borrow_mut().insert(id.clone(), shadow.clone());
        Ok(shadow)
    }

    /// The effective current value of `id`'s slot as seen from an ancestor
    /// chain, without mutating anything: local write, else local read
    /// cache, else a cache checkpoint, else recurse to the parent.
    fn slot_value_in_chain(&self, id: &Ref, slot: usize) -> Option<Slot> {
        if let Some(m) = self.0.models.borrow().get(id) {
            if let Some(v) = m.writes.get(slot) {
                if *v != Slot::None {
                    return Some(v.clone());
                }
            }
            if let Some(v) = m.reads.get(slot) {
                if *v != Slot::None {
                    return Some(v.clone());
                }
            }
        }
        if let Some(cache) = self.0.cache.borrow().as_ref() {
            if let Some(v) = cache.get_slot(id, slot) {
                return Some(v);
            }
        }
        self.0.parent.as_ref().and_then(|p| p.slot_value_in_chain(id, slot))
    }

    /// Read `id`'s slot `i`: local write, else local read cache, else walk
    /// the parent chain and memoize the first hit into this World's local
    /// `reads[i]` (spec section 5, "readSlot").
    pub fn get_slot(&self, id: &Ref, slot: usize) -> Result<Slot> {
        self.bind(id)?;
        {
            let models = self.0.models.borrow();
            let m = models.get(id).expect("bind just inserted a local shadow");
            if slot >= m.slot_count() {
                return Err(ChronError::Malformed("slot index out of range"));
            }
            if m.writes[slot] != Slot::None {
                return Ok(m.writes[slot].clone());
            }
            if m.reads[slot] != Slot::None {
                return Ok(m.reads[slot].clone());
            }
        }
        let value = self.0.parent.as_ref().and_then(|p| p.slot_value_in_chain(id, slot)).unwrap_or(Slot::None);
        let mut models = self.0.models.borrow_mut();
        let m = models.get_mut(id).expect("local shadow exists");
        m.reads[slot] = value.clone();
        Ok(value)
    }

    /// Write `id`'s slot `i` in this World's local shadow. Fails with
    /// `LockedWrite` if this World has been locked, or `TypeMismatch` if
    /// `constraint` rejects `value`.
    pub fn write_slot(&self, id: &Ref, slot: usize, value: Slot, constraint: Option<SlotType>) -> Result<()> {
        if self.is_locked() {
            return Err(ChronError::LockedWrite);
        }
        if let Some(ty) = constraint {
            if !ty.accepts(&value) {
                return Err(ChronError::TypeMismatch { slot, expected: ty.name() });
            }
        }
        self.bind(id)?;
        let mut models = self.0.models.borrow_mut();
        let m = models.get_mut(id).expect("bind just inserted a local shadow");
        if slot >= m.slot_count() {
            return Err(ChronError::Malformed("slot index out of range"));
        }
        m.writes[slot] = value;
        Ok(())
    }

    /// Insert an already-built Model as-is, bypassing id generation. Used
    /// by the codec to reconstruct a decoded World with its original ids.
    pub fn install_model(&self, model: Model) {
        self.0.models.borrow_mut().insert(model.id.clone(), model);
    }

    /// The ids this World has its own local shadow for.
    pub fn local_ids(&self) -> Vec<Ref> {
        self.0.models.borrow().keys().cloned().collect()
    }

    /// Whether this World's local shadow of `id` (if any) has pending
    /// writes.
    pub fn has_local_writes(&self, id: &Ref) -> bool {
        self.0.models.borrow().get(id).map(|m| m.has_writes()).unwrap_or(false)
    }

    /// Mark this World and every ancestor immutable. Opportunistically
    /// builds a `LookupCache` flattening the uncached prefix of the
    /// ancestor chain once it exceeds `LOCK_CACHE_THRESHOLD` entries.
    pub fn lock(&self) {
        self.0.locked.set(true);
        if let Some(parent) = &self.0.parent {
            parent.lock();
        }
        if self.0.cache.borrow().is_some() {
            return;
        }
        let mut chain = Vec::new();
        let mut base: Option<LookupCache> = None;
        let mut cur = Some(self.clone());
        while let Some(w) = cur {
            if let Some(c) = w.0.cache.borrow().as_ref() {
                base = Some(c.clone());
                break;
            }
            let parent = w.0.parent.clone();
            chain.push(w);
            cur = parent;
        }
        if chain.len() <= LOCK_CACHE_THRESHOLD {
            return;
        }
        chain.reverse(); // root-most first, `self` last
        let mut flattened: HashMap<Ref, Model> = base.map(|c| c.flattened).unwrap_or_default();
        for world in &chain {
            for (id, model) in world.0.models.borrow().iter() {
                let entry = flattened
                    .entry(id.clone())
                    .or_insert_with(|| Model::new(id.clone(), model.class_name, model.slot_count()));
                for i in 0..model.slot_count() {
                    if model.writes[i] != Slot::None {
                        entry.writes[i] = model.writes[i].clone();
                    } else if model.reads[i] != Slot::None && entry.writes[i] == Slot::None {
                        entry.writes[i] = model.reads[i].clone();
                    }
                }
            }
        }
        *self.0.cache.borrow_mut() = Some(LookupCache { flattened });
    }

    /// Clear the locked flag and any cache, recursively up the chain.
    pub fn unlock(&self) {
        self.0.locked.set(false);
        *self.0.cache.borrow_mut() = None;
        if let Some(parent) = &self.0.parent {
            parent.unlock();
        }
    }

    /// Fold this World's local writes into its parent, after validating
    /// that every slot this World *read* still holds the value it observed
    /// (`CommitConflict` otherwise). A root World has nothing to commit
    /// into and succeeds trivially.
    pub fn commit(&self) -> Result<()> {
        let Some(parent) = self.0.parent.clone() else { return Ok(()) };
        let models = self.0.models.borrow();
        for (id, child) in models.iter() {
            for (slot, observed) in child.reads.iter().enumerate() {
                if *observed == Slot::None {
                    continue;
                }
                let current = parent.slot_value_in_chain(id, slot).unwrap_or(Slot::None);
                if current != *observed {
                    return Err(ChronError::CommitConflict { slot });
                }
            }
        }
        let mut parent_models = parent.0.models.borrow_mut();
        for (id, child) in models.iter() {
            let entry = parent_models
                .entry(id.clone())
                .or_insert_with(|| Model::new(id.clone(), child.class_name, child.slot_count()));
            for i in 0..child.slot_count() {
                if child.writes[i] != Slot::None {
                    entry.writes[i] = child.writes[i].clone();
                }
                if entry.reads[i] == Slot::None && child.reads[i] != Slot::None {
                    entry.reads[i] = child.reads[i].clone();
                }
            }
        }
        Ok(())
    }

    /// Remove this World from its parent's child list without checking the
    /// lock flag - used when a World is being discarded outright (e.g. a
    /// stale redo-stack entry) rather than committed.
    pub fn detach(&self) {
        if let Some(parent) = &self.0.parent {
            parent.0.children.borrow_mut().retain(|w| w.upgrade().map(|rc| !Rc::ptr_eq(&rc, &self.0)).unwrap_or(false));
        }
    }
}

impl Default for World {
    fn default() -> Self {
        World::new()
    }
}
