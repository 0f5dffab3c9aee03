//! WaveApp: the undo/redo stack discipline and wave-merge coalescing layered
//! over a chain of Worlds (spec section 4.6).

pub mod proxy;
pub mod stream;
pub mod wave;

pub use proxy::{call, dispatch, CallRecord, MethodRegistry, WireValue};
pub use stream::{Stream, Subscriber};
pub use wave::{resolve_tag, Wave, WaveState};

use crate::error::Result;
use crate::world::{Ref, Slot, SlotType, World};
use std::cell::RefCell;

/// The synthetic tag `undo`/`redo` re-emit onto the mutation stream so
/// watchers can tell a wave-merge replay from genuine new input.
pub const UNDO_REDO_TAG: &str = "undo";

/// A non-empty stack of Worlds (`worlds`), a `redo` stack of worlds popped
/// by `undo`, and the mutation `Stream` every applied call republishes the
/// live top world onto.
pub struct WaveApp {
    worlds: Vec<World>,
    redo: Vec<World>,
    wave: RefCell<WaveState>,
    mutations: Stream<World>,
}

impl WaveApp {
    pub fn new() -> Self {
        WaveApp {
            worlds: vec![World::new()],
            redo: Vec::new(),
            wave: RefCell::new(WaveState::new()),
            mutations: Stream::new(),
        }
    }

    pub fn top(&self) -> &World {
        self.worlds.last().expect("worlds is a non-empty stack")
    }

    pub fn root(&self) -> &World {
        self.worlds.first().expect("worlds is a non-empty stack")
    }

    pub fn mutations(&self) -> &Stream<World> {
        &self.mutations
    }

    pub fn depth(&self) -> usize {
        self.worlds.len()
    }

    /// Lock the top world and push a fresh mutable child above it.
    pub fn advance(&mut self) {
        self.top().lock();
        let child = self.top().child();
        self.worlds.push(child);
    }

    /// Move the top world to the redo stack and unlock the world beneath
    /// it. A no-op (returns `false`) if only the root remains.
    pub fn undo(&mut self) -> bool {
        if self.worlds.len() <= 1 {
            return false;
        }
        let top = self.worlds.pop().expect("checked len > 1");
        self.redo.push(top);
        let new_top = self.top();
        new_top.unlock();
        self.mutations.push_tagged(new_top, Some(UNDO_REDO_TAG));
        true
    }

    /// Pop the redo stack back onto `worlds`, locking the world beneath it
    /// (mirroring `advance`). A no-op (returns `false`) if redo is empty.
    pub fn redo(&mut self) -> bool {
        let Some(w) = self.redo.pop() else { return false };
        self.top().lock();
        self.worlds.push(w);
        self.mutations.push_tagged(self.top(), Some(UNDO_REDO_TAG));
        true
    }

    /// Collapse the entire history into the root by committing top-down,
    /// then clear the redo stack.
    pub fn flatten(&mut self) -> Result<()> {
        for i in (1..self.worlds.len()).rev() {
            self.worlds[i].commit()?;
        }
        let root = self.worlds[0].clone();
        self.worlds = vec![root];
        self.clean_redo_buffer();
        Ok(())
    }

    /// Discard every undone world, letting its reachable structures be
    /// reclaimed. The other of the two reclamation mechanisms named in spec
    /// section 5 (alongside `flatten`).
    pub fn clean_redo_buffer(&mut self) {
        for w in self.redo.drain(..) {
            w.detach();
        }
    }

    /// Run a mutating call: resolve the wave-merge decision, advance unless
    /// it merges into the live top, apply `f` to the (now mutable) top, then
    /// publish the result onto the mutation stream.
    pub fn call<R>(&mut self, tag: Option<Wave>, f: impl FnOnce(&World) -> Result<R>) -> Result<R> {
        let merges = self.wave.borrow_mut().decide(tag.as_ref());
        if !merges {
            self.advance();
        }
        let result = f(self.top())?;
        self.mutations.push(self.top());
        Ok(result)
    }

    /// Materialize a new Model in the top world and publish it.
    pub fn create(&mut self, class_name: &'static str, slot_count: usize) -> Result<Ref> {
        let id = self.top().create_model(class_name, slot_count)?;
        self.mutations.push(self.top());
        Ok(id)
    }

    /// Set a slot on the top world outside the wave-merge path (used for
    /// plain, unbatched assignment per spec section 6's `assign`).
    pub fn assign(&mut self, id: &Ref, slot: usize, value: Slot, constraint: Option<SlotType>) -> Result<()> {
        self.top().write_slot(id, slot, value, constraint)?;
        self.mutations.push(self.top());
        Ok(())
    }

    /// Subscribe to worlds that contain a locally-modified model for `id`.
    pub fn watch(&self, id: Ref, f: impl Fn(&World) + 'static) -> Subscriber<World> {
        let id = id.clone();
        self.mutations.subscribe(move |world, _tag| {
            if world.has_local_writes(&id) {
                f(world);
            }
        })
    }
}

impl Default for WaveApp {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{Primitive, Value};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[test]
    fn advance_then_undo_restores_prior_value() {
        let mut app = WaveApp::new();
        let id = app.create("Counter", 1).unwrap();
        app.assign(&id, 0, Slot::Value(Value::Primitive(Primitive::I64(1))), None).unwrap();

        app.advance();
        app.assign(&id, 0, Slot::Value(Value::Primitive(Primitive::I64(2))), None).unwrap();
        assert_eq!(app.top().get_slot(&id, 0).unwrap(), Slot::Value(Value::Primitive(Primitive::I64(2))));

        assert!(app.undo());
        assert_eq!(app.top().get_slot(&id, 0).unwrap(), Slot::Value(Value::Primitive(Primitive::I64(1))));

        assert!(app.redo());
        assert_eq!(app.top().get_slot(&id, 0).unwrap(), Slot::Value(Value::Primitive(Primitive::I64(2))));
    }

    #[test]
    fn undo_at_root_is_noop() {
        let mut app = WaveApp::new();
        assert!(!app.undo());
        assert_eq!(app.depth(), 1);
    }

    #[test]
    fn typing_wave_coalesces_into_one_frame() {
        let mut app = WaveApp::new();
        let id = app.create("Text", 1).unwrap();
        let depth_before = app.depth();

        for (i, rate) in [1.0, 2.0, 3.0].into_iter().enumerate() {
            let tag = Wave::new(resolve_tag("typing:doc", "doc", rate), rate);
            app.call(Some(tag), |w| w.write_slot(&id, 0, Slot::Value(Value::Primitive(Primitive::I64(i as i64))), None))
                .unwrap();
        }
        // first call always advances (no prior wave state); the following
        // two merge into that same frame.
        assert_eq!(app.depth(), depth_before + 1);
    }

    #[test]
    fn tag_change_breaks_the_wave_into_two_frames() {
        let mut app = WaveApp::new();
        let id = app.create("Text", 1).unwrap();
        let depth_before = app.depth();

        let tag_a = Wave::new(resolve_tag("typing:doc", "doc", 1.0), 1.0);
        app.call(Some(tag_a), |w| w.write_slot(&id, 0, Slot::Value(Value::Primitive(Primitive::I64(1))), None)).unwrap();

        let tag_b = Wave::new(resolve_tag("resize:doc", "doc", 2.0), 2.0);
        app.call(Some(tag_b), |w| w.write_slot(&id, 0, Slot::Value(Value::Primitive(Primitive::I64(2))), None)).unwrap();

        assert_eq!(app.depth(), depth_before + 2);
    }

    #[test]
    fn flatten_collapses_history_and_clears_redo() {
        let mut app = WaveApp::new();
        let id = app.create("Counter", 1).unwrap();
        app.advance();
        app.assign(&id, 0, Slot::Value(Value::Primitive(Primitive::I64(7))), None).unwrap();
        app.advance();
        app.assign(&id, 0, Slot::Value(Value::Primitive(Primitive::I64(9))), None).unwrap();
        app.undo();

        app.flatten().unwrap();
        assert_eq!(app.depth(), 1);
        assert_eq!(app.top().get_slot(&id, 0).unwrap(), Slot::Value(Value::Primitive(Primitive::I64(7))));
        assert!(!app.redo());
    }

    #[test]
    fn undo_and_redo_republish_with_the_synthetic_tag() {
        let mut app = WaveApp::new();
        let id = app.create("Counter", 1).unwrap();
        app.advance();
        app.assign(&id, 0, Slot::Value(Value::Primitive(Primitive::I64(1))), None).unwrap();

        let last_tag = Rc::new(RefCell::new(None));
        let seen = Rc::clone(&last_tag);
        let _sub = app.mutations().subscribe(move |_world, tag| *seen.borrow_mut() = tag.map(str::to_string));

        app.assign(&id, 0, Slot::Value(Value::Primitive(Primitive::I64(2))), None).unwrap();
        assert_eq!(*last_tag.borrow(), None);

        app.undo();
        assert_eq!(*last_tag.borrow(), Some(UNDO_REDO_TAG.to_string()));

        *last_tag.borrow_mut() = None;
        app.redo();
        assert_eq!(*last_tag.borrow(), Some(UNDO_REDO_TAG.to_string()));
    }

    #[test]
    fn watch_only_fires_for_locally_modified_model() {
        let mut app = WaveApp::new();
        let watched = app.create("Counter", 1).unwrap();
        let other = app.create("Counter", 1).unwrap();

        let fired = Rc::new(Cell::new(0));
        let f = Rc::clone(&fired);
        let _sub = app.watch(watched.clone(), move |_| f.set(f.get() + 1));

        app.advance();
        app.assign(&other, 0, Slot::Value(Value::Primitive(Primitive::I64(1))), None).unwrap();
        assert_eq!(fired.get(), 0);

        app.advance();
        app.assign(&watched, 0, Slot::Value(Value::Primitive(Primitive::I64(1))), None).unwrap();
        assert_eq!(fired.get(), 1);
    }
}
