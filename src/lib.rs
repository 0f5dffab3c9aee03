//! chrondoc: the runtime core of a collaborative, undoable document.
//!
//! Layers, bottom to top:
//! - [`pvec`] - a persistent bitmapped vector trie, the structural-sharing
//!   primitive everything else is built from.
//! - [`chron`] - an append-only log with stable cursors: a sequence CRDT.
//! - [`markup`] - marker ranges over a Chron, with boundary-sweep
//!   enumeration.
//! - [`world`] - an MVCC layer of typed Models stacked over a parent World.
//! - [`app`] - undo/redo stack discipline and wave-merge coalescing over a
//!   chain of Worlds.
//! - [`codec`] - a two-pass graph codec for persisting a World snapshot.
//!
//! This crate has no logging of its own (spec section 5): invariant
//! violations that indicate a bug in the core itself are `debug_assert!`s,
//! not log lines, and every recoverable failure is a typed [`ChronError`]
//! returned to the caller.

pub mod app;
pub mod chron;
pub mod codec;
pub mod error;
pub mod markup;
pub mod pvec;
pub mod world;

pub use app::{call, dispatch, CallRecord, MethodRegistry, Stream, Subscriber, Wave, WaveApp, WaveState, WireValue};
pub use chron::{Anchor, Atom, Chron, Cursor, Entry, EntryId, Offset, Range};
pub use codec::{decode, encode, GraphValue, ModelClass, TypeRegistry};
pub use error::{ChronError, Result};
pub use markup::{ChronMarkup, EnumerateOutcome, Marker, MarkerSet};
pub use pvec::V;
pub use world::{LookupCache, Model, Primitive, Ref, Slot, SlotType, Value, World};
