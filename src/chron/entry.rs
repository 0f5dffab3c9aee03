use super::key::Key;
use crate::error::{ChronError, Result};

/// An atom slot in the log: either a live value or the tombstone left behind
/// by a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom<T> {
    Value(T),
    Deleted,
}

impl<T> Atom<T> {
    pub fn is_deleted(&self) -> bool {
        matches!(self, Atom::Deleted)
    }

    pub fn as_value(&self) -> Option<&T> {
        match self {
            Atom::Value(v) => Some(v),
            Atom::Deleted => None,
        }
    }
}

/// Identity of an entry: its position in the backing vector plus the random
/// key assigned when it was inserted. Two entries are "the same" entry iff
/// both fields match; this is what lets a `Cursor` outlive a delete (the
/// entry at `index` is replaced, not removed, and keeps its key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId {
    pub index: usize,
    pub key: Key,
}

/// One immutable record in the log. Deletion produces a new `Entry` at the
/// same index with `atom` replaced by `Atom::Deleted`; `former`/`latter` are
/// untouched by a delete, so the logical walk is unaffected.
#[derive(Debug, Clone)]
pub struct Entry<T> {
    pub index: usize,
    pub key: Key,
    pub atom: Atom<T>,
    /// Logical predecessor entry index, or `None` at the start of the walk.
    pub former: Option<usize>,
    /// Logical successor entry index, or `None` at the end of the walk.
    pub latter: Option<usize>,
}

impl<T> Entry<T> {
    pub fn id(&self) -> EntryId {
        EntryId { index: self.index, key: self.key }
    }

    pub fn is_deleted(&self) -> bool {
        self.atom.is_deleted()
    }

    /// Fallible raw access to this entry's value. Unlike `Atom::as_value`'s
    /// `Option` (the one every iteration path in `chron::mod` uses, since
    /// those already filter tombstones out), this is for call sites that
    /// expect the entry to still be live and want an error, not a silent
    /// skip, when it isn't.
    pub fn data(&self) -> Result<&T> {
        self.atom.as_value().ok_or(ChronError::CorruptAccess("read .data on a deleted entry"))
    }
}
