//! Chron: an append-only, order-preserving log with stable cursors. Used as
//! a sequence CRDT primitive for text (atoms = codepoints) and as the
//! coordinate space ChronMarkup ranges live in.

mod cursor;
mod entry;
mod key;

pub use cursor::{Anchor, Cursor, Offset, Range};
pub use entry::{Atom, Entry, EntryId};
pub use key::{random_key, Key, ROOT_KEY};

use crate::error::{ChronError, Result};
use crate::pvec::V;
use rand::thread_rng;

/// The order-preserving log itself. Cloning is O(1) (structural sharing via
/// the underlying persistent vector).
#[derive(Debug, Clone)]
pub struct Chron<T: Clone> {
    log: V<Entry<T>>,
    last: usize,
}

impl<T: Clone> Default for Chron<T> {
    fn default() -> Self {
        let root = Entry {
            index: 0,
            key: ROOT_KEY,
            atom: Atom::Deleted,
            former: None,
            latter: None,
        };
        Chron {
            log: V::new().append(root),
            last: 0,
        }
    }
}

impl<T: Clone> Chron<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry_at(&self, index: usize) -> Option<&Entry<T>> {
        self.log.get(index)
    }

    /// Resolve a cursor's anchor to the entry currently holding that
    /// identity, or `None` if it can no longer be found (a bare key that was
    /// never inserted, or one transplanted from an unrelated Chron).
    fn resolve_anchor(&self, anchor: Anchor) -> Option<&Entry<T>> {
        match anchor {
            Anchor::Entry(id) => {
                let e = self.entry_at(id.index)?;
                if e.key == id.key {
                    Some(e)
                } else {
                    None
                }
            }
            Anchor::Key(key) => self.log.find(|e| e.key == key),
        }
    }

    /// The cursor bracketing the very start of the document.
    pub fn head(&self) -> Cursor {
        let root = self.entry_at(0).expect("root entry always present");
        Cursor::after(Anchor::Entry(root.id()))
    }

    /// The cursor bracketing the very end of the document.
    pub fn tail(&self) -> Cursor {
        let last = self.entry_at(self.last).expect("last entry always present");
        Cursor::after(Anchor::Entry(last.id()))
    }

    /// The entry immediately before `cursor`'s position, or `None` if the
    /// anchor can't be resolved or the position is the start of the log.
    pub fn prev_to(&self, cursor: Cursor) -> Option<&Entry<T>> {
        let anchor = self.resolve_anchor(cursor.anchor)?;
        match cursor.offset {
            Offset::After => Some(anchor),
            Offset::Before => anchor.former.and_then(|i| self.entry_at(i)),
        }
    }

    /// The entry immediately after `cursor`'s position, or `None` if the
    /// anchor can't be resolved or the position is the end of the log.
    pub fn next_to(&self, cursor: Cursor) -> Option<&Entry<T>> {
        let anchor = self.resolve_anchor(cursor.anchor)?;
        match cursor.offset {
            Offset::Before => Some(anchor),
            Offset::After => anchor.latter.and_then(|i| self.entry_at(i)),
        }
    }

    /// Resolve a cursor to the current entry of the same identity.
    pub fn anchor_of(&self, cursor: Cursor) -> Option<&Entry<T>> {
        self.resolve_anchor(cursor.anchor)
    }

    /// Fallible raw access to the live value at `id`, for callers that
    /// already expect the entry to exist and be live rather than treating
    /// either case as a silent no-op. `CorruptAccess` covers both a stale
    /// identity (the entry no longer resolves) and a resolved-but-tombstoned
    /// entry, since both mean the caller's assumption that `id` is live was
    /// wrong.
    pub fn entry_data(&self, id: EntryId) -> Result<&T> {
        match self.entry_at(id.index) {
            Some(e) if e.key == id.key => e.data(),
            _ => Err(ChronError::CorruptAccess("entry id does not resolve to a current, live entry")),
        }
    }

    /// Draw a fresh random key, suitable for passing to `insert`.
    pub fn random_key(&self) -> Key {
        random_key(&mut thread_rng())
    }

    /// Splice a new entry immediately after `prev_to(cursor)`. A no-op
    /// (returns a clone of `self`) if the cursor's anchor can't be resolved,
    /// per the spec's silent-no-op failure semantics.
    pub fn insert(&self, cursor: Cursor, atom: T, key: Option<Key>) -> Chron<T> {
        let prev = match self.prev_to(cursor) {
            Some(e) => e.clone(),
            None => return self.clone(),
        };
        let old_latter = prev.latter;
        let new_index = self.log.length();
        let new_entry = Entry {
            index: new_index,
            key: key.unwrap_or_else(|| self.random_key()),
            atom: Atom::Value(atom),
            former: Some(prev.index),
            latter: old_latter,
        };

        let mut log = self.log.append(new_entry);
        let mut updated_prev = prev.clone();
        updated_prev.latter = Some(new_index);
        log = log.set(prev.index, updated_prev);

        if let Some(ol_idx) = old_latter {
            let mut ol = log.get(ol_idx).expect("latter neighbour exists").clone();
            ol.former = Some(new_index);
            log = log.set(ol_idx, ol);
        }

        // The inserting cursor targets the physical tail iff nothing
        // currently follows `prev` - i.e. `prev` was itself the document's
        // rightmost entry.
        let last = if old_latter.is_none() { new_index } else { self.last };

        Chron { log, last }
    }

    /// Tombstone `entry`. A no-op if the entry no longer matches the current
    /// log at that index (stale identity) or is already deleted.
    pub fn delete(&self, entry: EntryId) -> Chron<T> {
        match self.entry_at(entry.index) {
            Some(e) if e.key == entry.key && !e.is_deleted() => {
                let mut replaced = e.clone();
                replaced.atom = Atom::Deleted;
                Chron {
                    log: self.log.set(entry.index, replaced),
                    last: self.last,
                }
            }
            _ => self.clone(),
        }
    }

    /// Lazily walk every entry (deleted and live) strictly between
    /// `next_to(range.head)` and `next_to(range.tail)`. Restartable: each
    /// call produces a fresh iterator borrowing `self`.
    pub fn range(&self, range: Range) -> RangeIter<'_, T> {
        let start = self.next_to(range.head).map(|e| e.index);
        let stop_at = self.next_to(range.tail).map(|e| e.index);
        RangeIter { chron: self, current: start, stop_at }
    }

    /// Like `range`, but over the whole document.
    pub fn range_all(&self) -> RangeIter<'_, T> {
        self.range(Range::new(self.head(), self.tail()))
    }

    /// Lazily walk the live atoms in `range` (or the whole document if
    /// `None`).
    pub fn data(&self, range: Option<Range>) -> impl Iterator<Item = &T> + '_ {
        let range = range.unwrap_or_else(|| Range::new(self.head(), self.tail()));
        self.range(range).filter_map(|e| e.atom.as_value())
    }

    /// Bundle `self` with `range` for convenient iteration.
    pub fn slice(&self, range: Range) -> ChronSlice<'_, T> {
        ChronSlice { chron: self, range }
    }
}

/// A lazy, restartable walk over entries in logical order. `stop_at` names
/// the index we must not yield (the position one past the queried range);
/// `None` means "walk to the physical end of the document".
pub struct RangeIter<'a, T: Clone> {
    chron: &'a Chron<T>,
    current: Option<usize>,
    stop_at: Option<usize>,
}

impl<'a, T: Clone> Iterator for RangeIter<'a, T> {
    type Item = &'a Entry<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.current?;
        if Some(idx) == self.stop_at {
            self.current = None;
            return None;
        }
        let entry = self.chron.entry_at(idx)?;
        self.current = entry.latter;
        Some(entry)
    }
}

/// Bundles a Chron with a range for convenient iteration (spec 4.2 `slice`).
#[derive(Clone, Copy)]
pub struct ChronSlice<'a, T: Clone> {
    pub chron: &'a Chron<T>,
    pub range: Range,
}

impl<'a, T: Clone> ChronSlice<'a, T> {
    pub fn entries(&self) -> RangeIter<'a, T> {
        self.chron.range(self.range)
    }

    pub fn data(&self) -> impl Iterator<Item = &'a T> + 'a {
        self.chron.range(self.range).filter_map(|e| e.atom.as_value())
    }
}

impl<'a, T: Clone> IntoIterator for ChronSlice<'a, T> {
    type Item = &'a Entry<T>;
    type IntoIter = RangeIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_data(c: &Chron<char>) -> String {
        c.data(None).collect()
    }

    #[test]
    fn empty_chron_has_no_data() {
        let c: Chron<char> = Chron::new();
        assert_eq!(collect_data(&c), "");
        assert_eq!(c.head(), c.tail());
    }

    #[test]
    fn sequential_append_preserves_order() {
        let mut c: Chron<char> = Chron::new();
        for ch in "hello".chars() {
            let tail = c.tail();
            c = c.insert(tail, ch, None);
        }
        assert_eq!(collect_data(&c), "hello");
    }

    #[test]
    fn repeated_insert_at_same_cursor_reverses() {
        // Inserting 'a' then 'b' then 'c' all at the *same* fixed cursor
        // (rather than advancing to the new tail each time) should produce
        // "cba": each insert lands immediately after the anchor, ahead of
        // the previous insert.
        let c: Chron<char> = Chron::new();
        let anchor = c.head();
        let c = c.insert(anchor, 'a', None);
        let c = c.insert(anchor, 'b', None);
        let c = c.insert(anchor, 'c', None);
        assert_eq!(collect_data(&c), "cba");
    }

    #[test]
    fn delete_omits_atom_and_is_idempotent() {
        let mut c: Chron<char> = Chron::new();
        let mut ids = vec![];
        for ch in "abc".chars() {
            let tail = c.tail();
            c = c.insert(tail, ch, None);
            ids.push(c.anchor_of(c.tail()).unwrap().id());
        }
        let b_id = ids[1];
        let once = c.delete(b_id);
        assert_eq!(collect_data(&once), "ac");
        let twice = once.delete(b_id);
        assert_eq!(collect_data(&twice), "ac");
        // idempotent identity: same log contents
        assert_eq!(twice.log.length(), once.log.length());
    }

    #[test]
    fn insert_against_unresolved_cursor_is_noop() {
        let c: Chron<char> = Chron::new();
        let bogus = Cursor::after(Anchor::Key(123456));
        let c2 = c.insert(bogus, 'x', None);
        assert_eq!(collect_data(&c2), "");
    }

    #[test]
    fn cursor_survives_delete_and_resolves_to_tombstone() {
        let mut c: Chron<char> = Chron::new();
        let tail = c.tail();
        c = c.insert(tail, 'x', None);
        let id = c.anchor_of(c.tail()).unwrap().id();
        let deleted = c.delete(id);
        let resolved = deleted.anchor_of(Cursor::after(Anchor::Entry(id)));
        assert!(resolved.is_some());
        assert!(resolved.unwrap().is_deleted());
    }

    #[test]
    fn entry_data_errors_on_deleted_or_stale_id() {
        let mut c: Chron<char> = Chron::new();
        let tail = c.tail();
        c = c.insert(tail, 'x', None);
        let id = c.anchor_of(c.tail()).unwrap().id();
        assert_eq!(c.entry_data(id), Ok(&'x'));

        let deleted = c.delete(id);
        assert_eq!(deleted.entry_data(id), Err(ChronError::CorruptAccess("read .data on a deleted entry")));

        let stale = EntryId { index: id.index, key: id.key.wrapping_add(1) };
        assert_eq!(
            deleted.entry_data(stale),
            Err(ChronError::CorruptAccess("entry id does not resolve to a current, live entry"))
        );
    }

    #[test]
    fn insert_in_middle_does_not_move_last() {
        let mut c: Chron<char> = Chron::new();
        for ch in "ac".chars() {
            let tail = c.tail();
            c = c.insert(tail, ch, None);
        }
        // find cursor just after 'a' (i.e. before 'c')
        let a_id = c.range_all().find(|e| e.atom.as_value() == Some(&'a')).unwrap().id();
        let before_c = Cursor::after(Anchor::Entry(a_id));
        let c = c.insert(before_c, 'b', None);
        assert_eq!(collect_data(&c), "abc");
    }
}
