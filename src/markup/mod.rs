//! ChronMarkup: a set of `(marker, range)` pairs over a Chron, with a
//! boundary-crossing enumeration algorithm consistent with deletions and
//! nested spans.

pub mod enumerate;

pub use enumerate::{EnumerateOutcome, MarkerSet};

use crate::chron::{Chron, EntryId, Range};
use crate::pvec::V;

/// Entries exceeding this many tombstoned (range = `None`) markers trigger a
/// compaction on the next `mark`, per spec section 4.3.
const COMPACT_THRESHOLD: usize = 16;

/// One marker slot: a typed identity (`data`) plus the range it currently
/// covers, or `None` if it has been `unmark`ed and is pending GC.
#[derive(Debug, Clone)]
pub struct Marker<D: Clone> {
    pub data: D,
    pub range: Option<Range>,
}

/// The set of markers over a single Chron's coordinate space. Cloning is
/// O(1) (structural sharing via the underlying persistent vector).
#[derive(Debug, Clone)]
pub struct ChronMarkup<D: Clone> {
    markers: V<Marker<D>>,
}

impl<D: Clone + PartialEq> Default for ChronMarkup<D> {
    fn default() -> Self {
        ChronMarkup { markers: V::new() }
    }
}

impl<D: Clone + PartialEq> ChronMarkup<D> {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_index(&self, data: &D) -> Option<usize> {
        (0..self.markers.length()).find(|&i| self.markers.get(i).map(|m| &m.data) == Some(data))
    }

    /// Replace any existing entry for `data` with `(data, range)`, appending
    /// if absent.
    pub fn mark(&self, data: D, range: Range) -> Self {
        self.set_marker(data, Some(range))
    }

    /// Mark `data` with a `None` range. Entries are garbage-collected lazily
    /// by `mark`'s compaction pass, not immediately.
    pub fn unmark(&self, data: D) -> Self {
        self.set_marker(data, None)
    }

    fn set_marker(&self, data: D, range: Option<Range>) -> Self {
        let entry = Marker { data, range };
        let markers = match self.find_index(&entry.data) {
            Some(i) => self.markers.set(i, entry),
            None => self.markers.append(entry),
        };
        let out = ChronMarkup { markers };
        let none_count = out.markers.iter().filter(|m| m.range.is_none()).count();
        if none_count > COMPACT_THRESHOLD {
            out.compact()
        } else {
            out
        }
    }

    fn compact(&self) -> Self {
        ChronMarkup { markers: self.markers.filter(|m| m.range.is_some()) }
    }

    pub fn range_of(&self, data: &D) -> Option<Range> {
        self.find_index(data).and_then(|i| self.markers.get(i)).and_then(|m| m.range)
    }

    pub fn iter_markers(&self) -> impl Iterator<Item = &Marker<D>> + '_ {
        self.markers.iter()
    }

    /// The central enumeration: sweeps `chron`'s entries (within `range`, or
    /// the whole document) firing `sink`'s callbacks at marker boundaries,
    /// and returns the identities of the live entries visited.
    pub fn entries<T: Clone>(
        &self,
        chron: &Chron<T>,
        sink: &mut dyn MarkerSet<D>,
        range: Option<Range>,
    ) -> Vec<EntryId> {
        enumerate::enumerate(self, chron, sink, range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chron::{Anchor, Cursor, Offset};

    fn cursor(key: u32) -> Cursor {
        Cursor::new(Anchor::Key(key), Offset::After)
    }

    #[test]
    fn mark_then_unmark_roundtrip() {
        let mk: ChronMarkup<&str> = ChronMarkup::new();
        let r = Range::new(cursor(1), cursor(2));
        let mk = mk.mark("bold", r);
        assert_eq!(mk.range_of(&"bold"), Some(r));
        let mk = mk.unmark("bold");
        assert_eq!(mk.range_of(&"bold"), None);
    }

    #[test]
    fn mark_replaces_existing_by_identity() {
        let mk: ChronMarkup<&str> = ChronMarkup::new();
        let r1 = Range::new(cursor(1), cursor(2));
        let r2 = Range::new(cursor(3), cursor(4));
        let mk = mk.mark("bold", r1).mark("bold", r2);
        assert_eq!(mk.range_of(&"bold"), Some(r2));
        assert_eq!(mk.iter_markers().count(), 1);
    }

    #[test]
    fn compacts_after_sixteen_tombstones() {
        let mut mk: ChronMarkup<u32> = ChronMarkup::new();
        for i in 0..20u32 {
            let r = Range::new(cursor(i), cursor(i));
            mk = mk.mark(i, r);
        }
        for i in 0..17u32 {
            mk = mk.unmark(i);
        }
        // compaction should have dropped the already-unmarked entries,
        // leaving only the still-live markers (17..20).
        let live = mk.iter_markers().filter(|m| m.range.is_some()).count();
        assert_eq!(live, 3);
        let none_count = mk.iter_markers().filter(|m| m.range.is_none()).count();
        assert!(none_count <= COMPACT_THRESHOLD);
    }
}
