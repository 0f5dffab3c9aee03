use super::entry::EntryId;
use super::key::Key;

/// What a cursor is pinned to: a specific entry (preferred - O(1) to
/// resolve as long as the index is still in bounds) or a bare key (requires
/// a linear scan to resolve, but survives being carried somewhere that
/// doesn't have the entry's index handy, e.g. across a decode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    Entry(EntryId),
    Key(Key),
}

/// `-1` = just before the anchor, `+1` = just after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Offset {
    Before,
    After,
}

/// A position in a Chron that stays meaningful across inserts and deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cursor {
    pub anchor: Anchor,
    pub offset: Offset,
}

impl Cursor {
    pub fn new(anchor: Anchor, offset: Offset) -> Self {
        Cursor { anchor, offset }
    }

    pub fn before(anchor: Anchor) -> Self {
        Cursor::new(anchor, Offset::Before)
    }

    pub fn after(anchor: Anchor) -> Self {
        Cursor::new(anchor, Offset::After)
    }
}

/// A pair of cursors bracketing a span. Collapsed when `head == tail`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    pub head: Cursor,
    pub tail: Cursor,
}

impl Range {
    pub fn new(head: Cursor, tail: Cursor) -> Self {
        Range { head, tail }
    }

    pub fn collapsed(cursor: Cursor) -> Self {
        Range { head: cursor, tail: cursor }
    }

    pub fn is_collapsed(&self) -> bool {
        self.head == self.tail
    }
}
