//! The boundary-sweep enumeration algorithm from spec section 4.3: a
//! sweepline over sorted interval boundaries, bucketed by the (immutable)
//! entry index each boundary cursor resolves to, so deletions can't disturb
//! ordering.

use super::ChronMarkup;
use crate::chron::{Chron, Cursor, EntryId, Range};

/// Callbacks fired while walking a markup enumeration.
///
/// `filter` runs once per surviving marker before the sweep starts; return
/// `true` to include the marker, `false` to exclude it entirely.
pub trait MarkerSet<D> {
    fn add(&mut self, marker: &D, cursor: Cursor);
    fn delete(&mut self, marker: &D, cursor: Cursor);
    fn covered(&mut self, marker: &D, range: Range);
    fn filter(&mut self, marker: &D, range: Range) -> bool {
        let _ = (marker, range);
        true
    }
}

/// What the enumeration produced: the live entries visited, in order.
pub type EnumerateOutcome = Vec<EntryId>;

struct Bucket<D> {
    opens: Vec<(D, Range, Cursor)>,
    closes: Vec<(D, Cursor)>,
}

impl<D> Default for Bucket<D> {
    fn default() -> Self {
        Bucket { opens: Vec::new(), closes: Vec::new() }
    }
}

pub(crate) fn enumerate<D: Clone + PartialEq, T: Clone>(
    markup: &ChronMarkup<D>,
    chron: &Chron<T>,
    sink: &mut dyn MarkerSet<D>,
    range: Option<Range>,
) -> EnumerateOutcome {
    use std::collections::HashMap;

    // Step 1: bucket every surviving, filtered-in marker's two cursors by
    // the index of the entry they anchor to (root = bucket 0; no other
    // entry can ever have index 0).
    let mut buckets: HashMap<usize, Bucket<D>> = HashMap::new();
    for marker in markup.iter_markers() {
        let Some(marker_range) = marker.range else { continue };
        if !sink.filter(&marker.data, marker_range) {
            continue;
        }
        if let Some(head_entry) = chron.anchor_of(marker_range.head) {
            let key = head_entry.index;
            buckets.entry(key).or_default().opens.push((
                marker.data.clone(),
                marker_range,
                marker_range.head,
            ));
        }
        if let Some(tail_entry) = chron.anchor_of(marker_range.tail) {
            let key = tail_entry.index;
            buckets.entry(key).or_default().closes.push((marker.data.clone(), marker_range.tail));
        }
    }

    let mut active: Vec<(D, Range)> = Vec::new();

    let fire_open = |active: &mut Vec<(D, Range)>, sink: &mut dyn MarkerSet<D>, data: &D, r: Range, cursor: Cursor, silent: bool| {
        active.push((data.clone(), r));
        if !silent {
            sink.add(data, cursor);
        }
    };
    let fire_close = |active: &mut Vec<(D, Range)>, sink: &mut dyn MarkerSet<D>, data: &D, cursor: Cursor, silent: bool| {
        if let Some(pos) = active.iter().position(|(d, _)| d == data) {
            active.remove(pos);
            if !silent {
                sink.delete(data, cursor);
            }
        }
    };

    // Step 3: root-bucket heads (in insertion order), then root-bucket
    // tails (in reversed insertion order). Silent iff a range was given and
    // its head isn't the document's own head - root-anchored markers that
    // fall outside the query range should still update `active` but must
    // not surface visibly.
    let root_silent = range.map(|r| r.head != chron.head()).unwrap_or(false);
    if let Some(root_bucket) = buckets.remove(&0) {
        for (data, r, cursor) in &root_bucket.opens {
            fire_open(&mut active, sink, data, *r, *cursor, root_silent);
        }
        for (data, cursor) in root_bucket.closes.iter().rev() {
            fire_close(&mut active, sink, data, *cursor, root_silent);
        }
    }

    // Step 4: if a (possibly partial) range was given, walk the prefix from
    // the document head up to the query head, firing bucket events silently
    // so `active` reflects reality at the start of the query range. A
    // marker anchored to an entry that's since been deleted never opens
    // (matches: deleting a marked span leaves no visible add/delete, and no
    // silent "ghost" activation either).
    let query_range = range.unwrap_or_else(|| Range::new(chron.head(), chron.tail()));
    if let Some(r) = range {
        for entry in chron.range(Range::new(chron.head(), r.head)) {
            if entry.is_deleted() {
                continue;
            }
            if let Some(bucket) = buckets.get(&entry.index) {
                for (data, mr, cursor) in &bucket.opens {
                    fire_open(&mut active, sink, data, *mr, *cursor, true);
                }
                for (data, cursor) in bucket.closes.iter().rev() {
                    fire_close(&mut active, sink, data, *cursor, true);
                }
            }
        }
    }

    let active_at_start = active.clone();

    // Step 5: walk the query range itself. Deleted entries are skipped
    // entirely - no bucket firing, no yield - so a marker whose boundary
    // entry was deleted produces no event, matching spec section 8 S3.
    let mut visited = Vec::new();
    for entry in chron.range(query_range) {
        if entry.is_deleted() {
            continue;
        }
        if let Some(bucket) = buckets.get(&entry.index) {
            for (data, mr, cursor) in &bucket.opens {
                fire_open(&mut active, sink, data, *mr, *cursor, false);
            }
        }
        visited.push(entry.id());
        if let Some(bucket) = buckets.get(&entry.index) {
            for (data, cursor) in bucket.closes.iter().rev() {
                fire_close(&mut active, sink, data, *cursor, false);
            }
        }
    }

    // Step 6: markers open at both the start and the end of the query range
    // fully cover it without ever opening or closing inside it.
    for (data, r) in &active_at_start {
        if active.iter().any(|(d, _)| d == data) {
            sink.covered(data, *r);
        }
    }

    visited
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::chron::{Anchor, Chron};

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl MarkerSet<&'static str> for Recorder {
        fn add(&mut self, marker: &&'static str, _cursor: Cursor) {
            self.events.push(format!("add({marker})"));
        }
        fn delete(&mut self, marker: &&'static str, _cursor: Cursor) {
            self.events.push(format!("delete({marker})"));
        }
        fn covered(&mut self, marker: &&'static str, _range: Range) {
            self.events.push(format!("covered({marker})"));
        }
    }

    fn insert_str(chron: &mut Chron<char>, s: &str) -> Vec<EntryId> {
        let mut ids = Vec::new();
        for ch in s.chars() {
            let t = chron.tail();
            *chron = chron.insert(t, ch, None);
            ids.push(chron.anchor_of(chron.tail()).unwrap().id());
        }
        ids
    }

    /// Builds "Hello, world!" and a `(bold-range, [world's entry ids])` pair
    /// where the range anchors to the first and last character of "world"
    /// directly, the way a caller capturing the span of a just-inserted
    /// string would.
    fn build_hello_world() -> (Chron<char>, Range, Vec<EntryId>) {
        let mut c: Chron<char> = Chron::new();
        insert_str(&mut c, "Hello, ");
        let world_ids = insert_str(&mut c, "world");
        insert_str(&mut c, "!");

        let head = Cursor::before(Anchor::Entry(world_ids[0]));
        let tail = Cursor::after(Anchor::Entry(*world_ids.last().unwrap()));
        (c, Range::new(head, tail), world_ids)
    }

    #[test]
    fn s1_hello_world_bold_boundaries() {
        let (chron, range, _) = build_hello_world();
        let markup: ChronMarkup<&'static str> = ChronMarkup::new();
        let markup = markup.mark("bold", range);

        let mut rec = Recorder::default();
        markup.entries(&chron, &mut rec, None);
        assert_eq!(rec.events, vec!["add(bold)", "delete(bold)"]);
    }

    #[test]
    fn s3_deleting_marked_range_suppresses_events_but_keeps_range() {
        let (chron, range, world_ids) = build_hello_world();
        let markup: ChronMarkup<&'static str> = ChronMarkup::new();
        let markup = markup.mark("bold", range);

        let mut chron2 = chron.clone();
        for id in &world_ids {
            chron2 = chron2.delete(*id);
        }

        assert_eq!(markup.range_of(&"bold"), Some(range));

        let mut rec = Recorder::default();
        markup.entries(&chron2, &mut rec, None);
        assert!(rec.events.is_empty());

        // A subsequent insert at the former head cursor does not re-enter the marker.
        let chron3 = chron2.insert(range.head, 'X', None);
        let mut rec2 = Recorder::default();
        markup.entries(&chron3, &mut rec2, None);
        assert!(rec2.events.is_empty());
    }

    #[test]
    fn collapsed_range_fires_add_then_delete_immediately() {
        let mut c: Chron<char> = Chron::new();
        let ids = insert_str(&mut c, "x");
        let cursor = Cursor::before(Anchor::Entry(ids[0]));
        let markup: ChronMarkup<&'static str> = ChronMarkup::new();
        let markup = markup.mark("point", Range::collapsed(cursor));

        let mut rec = Recorder::default();
        markup.entries(&c, &mut rec, None);
        assert_eq!(rec.events, vec!["add(point)", "delete(point)"]);
    }

    #[test]
    fn covered_fires_when_marker_spans_entire_query_range() {
        let mut c: Chron<char> = Chron::new();
        let before_ids = insert_str(&mut c, "ab");
        let inner_ids = insert_str(&mut c, "cd");
        insert_str(&mut c, "ef");

        let outer = Range::new(
            Cursor::before(Anchor::Entry(before_ids[0])),
            Cursor::after(Anchor::Entry(*before_ids.last().unwrap())),
        );
        // marker covers the whole document, query range is just "ab": the
        // marker opened before the query range and is still open after it.
        let doc_range = Range::new(c.head(), c.tail());
        let markup: ChronMarkup<&'static str> = ChronMarkup::new();
        let markup = markup.mark("wide", doc_range);

        let mut rec = Recorder::default();
        markup.entries(&c, &mut rec, Some(outer));
        assert_eq!(rec.events, vec!["covered(wide)"]);

        let _ = inner_ids;
    }
}
