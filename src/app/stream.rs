//! `Stream<T>`: synchronous multicast with O(n) unsubscribe by closure
//! identity (spec section 4.6).

use std::cell::RefCell;
use std::rc::Rc;

/// A subscriber sees both the pushed value and an optional synthetic event
/// tag - e.g. `UNDO_REDO_TAG` - distinguishing a replay from genuine new
/// input.
pub type Subscriber<T> = Rc<dyn Fn(&T, Option<&str>)>;

/// Delivers pushed values to every current subscriber, in push order.
/// Subscribers are identified by the `Rc` handle returned from `subscribe`,
/// not by index, so one can unsubscribe mid-delivery without disturbing
/// others.
pub struct Stream<T> {
    subscribers: RefCell<Vec<Subscriber<T>>>,
}

impl<T> Default for Stream<T> {
    fn default() -> Self {
        Stream { subscribers: RefCell::new(Vec::new()) }
    }
}

impl<T> Stream<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, f: impl Fn(&T, Option<&str>) + 'static) -> Subscriber<T> {
        let handle: Subscriber<T> = Rc::new(f);
        self.subscribers.borrow_mut().push(Rc::clone(&handle));
        handle
    }

    pub fn unsubscribe(&self, handle: &Subscriber<T>) {
        self.subscribers.borrow_mut().retain(|s| !Rc::ptr_eq(s, handle));
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Deliver `value` to every current subscriber with no event tag.
    pub fn push(&self, value: &T) {
        self.push_tagged(value, None);
    }

    /// Deliver `value` to every current subscriber along with `tag`. The
    /// subscriber list is snapshotted first so a callback that unsubscribes
    /// (itself or a peer) doesn't panic on a re-entrant borrow.
    pub fn push_tagged(&self, value: &T, tag: Option<&str>) {
        let snapshot: Vec<_> = self.subscribers.borrow().clone();
        for sub in snapshot {
            sub(value, tag);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn delivers_to_all_subscribers_in_order() {
        let stream: Stream<i32> = Stream::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let a = Rc::clone(&seen);
        stream.subscribe(move |v, _tag| a.borrow_mut().push(*v));
        let b = Rc::clone(&seen);
        stream.subscribe(move |v, _tag| b.borrow_mut().push(*v * 10));

        stream.push(&3);
        assert_eq!(*seen.borrow(), vec![3, 30]);
    }

    #[test]
    fn unsubscribe_stops_future_delivery() {
        let stream: Stream<i32> = Stream::new();
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let handle = stream.subscribe(move |_, _tag| c.set(c.get() + 1));

        stream.push(&1);
        stream.unsubscribe(&handle);
        stream.push(&1);

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn push_tagged_carries_the_tag_to_subscribers() {
        let stream: Stream<i32> = Stream::new();
        let seen = Rc::new(RefCell::new(None));
        let s = Rc::clone(&seen);
        stream.subscribe(move |_, tag| *s.borrow_mut() = tag.map(str::to_string));

        stream.push_tagged(&1, Some("undo"));
        assert_eq!(*seen.borrow(), Some("undo".to_string()));

        stream.push(&1);
        assert_eq!(*seen.borrow(), None);
    }
}
