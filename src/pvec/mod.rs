//! A persistent (structurally shared) vector: a bitmapped trie with fanout
//! 32. Used by Chron as the backing store for its entry log and by
//! ChronMarkup as the backing store for its marker list.
//!
//! Every mutating method returns a new `V<T>` and leaves `self` untouched;
//! untouched subtrees are shared (via `Arc`) between the old and new trees,
//! so an update costs O(log_32 n) new nodes rather than a full copy.

mod node;

use smallvec::smallvec;
use std::sync::Arc;
use node::{Node, BITS, FANOUT};

/// A persistent vector with fanout 32. Clone is O(1) (it just bumps an
/// `Arc` refcount on the root).
#[derive(Debug, Clone)]
pub struct V<T> {
    root: Arc<Node<T>>,
    shift: u32,
    length: usize,
}

impl<T: Clone> Default for V<T> {
    fn default() -> Self {
        // An empty Vec allocates nothing, so every `V::default()` is
        // equivalently cheap - there's no need for a process-wide singleton
        // to satisfy "empty vector is shared".
        V {
            root: Arc::new(Node::new_leaf()),
            shift: 0,
            length: 0,
        }
    }
}

impl<T: Clone> V<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Capacity representable by the current trie depth, i.e. `32^depth`.
    fn capacity(&self) -> usize {
        FANOUT.pow(self.shift / BITS + 1)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.length {
            return None;
        }
        self.root.get(index, self.shift)
    }

    pub fn last(&self) -> Option<&T> {
        if self.length == 0 {
            None
        } else {
            self.get(self.length - 1)
        }
    }

    /// Set index `i` to `v`. If `i >= length`, intermediate indices up to `i`
    /// are filled with `None` and `length` becomes `i + 1`. If `i` requires
    /// more depth than the tree currently has, the tree grows a level first
    /// (doubling its addressable shift).
    pub fn set(&self, index: usize, value: T) -> V<T> {
        let mut grown = self.clone();
        while index >= grown.capacity() {
            grown = grown.grow();
        }
        let new_root = grown.root.set(index, grown.shift, Some(value));
        V {
            root: Arc::new(new_root),
            shift: grown.shift,
            length: grown.length.max(index + 1),
        }
    }

    pub fn append(&self, value: T) -> V<T> {
        self.set(self.length, value)
    }

    /// Drop the last element. Shrinks a trie level when the top level
    /// collapses to a single populated child.
    pub fn pop(&self) -> V<T> {
        if self.length == 0 {
            return self.clone();
        }
        let new_len = self.length - 1;
        let cleared = self.root.set(new_len, self.shift, None);
        let mut out = V {
            root: Arc::new(cleared),
            shift: self.shift,
            length: new_len,
        };
        while out.shift > 0 {
            match out.root.as_ref() {
                Node::Interior(children) => {
                    let populated: Vec<_> = children
                        .iter()
                        .enumerate()
                        .filter(|(_, c)| c.is_some())
                        .collect();
                    if populated.len() <= 1 && children.first().and_then(|c| c.clone()).is_some() {
                        let only = children[0].clone().unwrap();
                        out = V {
                            root: only,
                            shift: out.shift - BITS,
                            length: out.length,
                        };
                    } else {
                        break;
                    }
                }
                Node::Leaf(_) => break,
            }
        }
        out
    }

    fn grow(&self) -> V<T> {
        V {
            root: Arc::new(Node::Interior(smallvec![Some(self.root.clone())])),
            shift: self.shift + BITS,
            length: self.length,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let mut out = Vec::with_capacity(self.length);
        self.root.for_each(self.shift, &mut out);
        out.into_iter()
    }

    pub fn find<F: Fn(&T) -> bool>(&self, pred: F) -> Option<&T> {
        self.iter().find(|v| pred(v))
    }

    /// Build a new vector containing only the elements for which `pred`
    /// returns true, preserving order. This necessarily rebuilds the trie -
    /// there's no sharing to be had once elements are removed from the
    /// middle.
    pub fn filter<F: Fn(&T) -> bool>(&self, pred: F) -> V<T> {
        let mut out = V::new();
        for item in self.iter() {
            if pred(item) {
                out = out.append(item.clone());
            }
        }
        out
    }
}

impl<T: Clone> FromIterator<T> for V<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut out = V::new();
        for item in iter {
            out = out.append(item);
        }
        out
    }
}
