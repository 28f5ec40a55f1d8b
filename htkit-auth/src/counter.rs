//! Nonce counter.

use std::{collections::HashMap, mem};

/// Sentinel index for list ends.
const NIL: usize = usize::MAX;

/// A bounded LRU cache tracking how many times each server nonce has been
/// used.
///
/// The counter value for a nonce grows monotonically until the nonce is
/// evicted. The cache is not synchronized; callers serialize access.
pub struct NonceCounter {
    index: HashMap<String, usize>,
    nodes: Vec<Node>,
    head: usize,
    tail: usize,
    capacity: usize,
}

/// A recency list node.
struct Node {
    nonce: String,
    count: u32,
    prev: usize,
    next: usize,
}

impl NonceCounter {
    /// Create a new counter with a given capacity.
    ///
    /// The capacity is clamped to at least one entry.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);

        Self {
            index: HashMap::with_capacity(capacity),
            nodes: Vec::with_capacity(capacity),
            head: NIL,
            tail: NIL,
            capacity,
        }
    }

    /// Increment the counter for a given nonce and return the new value.
    ///
    /// An unknown nonce is inserted with value 1, evicting the least
    /// recently used nonce if the cache is full.
    pub fn next(&mut self, nonce: &str) -> u32 {
        if let Some(&i) = self.index.get(nonce) {
            self.detach(i);
            self.attach_front(i);

            self.nodes[i].count += 1;

            return self.nodes[i].count;
        }

        let i = if self.index.len() == self.capacity {
            // reuse the slot of the least recently used nonce
            let i = self.tail;

            self.detach(i);

            let node = &mut self.nodes[i];

            let evicted = mem::replace(&mut node.nonce, nonce.to_string());

            node.count = 1;

            self.index.remove(&evicted);

            i
        } else {
            self.nodes.push(Node {
                nonce: nonce.to_string(),
                count: 1,
                prev: NIL,
                next: NIL,
            });

            self.nodes.len() - 1
        };

        self.index.insert(nonce.to_string(), i);
        self.attach_front(i);

        1
    }

    /// Get the number of cached nonces.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Unlink a given node from the recency list.
    fn detach(&mut self, i: usize) {
        let Node { prev, next, .. } = self.nodes[i];

        if prev != NIL {
            self.nodes[prev].next = next;
        } else {
            self.head = next;
        }

        if next != NIL {
            self.nodes[next].prev = prev;
        } else {
            self.tail = prev;
        }
    }

    /// Link a given node at the most recently used end.
    fn attach_front(&mut self, i: usize) {
        self.nodes[i].prev = NIL;
        self.nodes[i].next = self.head;

        if self.head != NIL {
            self.nodes[self.head].prev = i;
        } else {
            self.tail = i;
        }

        self.head = i;
    }
}

#[cfg(test)]
mod tests {
    use super::NonceCounter;

    #[test]
    fn test_counts_are_contiguous() {
        let mut counter = NonceCounter::new(16);

        for expected in 1..=5 {
            assert_eq!(counter.next("a"), expected);
        }

        assert_eq!(counter.next("b"), 1);
        assert_eq!(counter.next("a"), 6);
    }

    #[test]
    fn test_capacity_is_clamped() {
        let mut counter = NonceCounter::new(0);

        assert_eq!(counter.next("a"), 1);
        assert_eq!(counter.next("a"), 2);

        // capacity 1: any new nonce evicts the previous one
        assert_eq!(counter.next("b"), 1);
        assert_eq!(counter.next("a"), 1);

        assert_eq!(counter.len(), 1);
    }

    #[test]
    fn test_lru_eviction_order() {
        let mut counter = NonceCounter::new(2);

        assert_eq!(counter.next("a"), 1);
        assert_eq!(counter.next("b"), 1);

        // a hit moves the nonce to the most recently used position
        assert_eq!(counter.next("a"), 2);

        // inserting c evicts b, not a
        assert_eq!(counter.next("c"), 1);
        assert_eq!(counter.next("a"), 3);
        assert_eq!(counter.next("b"), 1);

        assert_eq!(counter.len(), 2);
    }

    #[test]
    fn test_size_never_exceeds_capacity() {
        let mut counter = NonceCounter::new(4);

        for i in 0..64 {
            counter.next(&format!("nonce-{i}"));

            assert!(counter.len() <= 4);
        }
    }
}
