use std::collections::{HashSet, VecDeque};

/// Bounded record of message ids already delivered.
///
/// Eviction is FIFO by insertion order; looking an id up never refreshes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenIds {
    order: VecDeque<String>,
    index: HashSet<String>,
    capacity: usize,
}

impl SeenIds {
    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            order: VecDeque::with_capacity(capacity),
            index: HashSet::with_capacity(capacity),
            capacity,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    /// Records `id`, evicting the oldest ids while at capacity.
    ///
    /// Returns `false` (and changes nothing) if the id is already present.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.index.contains(id) {
            return false;
        }
        while self.order.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.index.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(id.to_string());
        self.index.insert(id.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Ids from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}
