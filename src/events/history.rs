//! Bounded FIFO of recently emitted events, kept for inspection only.

use std::collections::VecDeque;

/// Fixed-capacity ring; pushing into a full ring evicts the oldest entry.
pub(crate) struct Ring<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T: Clone> Ring<T> {
    /// A `capacity` of 0 keeps nothing.
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub(crate) fn push(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// Chronological copy (oldest first) of the last `limit` entries.
    pub(crate) fn recent(&self, limit: Option<usize>) -> Vec<T> {
        let take = limit.unwrap_or(self.items.len()).min(self.items.len());
        self.items
            .iter()
            .skip(self.items.len() - take)
            .cloned()
            .collect()
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}
