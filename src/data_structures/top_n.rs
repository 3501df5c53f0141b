use std::{cmp::Ordering, collections::BinaryHeap};

use ordered_float::OrderedFloat;

/// Fixed-capacity collection of the best `capacity` items seen so far,
/// where "best" means the smallest `(distance, order)` key. `order` breaks
/// ties, so items with equal distance keep their insertion order.
#[derive(Debug)]
pub struct TopNHeap<T> {
    capacity: usize,
    heap: BinaryHeap<TopNEntry<T>>,
}

#[derive(Debug)]
struct TopNEntry<T> {
    distance: OrderedFloat<f32>,
    order: u64,
    item: T,
}

impl<T> TopNEntry<T> {
    fn key(&self) -> (OrderedFloat<f32>, u64) {
        (self.distance, self.order)
    }
}

impl<T> Eq for TopNEntry<T> {}

impl<T> PartialEq for TopNEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

// Max-heap on the key: the root is the entry evicted next.
impl<T> Ord for TopNEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl<T> PartialOrd for TopNEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> TopNHeap<T> {
    pub fn new(capacity: usize) -> Self {
        TopNHeap {
            capacity,
            heap: BinaryHeap::with_capacity(capacity.saturating_add(1).min(4096)),
        }
    }

    /// Offers an item. Returns `false` if it was rejected outright.
    pub fn push(&mut self, item: T, distance: f32, order: u64) -> bool {
        if self.capacity == 0 {
            return false;
        }
        let entry = TopNEntry {
            distance: OrderedFloat(distance),
            order,
            item,
        };
        if self.heap.len() < self.capacity {
            self.heap.push(entry);
            return true;
        }
        match self.heap.peek() {
            Some(worst) if entry < *worst => {
                self.heap.pop();
                self.heap.push(entry);
                true
            }
            _ => false,
        }
    }

    /// Distance of the entry that would be evicted next.
    pub fn worst_distance(&self) -> Option<f32> {
        self.heap.peek().map(|entry| entry.distance.into_inner())
    }

    pub fn is_full(&self) -> bool {
        self.heap.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Folds another heap's entries into this one, keeping their keys.
    pub fn merge(&mut self, other: TopNHeap<T>) {
        for entry in other.heap {
            self.push(entry.item, entry.distance.into_inner(), entry.order);
        }
    }

    /// Items ordered best first, paired with their distances.
    pub fn into_sorted_vec(self) -> Vec<(T, f32)> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|entry| (entry.item, entry.distance.into_inner()))
            .collect()
    }
}
