use std::cmp::Ordering;

use ordered_float::OrderedFloat;

/// A graph node paired with its rank distance to some reference vector.
/// Ordered by distance, then by node id, so heaps and sorts are
/// deterministic.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct NeighborNode {
    pub id: usize,
    pub distance: OrderedFloat<f32>,
}

impl NeighborNode {
    pub fn new(id: usize, distance: f32) -> Self {
        NeighborNode {
            id,
            distance: OrderedFloat(distance),
        }
    }
}

impl Ord for NeighborNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for NeighborNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
