use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashSet},
};

use crate::index::neighbor::NeighborNode;

use super::HnswIndex;

impl HnswIndex {
    /// Descends from the top layer and runs a beam search of width `ef`
    /// on layer 0. Results are sorted best first.
    pub(super) fn search_knn(&self, query: &[f32], k: usize, ef: usize) -> Vec<NeighborNode> {
        let entry_point = match self.entry_point {
            Some(entry_point) => entry_point,
            None => return Vec::new(),
        };

        let entry = self.greedy_descend(query, entry_point, self.max_level, 0);
        let mut found = self.search_layer(query, &[entry], ef.max(k), 0);
        found.truncate(k);
        found
    }

    /// Walks each layer from `from_level` down to, but not including,
    /// `to_level`, always moving to the closest neighbour. Returns the node
    /// to start from on `to_level`.
    pub(super) fn greedy_descend(
        &self,
        query: &[f32],
        start: usize,
        from_level: usize,
        to_level: usize,
    ) -> usize {
        let mut current_id = start;
        let mut current_distance = self.distance_to(query, current_id);
        let mut level = from_level;

        while level > to_level {
            let mut changed = true;
            while changed {
                changed = false;
                for &neighbor in self.neighbors(current_id, level) {
                    let distance = self.distance_to(query, neighbor);
                    if distance < current_distance {
                        current_distance = distance;
                        current_id = neighbor;
                        changed = true;
                    }
                }
            }
            level -= 1;
        }

        current_id
    }

    /// Best-first search on one layer keeping at most `ef` results.
    pub(super) fn search_layer(
        &self,
        query: &[f32],
        entry_points: &[usize],
        ef: usize,
        level: usize,
    ) -> Vec<NeighborNode> {
        let mut visited = HashSet::new();
        let mut candidates = BinaryHeap::new();
        let mut top_candidates = BinaryHeap::new();

        for &entry in entry_points {
            if !visited.insert(entry) {
                continue;
            }
            let node = NeighborNode::new(entry, self.distance_to(query, entry));
            candidates.push(Reverse(node));
            top_candidates.push(node);
            if top_candidates.len() > ef {
                top_candidates.pop();
            }
        }

        while let Some(Reverse(current)) = candidates.pop() {
            let worst = match top_candidates.peek() {
                Some(worst) => *worst,
                None => break,
            };
            if current.distance > worst.distance && top_candidates.len() >= ef {
                break;
            }

            for &neighbor in self.neighbors(current.id, level) {
                if !visited.insert(neighbor) {
                    continue;
                }
                let node = NeighborNode::new(neighbor, self.distance_to(query, neighbor));
                let admits = top_candidates.len() < ef
                    || top_candidates.peek().map_or(true, |worst| node < *worst);
                if admits {
                    candidates.push(Reverse(node));
                    top_candidates.push(node);
                    if top_candidates.len() > ef {
                        top_candidates.pop();
                    }
                }
            }
        }

        top_candidates.into_sorted_vec()
    }
}
