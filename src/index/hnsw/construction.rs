use crate::index::neighbor::NeighborNode;

use super::HnswIndex;

impl HnswIndex {
    /// Links an already stored node into every layer it was assigned to.
    pub(super) fn index_vector(&mut self, id: usize) {
        let insert_level = self.links[id].len() - 1;
        let entry_point = match self.entry_point {
            Some(entry_point) => entry_point,
            None => {
                self.entry_point = Some(id);
                self.max_level = insert_level;
                return;
            }
        };

        let query = self.vectors[id].values.clone();
        let top_level = insert_level.min(self.max_level);
        let entry = self.greedy_descend(&query, entry_point, self.max_level, top_level);

        let mut entries = vec![entry];
        for level in (0..=top_level).rev() {
            let candidates =
                self.search_layer(&query, &entries, self.config.ef_construction, level);
            let selected = self.select_neighbors(&candidates, self.config.max_neighbors(level));

            self.links[id][level] = selected.clone();
            for neighbor in selected {
                self.connect(neighbor, id, level);
            }
            entries = candidates.iter().map(|candidate| candidate.id).collect();
        }

        if insert_level > self.max_level {
            self.entry_point = Some(id);
            self.max_level = insert_level;
        }
    }

    /// Adds the back edge `node -> new_neighbor`, re-pruning `node` when it
    /// overflows its neighbour budget.
    fn connect(&mut self, node: usize, new_neighbor: usize, level: usize) {
        let max_neighbors = self.config.max_neighbors(level);
        self.links[node][level].push(new_neighbor);
        if self.links[node][level].len() <= max_neighbors {
            return;
        }

        let mut candidates: Vec<NeighborNode> = self.links[node][level]
            .iter()
            .map(|&neighbor| NeighborNode::new(neighbor, self.node_distance(node, neighbor)))
            .collect();
        candidates.sort();
        self.links[node][level] = self.select_neighbors(&candidates, max_neighbors);
    }

    /// Diversity heuristic: a candidate is kept only if it is closer to the
    /// base than to every neighbour already kept. Pruned candidates fill
    /// any remaining slots in distance order.
    ///
    /// `candidates` must be sorted by distance to the base, best first.
    fn select_neighbors(&self, candidates: &[NeighborNode], max_neighbors: usize) -> Vec<usize> {
        let mut selected: Vec<usize> = Vec::with_capacity(max_neighbors);
        let mut pruned = Vec::new();

        for candidate in candidates {
            if selected.len() >= max_neighbors {
                break;
            }
            let diverse = selected.iter().all(|&kept| {
                self.node_distance(candidate.id, kept) >= candidate.distance.into_inner()
            });
            if diverse {
                selected.push(candidate.id);
            } else {
                pruned.push(candidate.id);
            }
        }

        for id in pruned {
            if selected.len() >= max_neighbors {
                break;
            }
            selected.push(id);
        }

        selected
    }
}
