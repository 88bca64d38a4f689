//! Per-candidate connection counts across seeds.
//!
//! A seed's neighbor set is merged as a whole: `merge` takes the complete,
//! deduplicated set and attributes every member before returning, so the
//! final counts do not depend on the order seeds complete in.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::graph::VertexId;

pub struct NeighborTally {
    /// Resolved seed vertices, in seed order.
    seeds: Vec<VertexId>,
    seed_pos: HashMap<VertexId, usize>,
    /// Candidate -> positions (into `seeds`) of the seeds reaching it.
    reached_by: HashMap<VertexId, Vec<usize>>,
    merged: HashSet<VertexId>,
}

impl NeighborTally {
    pub fn new(seeds: &[VertexId]) -> Self {
        let seed_pos = seeds.iter().enumerate().map(|(pos, &id)| (id, pos)).collect();
        Self {
            seeds: seeds.to_vec(),
            seed_pos,
            reached_by: HashMap::new(),
            merged: HashSet::new(),
        }
    }

    /// Attribute one seed's complete neighbor set.
    ///
    /// Seed vertices are never candidates. Merging the same seed twice, or
    /// a vertex that is not a seed, is a no-op.
    pub fn merge(&mut self, seed: VertexId, neighbors: &BTreeSet<VertexId>) {
        let Some(&pos) = self.seed_pos.get(&seed) else {
            return;
        };
        if !self.merged.insert(seed) {
            return;
        }
        for &n in neighbors {
            if self.seed_pos.contains_key(&n) {
                continue;
            }
            self.reached_by.entry(n).or_default().push(pos);
        }
    }

    pub fn merged_count(&self) -> usize {
        self.merged.len()
    }

    /// Distinct non-seed neighbors seen so far.
    pub fn unique_neighbors(&self) -> usize {
        self.reached_by.len()
    }

    pub fn connection_count(&self, candidate: VertexId) -> usize {
        self.reached_by.get(&candidate).map_or(0, Vec::len)
    }

    /// Candidates with at least `min_connections` seeds, by count descending.
    ///
    /// Ties are ordered by vertex id only to keep this deterministic; the
    /// final order needs domain names (see `cutoff`).
    pub fn survivors(&self, min_connections: usize) -> Vec<(VertexId, usize)> {
        let mut out: Vec<(VertexId, usize)> = self
            .reached_by
            .iter()
            .map(|(&v, seeds)| (v, seeds.len()))
            .filter(|&(_, c)| c >= min_connections)
            .collect();
        out.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        out
    }

    /// Seeds reaching `candidate`, in seed order.
    pub fn seeds_of(&self, candidate: VertexId) -> Vec<VertexId> {
        let mut positions = self.reached_by.get(&candidate).cloned().unwrap_or_default();
        positions.sort_unstable();
        positions.into_iter().map(|p| self.seeds[p]).collect()
    }
}

/// Prefix of count-sorted `survivors` that can still appear in the top
/// `max_results` once ties are broken by name: everything above the count
/// at the cut plus every candidate tied with it.
pub fn cutoff(survivors: &[(VertexId, usize)], max_results: Option<usize>) -> &[(VertexId, usize)] {
    let Some(max) = max_results else {
        return survivors;
    };
    if max >= survivors.len() {
        return survivors;
    }
    if max == 0 {
        return &[];
    }
    let boundary = survivors[max - 1].1;
    let end = survivors
        .iter()
        .position(|&(_, c)| c < boundary)
        .unwrap_or(survivors.len());
    &survivors[..end]
}

/// `connections / seeds * 100`, rounded to two decimals.
pub fn percentage(connections: usize, seeds: usize) -> f64 {
    if seeds == 0 {
        return 0.0;
    }
    (connections as f64 * 10_000.0 / seeds as f64).round() / 100.0
}
