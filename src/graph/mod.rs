//! Graph store capability and the views built on top of it

pub mod flat_file;
pub mod memory;
pub mod view;

pub use flat_file::FlatFileGraph;
pub use memory::{InMemoryGraph, InMemoryGraphBuilder};
pub use view::{GraphView, NeighborStream};

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Opaque vertex identifier assigned by the graph store.
///
/// Stable for the lifetime of one loaded snapshot; never compared across snapshots.
pub type VertexId = u64;

/// Which side of a seed vertex a discovery walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Vertices linking TO the seed (predecessors).
    Backlinks,
    /// Vertices the seed links TO (successors).
    Outlinks,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Backlinks => "backlinks",
            Direction::Outlinks => "outlinks",
        }
    }

    /// Orient a (neighbor, seed) pair the way the edge exists in the graph.
    pub fn orient<T>(&self, neighbor: T, seed: T) -> (T, T) {
        match self {
            Direction::Backlinks => (neighbor, seed),
            Direction::Outlinks => (seed, neighbor),
        }
    }
}

/// Static facts about the loaded graph snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub node_count: u64,
    pub edge_count: u64,
    pub version: Option<String>,
}

/// Capability interface over the external graph storage engine.
///
/// Every call may be a blocking round-trip to another process. Send + Sync
/// required because fetches for independent seeds run on worker threads.
pub trait GraphStore: Send + Sync {
    // === ADJACENCY ===

    /// Vertices with an edge into `id`. May contain duplicates.
    fn predecessors(&self, id: VertexId) -> Result<Vec<VertexId>>;

    /// Vertices `id` has an edge to. May contain duplicates.
    fn successors(&self, id: VertexId) -> Result<Vec<VertexId>>;

    // === LABELS ===

    /// Vertex id for a label in the store's own notation.
    fn domain_to_id(&self, label: &str) -> Result<Option<VertexId>>;

    /// Label (store notation) for a vertex id.
    fn id_to_domain(&self, id: VertexId) -> Result<Option<String>>;

    // === STATS ===

    fn node_count(&self) -> u64;

    fn edge_count(&self) -> u64;

    /// Snapshot tag, if the store versions its data.
    fn version(&self) -> Option<String> {
        None
    }

    // === FILTERED QUERIES ===

    /// Vertices adjacent to at least `min_shared` of `ids` in `direction`.
    ///
    /// Computed locally from single-vertex calls; a remote store can override
    /// this to filter on its side. Result is sorted and excludes `ids`.
    fn shared_neighbors(
        &self,
        ids: &[VertexId],
        min_shared: usize,
        direction: Direction,
    ) -> Result<Vec<VertexId>> {
        let seeds: BTreeSet<VertexId> = ids.iter().copied().collect();
        let mut counts: HashMap<VertexId, usize> = HashMap::new();
        for &id in &seeds {
            let neighbors: BTreeSet<VertexId> = neighbors(self, id, direction)?
                .into_iter()
                .filter(|n| !seeds.contains(n))
                .collect();
            for n in neighbors {
                *counts.entry(n).or_insert(0) += 1;
            }
        }
        let mut shared: Vec<VertexId> = counts
            .into_iter()
            .filter(|&(_, c)| c >= min_shared)
            .map(|(id, _)| id)
            .collect();
        shared.sort_unstable();
        Ok(shared)
    }

    fn snapshot(&self) -> SnapshotInfo {
        SnapshotInfo {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            version: self.version(),
        }
    }
}

/// Direction-aware neighbor fetch.
///
/// Free function rather than a trait method so the trait stays a plain
/// storage capability.
pub fn neighbors<S: GraphStore + ?Sized>(
    store: &S,
    id: VertexId,
    direction: Direction,
) -> Result<Vec<VertexId>> {
    match direction {
        Direction::Backlinks => store.predecessors(id),
        Direction::Outlinks => store.successors(id),
    }
}
