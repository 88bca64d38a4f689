//! In-memory graph store over compressed sparse row adjacency.
//!
//! Vertex ids are dense `0..n`. Forward and reverse adjacency are both kept
//! as (offsets, targets) pairs, so predecessors and successors are O(degree)
//! slices. Duplicate edges are stored as given; deduplication belongs to
//! `GraphView`.

use std::collections::HashMap;

use crate::error::{DiscoveryError, Result};
use super::{GraphStore, VertexId};

/// One direction of adjacency in CSR layout.
#[derive(Debug, Default)]
struct Csr {
    /// `offsets[v]..offsets[v + 1]` indexes `targets` for vertex `v`.
    offsets: Vec<usize>,
    targets: Vec<VertexId>,
}

impl Csr {
    /// Counting-sort `pairs` by their first element.
    fn build(node_count: usize, pairs: impl Iterator<Item = (VertexId, VertexId)> + Clone) -> Self {
        let mut offsets = vec![0usize; node_count + 1];
        for (from, _) in pairs.clone() {
            offsets[from as usize + 1] += 1;
        }
        for i in 0..node_count {
            offsets[i + 1] += offsets[i];
        }

        let mut cursor = offsets.clone();
        let mut targets = vec![0; offsets[node_count]];
        for (from, to) in pairs {
            let slot = &mut cursor[from as usize];
            targets[*slot] = to;
            *slot += 1;
        }

        Self { offsets, targets }
    }

    fn row(&self, id: VertexId) -> &[VertexId] {
        let id = id as usize;
        &self.targets[self.offsets[id]..self.offsets[id + 1]]
    }
}

/// Graph store held entirely in process memory.
#[derive(Debug)]
pub struct InMemoryGraph {
    labels: Vec<String>,
    label_index: HashMap<String, VertexId>,
    forward: Csr,
    reverse: Csr,
    edge_count: u64,
    version: Option<String>,
}

impl InMemoryGraph {
    /// Build from a label table (index = vertex id) and an edge list.
    ///
    /// Fails with `InvalidFormat` on duplicate labels or edges referencing
    /// ids outside `0..labels.len()`.
    pub fn from_parts(labels: Vec<String>, edges: &[(VertexId, VertexId)]) -> Result<Self> {
        let node_count = labels.len();

        let mut label_index = HashMap::with_capacity(node_count);
        for (id, label) in labels.iter().enumerate() {
            if label_index.insert(label.clone(), id as VertexId).is_some() {
                return Err(DiscoveryError::InvalidFormat(format!(
                    "duplicate vertex label '{}'",
                    label
                )));
            }
        }

        if let Some(&(src, dst)) = edges
            .iter()
            .find(|&&(src, dst)| src as usize >= node_count || dst as usize >= node_count)
        {
            return Err(DiscoveryError::InvalidFormat(format!(
                "edge {} -> {} references a vertex outside 0..{}",
                src, dst, node_count
            )));
        }

        let forward = Csr::build(node_count, edges.iter().copied());
        let reverse = Csr::build(node_count, edges.iter().map(|&(src, dst)| (dst, src)));

        Ok(Self {
            labels,
            label_index,
            forward,
            reverse,
            edge_count: edges.len() as u64,
            version: None,
        })
    }

    /// Tag this graph with a snapshot version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    fn check(&self, id: VertexId) -> Result<()> {
        if (id as usize) < self.labels.len() {
            Ok(())
        } else {
            Err(DiscoveryError::GraphStoreUnavailable(format!(
                "vertex {} is outside 0..{}",
                id,
                self.labels.len()
            )))
        }
    }
}

impl GraphStore for InMemoryGraph {
    fn predecessors(&self, id: VertexId) -> Result<Vec<VertexId>> {
        self.check(id)?;
        Ok(self.reverse.row(id).to_vec())
    }

    fn successors(&self, id: VertexId) -> Result<Vec<VertexId>> {
        self.check(id)?;
        Ok(self.forward.row(id).to_vec())
    }

    fn domain_to_id(&self, label: &str) -> Result<Option<VertexId>> {
        Ok(self.label_index.get(label).copied())
    }

    fn id_to_domain(&self, id: VertexId) -> Result<Option<String>> {
        Ok(self.labels.get(id as usize).cloned())
    }

    fn node_count(&self) -> u64 {
        self.labels.len() as u64
    }

    fn edge_count(&self) -> u64 {
        self.edge_count
    }

    fn version(&self) -> Option<String> {
        self.version.clone()
    }
}

/// Label-oriented builder, mostly for tests and small fixtures.
///
/// Ids are assigned in first-seen order.
#[derive(Debug, Default)]
pub struct InMemoryGraphBuilder {
    labels: Vec<String>,
    ids: HashMap<String, VertexId>,
    edges: Vec<(VertexId, VertexId)>,
}

impl InMemoryGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a vertex (no-op if already present) and return its id.
    pub fn vertex(&mut self, label: &str) -> VertexId {
        if let Some(&id) = self.ids.get(label) {
            return id;
        }
        let id = self.labels.len() as VertexId;
        self.labels.push(label.to_string());
        self.ids.insert(label.to_string(), id);
        id
    }

    pub fn edge(&mut self, src: &str, dst: &str) -> &mut Self {
        let src = self.vertex(src);
        let dst = self.vertex(dst);
        self.edges.push((src, dst));
        self
    }

    pub fn build(self) -> InMemoryGraph {
        let edges = self.edges;
        // Labels are unique and ids in range by construction.
        InMemoryGraph {
            forward: Csr::build(self.labels.len(), edges.iter().copied()),
            reverse: Csr::build(self.labels.len(), edges.iter().map(|&(s, d)| (d, s))),
            edge_count: edges.len() as u64,
            label_index: self.ids,
            labels: self.labels,
            version: None,
        }
    }
}
