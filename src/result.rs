//! Discovery result model.
//!
//! Built fresh for every discovery call and immutable afterwards; callers
//! own it outright. Converters in `crate::convert` project it into other
//! shapes without touching it.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::Direction;

/// One ranked candidate domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredNode {
    pub domain: String,
    /// Distinct resolved seeds connected to this domain.
    pub connections: usize,
    /// `connections / resolved seeds * 100`, two decimals.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    pub direction: Direction,
    /// Resolved seed domains, in input order.
    pub seeds: Vec<String>,
    pub resolved_seed_count: usize,
    pub missing_seeds: BTreeSet<String>,
    pub min_connections: usize,
    /// Candidates passing the threshold, before `max_results` truncation.
    pub candidates_scanned: usize,
    /// Distinct non-seed neighbors before thresholding.
    pub unique_neighbors: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    nodes: Vec<DiscoveredNode>,
    edges: Vec<(String, String)>,
    metadata: ResultMetadata,
}

impl DiscoveryResult {
    pub fn new(
        nodes: Vec<DiscoveredNode>,
        edges: Vec<(String, String)>,
        metadata: ResultMetadata,
    ) -> Self {
        Self { nodes, edges, metadata }
    }

    /// Ranked nodes: connections descending, then domain ascending.
    pub fn nodes(&self) -> &[DiscoveredNode] {
        &self.nodes
    }

    /// Directed (from, to) pairs in the graph's own orientation.
    pub fn edges(&self) -> &[(String, String)] {
        &self.edges
    }

    pub fn metadata(&self) -> &ResultMetadata {
        &self.metadata
    }

    pub fn seeds(&self) -> &[String] {
        &self.metadata.seeds
    }

    pub fn node(&self, domain: &str) -> Option<&DiscoveredNode> {
        self.nodes.iter().find(|n| n.domain == domain)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for DiscoveryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DiscoveryResult({} nodes, {} edges, {} seeds)",
            self.nodes.len(),
            self.edges.len(),
            self.metadata.seeds.len()
        )
    }
}
