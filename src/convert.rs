//! Projections of a `DiscoveryResult` into graph shapes for downstream tools.
//!
//! Every converter borrows the result and builds a new value, so one result
//! can feed any number of them.
//!
//! Node policy: every ranked node, every seed and every edge endpoint
//! becomes a node. Only ranked nodes carry connection attributes; seeds are
//! flagged with `is_seed`.

use std::collections::{BTreeSet, HashMap};
use std::fmt::Write as _;

use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::result::{DiscoveredNode, DiscoveryResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainNode {
    pub domain: String,
    pub is_seed: bool,
    /// `None` for seeds and other endpoints that were not ranked.
    pub connection_count: Option<usize>,
    pub percentage: Option<f64>,
}

impl DomainNode {
    fn bare(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            is_seed: false,
            connection_count: None,
            percentage: None,
        }
    }
}

/// Directed domain graph (petgraph) with a domain -> node index map.
#[derive(Debug, Clone, Default)]
pub struct DomainGraph {
    graph: DiGraph<DomainNode, ()>,
    by_domain: HashMap<String, NodeIndex>,
}

impl DomainGraph {
    /// Build from raw lists, for callers that never had a `DiscoveryResult`.
    pub fn from_parts(
        nodes: &[DiscoveredNode],
        edges: &[(String, String)],
        seeds: &[String],
    ) -> Self {
        let mut g = Self::default();

        for node in nodes {
            let idx = g.intern(&node.domain);
            let weight = &mut g.graph[idx];
            weight.connection_count = Some(node.connections);
            weight.percentage = Some(node.percentage);
        }
        for seed in seeds {
            let idx = g.intern(seed);
            g.graph[idx].is_seed = true;
        }
        for (from, to) in edges {
            let a = g.intern(from);
            let b = g.intern(to);
            g.graph.add_edge(a, b, ());
        }

        g
    }

    fn intern(&mut self, domain: &str) -> NodeIndex {
        if let Some(&idx) = self.by_domain.get(domain) {
            return idx;
        }
        let idx = self.graph.add_node(DomainNode::bare(domain));
        self.by_domain.insert(domain.to_string(), idx);
        idx
    }

    pub fn node(&self, domain: &str) -> Option<&DomainNode> {
        self.by_domain.get(domain).map(|&idx| &self.graph[idx])
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Edges as (from, to) domain pairs, in insertion order.
    pub fn edge_list(&self) -> Vec<(String, String)> {
        self.graph
            .raw_edges()
            .iter()
            .map(|e| {
                (
                    self.graph[e.source()].domain.clone(),
                    self.graph[e.target()].domain.clone(),
                )
            })
            .collect()
    }

    /// Domains with an edge into `domain`, sorted.
    pub fn linking_to(&self, domain: &str) -> Vec<&str> {
        self.adjacent(domain, petgraph::Direction::Incoming)
    }

    /// Domains `domain` has an edge to, sorted.
    pub fn linked_from(&self, domain: &str) -> Vec<&str> {
        self.adjacent(domain, petgraph::Direction::Outgoing)
    }

    fn adjacent(&self, domain: &str, dir: petgraph::Direction) -> Vec<&str> {
        let Some(&idx) = self.by_domain.get(domain) else {
            return Vec::new();
        };
        let mut out: Vec<&str> = self
            .graph
            .neighbors_directed(idx, dir)
            .map(|n| self.graph[n].domain.as_str())
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn graph(&self) -> &DiGraph<DomainNode, ()> {
        &self.graph
    }

    pub fn into_inner(self) -> DiGraph<DomainNode, ()> {
        self.graph
    }
}

pub fn to_adjacency_graph(result: &DiscoveryResult) -> DomainGraph {
    DomainGraph::from_parts(result.nodes(), result.edges(), result.seeds())
}

pub fn to_edge_list(result: &DiscoveryResult) -> Vec<(String, String)> {
    result.edges().to_vec()
}

/// Ranked nodes as TSV with a `domain	connections	percentage` header.
pub fn to_node_table(result: &DiscoveryResult) -> String {
    let mut out = String::from("domain\tconnections\tpercentage\n");
    for node in result.nodes() {
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{}\t{}\t{}", node.domain, node.connections, node.percentage);
    }
    out
}

/// Integer-indexed edges for array-based graph libraries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexedEdges {
    /// Sorted domain table; position is the node index.
    pub names: Vec<String>,
    pub edges: Vec<(usize, usize)>,
}

impl IndexedEdges {
    pub fn index_of(&self, domain: &str) -> Option<usize> {
        self.names.binary_search_by(|n| n.as_str().cmp(domain)).ok()
    }
}

pub fn to_indexed_edges(result: &DiscoveryResult) -> IndexedEdges {
    let mut names: BTreeSet<&str> = BTreeSet::new();
    names.extend(result.nodes().iter().map(|n| n.domain.as_str()));
    names.extend(result.seeds().iter().map(String::as_str));
    for (from, to) in result.edges() {
        names.insert(from);
        names.insert(to);
    }

    let positions: HashMap<&str, usize> = names.iter().enumerate().map(|(i, &n)| (n, i)).collect();
    let edges = result
        .edges()
        .iter()
        .map(|(from, to)| (positions[from.as_str()], positions[to.as_str()]))
        .collect();

    IndexedEdges {
        names: names.into_iter().map(str::to_string).collect(),
        edges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::fixtures::sample_result;

    #[test]
    fn test_adjacency_graph_includes_seeds() {
        let g = to_adjacency_graph(&sample_result());
        // 2 ranked + 3 seeds
        assert_eq!(g.node_count(), 5);
        assert_eq!(g.edge_count(), 5);

        let agg = g.node("news-agg.com").unwrap();
        assert_eq!(agg.connection_count, Some(3));
        assert_eq!(agg.percentage, Some(100.0));
        assert!(!agg.is_seed);

        let cnn = g.node("cnn.com").unwrap();
        assert!(cnn.is_seed);
        assert_eq!(cnn.connection_count, None);

        assert_eq!(g.linking_to("cnn.com"), vec!["blog-site.org", "news-agg.com"]);
        assert_eq!(g.linked_from("blog-site.org"), vec!["bbc.com", "cnn.com"]);
    }

    #[test]
    fn test_edge_list_round_trip() {
        let result = sample_result();
        let mut back = to_adjacency_graph(&result).edge_list();
        let mut original = to_edge_list(&result);
        back.sort();
        original.sort();
        assert_eq!(back, original);
    }

    #[test]
    fn test_converters_leave_result_untouched() {
        let result = sample_result();
        let _ = to_adjacency_graph(&result);
        let _ = to_indexed_edges(&result);
        let _ = to_node_table(&result);
        assert_eq!(result, sample_result());
    }

    #[test]
    fn test_from_parts_adds_unknown_endpoints() {
        let edges = vec![("x.com".to_string(), "a.com".to_string())];
        let g = DomainGraph::from_parts(&[], &edges, &[]);
        assert_eq!(g.node_count(), 2);
        let x = g.node("x.com").unwrap();
        assert!(!x.is_seed);
        assert_eq!(x.connection_count, None);
    }

    #[test]
    fn test_node_table() {
        let table = to_node_table(&sample_result());
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "domain\tconnections\tpercentage");
        assert_eq!(lines[1], "news-agg.com\t3\t100");
        assert_eq!(lines[2], "blog-site.org\t2\t66.67");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_indexed_edges() {
        let indexed = to_indexed_edges(&sample_result());
        assert_eq!(
            indexed.names,
            vec!["bbc.com", "blog-site.org", "cnn.com", "news-agg.com", "nyt.com"]
        );
        assert_eq!(indexed.edges.len(), 5);
        assert_eq!(indexed.edges[0], (3, 2));
        assert_eq!(indexed.index_of("nyt.com"), Some(4));
        assert_eq!(indexed.index_of("nope.com"), None);
    }
}
