//! Property-based tests for discovery
//!
//! Invariants that hold for every graph and seed set:
//! - Bounds: min_connections <= connections <= resolved seeds
//! - Seeds are never discovered
//! - Order: connections descending, domain ascending
//! - Edges only touch ranked nodes and seeds
//! - Fetch parallelism does not change the answer

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;
use webgraph_discovery::convert::to_adjacency_graph;
use webgraph_discovery::{
    Direction, DiscoveryConfig, DiscoveryEngine, DiscoveryOptions, DiscoveryResult, InMemoryGraph,
    VertexId,
};

// ============================================================================
// Strategies
// ============================================================================

#[derive(Debug, Clone)]
struct Case {
    node_count: usize,
    edges: Vec<(VertexId, VertexId)>,
    seeds: Vec<String>,
    min_connections: usize,
    max_results: Option<usize>,
}

fn label(i: usize) -> String {
    format!("d{:02}.com", i)
}

fn case_strategy() -> impl Strategy<Value = Case> {
    (2usize..24).prop_flat_map(|n| {
        let edges = prop::collection::vec((0..n as VertexId, 0..n as VertexId), 0..120);
        // Index n stands for a domain outside the graph.
        let seeds = prop::collection::vec(0..=n, 1..6);
        (Just(n), edges, seeds, 1usize..5, prop::option::of(0usize..8)).prop_map(
            |(node_count, edges, seeds, min_connections, max_results)| Case {
                node_count,
                edges,
                seeds: seeds.into_iter().map(label).collect(),
                min_connections,
                max_results,
            },
        )
    })
}

fn direction_strategy() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Backlinks), Just(Direction::Outlinks)]
}

fn run(case: &Case, direction: Direction, threads: usize) -> Option<DiscoveryResult> {
    let labels = (0..case.node_count).map(label).collect();
    let graph = InMemoryGraph::from_parts(labels, &case.edges).unwrap();
    let config = DiscoveryConfig { fetch_threads: threads, ..DiscoveryConfig::default() };
    let engine = DiscoveryEngine::new(Arc::new(graph), config).unwrap();

    let options = DiscoveryOptions {
        min_connections: case.min_connections,
        max_results: case.max_results,
        timeout: None,
    };
    // None when no seed resolves.
    engine.discover(&case.seeds, direction, &options).ok()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_connection_bounds(case in case_strategy(), direction in direction_strategy()) {
        let Some(result) = run(&case, direction, 1) else { return Ok(()); };
        let resolved = result.metadata().resolved_seed_count;
        for node in result.nodes() {
            prop_assert!(node.connections >= case.min_connections);
            prop_assert!(node.connections <= resolved);
        }
        if case.min_connections > resolved {
            prop_assert!(result.nodes().is_empty());
            prop_assert!(result.edges().is_empty());
        }
    }

    #[test]
    fn prop_seeds_never_discovered(case in case_strategy(), direction in direction_strategy()) {
        let Some(result) = run(&case, direction, 1) else { return Ok(()); };
        for seed in result.seeds() {
            prop_assert!(result.node(seed).is_none());
        }
    }

    #[test]
    fn prop_total_order(case in case_strategy(), direction in direction_strategy()) {
        let Some(result) = run(&case, direction, 1) else { return Ok(()); };
        for pair in result.nodes().windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(
                a.connections > b.connections
                    || (a.connections == b.connections && a.domain < b.domain)
            );
        }
        if let Some(max) = case.max_results {
            prop_assert!(result.len() <= max);
        }
        prop_assert!(result.metadata().candidates_scanned >= result.len());
    }

    #[test]
    fn prop_edges_touch_ranked_nodes(case in case_strategy(), direction in direction_strategy()) {
        let Some(result) = run(&case, direction, 1) else { return Ok(()); };
        let seeds: BTreeSet<&str> = result.seeds().iter().map(String::as_str).collect();

        for (from, to) in result.edges() {
            let (candidate, seed) = match direction {
                Direction::Backlinks => (from, to),
                Direction::Outlinks => (to, from),
            };
            prop_assert!(seeds.contains(seed.as_str()));
            prop_assert!(result.node(candidate).is_some());
        }

        let total: usize = result.nodes().iter().map(|n| n.connections).sum();
        prop_assert_eq!(total, result.edges().len());
    }

    #[test]
    fn prop_parallel_fetch_matches_sequential(
        case in case_strategy(),
        direction in direction_strategy(),
    ) {
        let sequential = run(&case, direction, 1);
        let pooled = run(&case, direction, 4);
        prop_assert_eq!(sequential, pooled);
    }

    #[test]
    fn prop_adjacency_round_trip(case in case_strategy(), direction in direction_strategy()) {
        let Some(result) = run(&case, direction, 1) else { return Ok(()); };
        let mut back = to_adjacency_graph(&result).edge_list();
        let mut original = result.edges().to_vec();
        back.sort();
        original.sort();
        prop_assert_eq!(back, original);
    }
}
