//! DiscoveryEngine - seed-based discovery over a `GraphStore`.
//!
//! Both discovery modes share one pipeline, parameterized by `Direction`:
//!
//! 1. validate arguments (before any store call)
//! 2. resolve seeds through the `DomainIndex`; unknown seeds are reported, not fatal
//! 3. fetch every seed's neighbor set through the `GraphView`
//! 4. merge each complete set into a `NeighborTally` (seeds excluded)
//! 5. keep candidates with `connections >= min_connections`
//! 6. rank by connections descending, domain ascending; truncate to `max_results`
//! 7. name the survivors and emit nodes plus the edges that reach them

pub mod tally;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::DiscoveryConfig;
use crate::error::{DiscoveryError, Result};
use crate::graph::{Direction, GraphStore, GraphView, SnapshotInfo, VertexId};
use crate::index::{CacheStats, DomainIndex, Resolution};
use crate::result::{DiscoveredNode, DiscoveryResult, ResultMetadata};
use tally::NeighborTally;

/// Per-call discovery parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Minimum distinct seeds a candidate must connect to. At least 1.
    pub min_connections: usize,
    /// Keep only the top N ranked nodes.
    pub max_results: Option<usize>,
    /// Deadline for the whole call; falls back to the engine config.
    pub timeout: Option<Duration>,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self::new(1)
    }
}

impl DiscoveryOptions {
    pub fn new(min_connections: usize) -> Self {
        Self {
            min_connections,
            max_results: None,
            timeout: None,
        }
    }

    pub fn max_results(mut self, n: usize) -> Self {
        self.max_results = Some(n);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build from signed inputs (CLI, bindings), rejecting negative values.
    pub fn from_raw(min_connections: i64, max_results: Option<i64>) -> Result<Self> {
        let min = usize::try_from(min_connections).map_err(|_| {
            DiscoveryError::invalid(format!("min_connections must be >= 1, got {}", min_connections))
        })?;
        let max = max_results
            .map(|m| {
                usize::try_from(m).map_err(|_| {
                    DiscoveryError::invalid(format!("max_results must be >= 0, got {}", m))
                })
            })
            .transpose()?;

        let options = Self { min_connections: min, max_results: max, timeout: None };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_connections < 1 {
            return Err(DiscoveryError::invalid(format!(
                "min_connections must be >= 1, got {}",
                self.min_connections
            )));
        }
        Ok(())
    }
}

pub struct DiscoveryEngine {
    config: DiscoveryConfig,
    view: GraphView,
    index: DomainIndex,
}

impl DiscoveryEngine {
    pub fn new(store: Arc<dyn GraphStore>, config: DiscoveryConfig) -> Result<Self> {
        config.validate()?;
        let view = GraphView::new(Arc::clone(&store), config.effective_fetch_threads())?;
        let index = DomainIndex::new(store, config.label_notation, config.cache_capacity)?;
        Ok(Self { config, view, index })
    }

    /// Engine with the default configuration.
    pub fn with_store(store: Arc<dyn GraphStore>) -> Result<Self> {
        Self::new(store, DiscoveryConfig::default())
    }

    /// Swap in another graph snapshot. The domain cache starts empty.
    pub fn reload(&mut self, store: Arc<dyn GraphStore>) -> Result<()> {
        let previous = self.view.store().version();
        self.view = GraphView::new(Arc::clone(&store), self.config.effective_fetch_threads())?;
        self.index = DomainIndex::new(store, self.config.label_notation, self.config.cache_capacity)?;
        tracing::info!(
            "reloaded graph snapshot ({:?} -> {:?})",
            previous,
            self.view.store().version()
        );
        Ok(())
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn snapshot(&self) -> SnapshotInfo {
        self.view.store().snapshot()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.index.stats()
    }

    /// Forget every cached domain <-> id entry, e.g. after the store was
    /// re-indexed in place. Swapping to a different snapshot is `reload`.
    pub fn clear_cache(&self) {
        self.index.clear();
        tracing::debug!("domain cache cleared");
    }

    // === DISCOVERY ===

    /// Domains linking TO at least `min_connections` of the seeds.
    pub fn discover_backlinks<S: AsRef<str>>(
        &self,
        seeds: &[S],
        options: &DiscoveryOptions,
    ) -> Result<DiscoveryResult> {
        self.discover(seeds, Direction::Backlinks, options)
    }

    /// Domains linked FROM at least `min_connections` of the seeds.
    pub fn discover_shared_outlinks<S: AsRef<str>>(
        &self,
        seeds: &[S],
        options: &DiscoveryOptions,
    ) -> Result<DiscoveryResult> {
        self.discover(seeds, Direction::Outlinks, options)
    }

    pub fn discover<S: AsRef<str>>(
        &self,
        seeds: &[S],
        direction: Direction,
        options: &DiscoveryOptions,
    ) -> Result<DiscoveryResult> {
        if seeds.is_empty() {
            return Err(DiscoveryError::invalid("seed list is empty"));
        }
        options.validate()?;

        let started = Instant::now();
        let deadline = options
            .timeout
            .or_else(|| self.config.default_timeout())
            .map(|t| started + t);

        let resolution = self.resolve_seeds(seeds)?;
        check_deadline(deadline, started)?;

        let seed_ids = resolution.ids();
        let mut tally = NeighborTally::new(&seed_ids);

        if options.min_connections > seed_ids.len() {
            tracing::debug!(
                "min_connections {} exceeds {} resolved seeds, skipping neighbor fetch",
                options.min_connections,
                seed_ids.len()
            );
        } else {
            let mut stream = self.view.stream(&seed_ids, direction);
            while let Some(fetched) = stream.next_before(deadline) {
                let (seed, neighbors) = fetched?;
                tally.merge(seed, &neighbors);
                tracing::debug!(
                    "processed {}/{} seeds ({} neighbors for vertex {})",
                    tally.merged_count(),
                    seed_ids.len(),
                    neighbors.len(),
                    seed
                );
            }
        }

        let survivors = tally.survivors(options.min_connections);
        let contenders = tally::cutoff(&survivors, options.max_results);
        let names = self
            .index
            .reverse_resolve(contenders.iter().map(|&(v, _)| v))?;
        check_deadline(deadline, started)?;

        let mut ranked: Vec<(VertexId, usize, &str)> = contenders
            .iter()
            .map(|&(v, c)| (v, c, names[&v].as_str()))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.2.cmp(b.2)));
        if let Some(max) = options.max_results {
            ranked.truncate(max);
        }

        let seed_names: HashMap<VertexId, &str> = resolution
            .resolved
            .iter()
            .map(|(d, id)| (*id, d.as_str()))
            .collect();

        let mut nodes = Vec::with_capacity(ranked.len());
        let mut edges = Vec::new();
        for &(v, connections, domain) in &ranked {
            nodes.push(DiscoveredNode {
                domain: domain.to_string(),
                connections,
                percentage: tally::percentage(connections, seed_ids.len()),
            });
            for seed in tally.seeds_of(v) {
                let (from, to) = direction.orient(domain, seed_names[&seed]);
                edges.push((from.to_string(), to.to_string()));
            }
        }

        tracing::info!(
            "{} discovery: {} seeds ({} missing), {} unique neighbors, {} with >= {} connections, returning {}",
            direction.as_str(),
            seed_ids.len(),
            resolution.missing.len(),
            tally.unique_neighbors(),
            survivors.len(),
            options.min_connections,
            nodes.len()
        );

        let metadata = ResultMetadata {
            direction,
            seeds: resolution.domains(),
            resolved_seed_count: seed_ids.len(),
            missing_seeds: resolution.missing,
            min_connections: options.min_connections,
            candidates_scanned: survivors.len(),
            unique_neighbors: tally.unique_neighbors(),
        };

        Ok(DiscoveryResult::new(nodes, edges, metadata))
    }

    /// Domains adjacent to at least `min_shared` seeds, names only.
    ///
    /// Filtering runs in the store (`GraphStore::shared_neighbors`), so no
    /// counts come back. `min_shared` defaults to every resolved seed.
    pub fn shared_neighbors<S: AsRef<str>>(
        &self,
        seeds: &[S],
        min_shared: Option<usize>,
        direction: Direction,
    ) -> Result<Vec<String>> {
        if seeds.is_empty() {
            return Err(DiscoveryError::invalid("seed list is empty"));
        }
        if min_shared == Some(0) {
            return Err(DiscoveryError::invalid("min_shared must be >= 1"));
        }

        let resolution = self.resolve_seeds(seeds)?;
        let ids = resolution.ids();
        let min_shared = min_shared.unwrap_or(ids.len());

        let shared = self.view.store().shared_neighbors(&ids, min_shared, direction)?;
        let names = self.index.reverse_resolve(shared.iter().copied())?;

        let mut domains: Vec<String> = names.into_values().collect();
        domains.sort();
        Ok(domains)
    }

    // === SEEDS & LOOKUPS ===

    /// (found, missing) seed domains, normalized, in input order.
    pub fn validate_seeds<S: AsRef<str>>(&self, seeds: &[S]) -> Result<(Vec<String>, Vec<String>)> {
        self.index.validate_seeds(seeds)
    }

    /// Deduplicated neighbor domains of one domain, sorted. Unknown domain -> empty.
    pub fn neighbors_of(&self, domain: &str, direction: Direction) -> Result<Vec<String>> {
        let Some(id) = self.index.lookup(domain)? else {
            return Ok(Vec::new());
        };
        let neighbors = self.view.neighbors(id, direction)?;
        let mut domains: Vec<String> =
            self.index.reverse_resolve(neighbors).map(|m| m.into_values().collect())?;
        domains.sort();
        Ok(domains)
    }

    pub fn domain_to_id(&self, domain: &str) -> Result<Option<VertexId>> {
        self.index.lookup(domain)
    }

    pub fn id_to_domain(&self, id: VertexId) -> Result<Option<String>> {
        self.index.label(id)
    }

    fn resolve_seeds<S: AsRef<str>>(&self, seeds: &[S]) -> Result<Resolution> {
        let resolution = self.index.resolve(seeds)?;
        if resolution.resolved.is_empty() {
            return Err(DiscoveryError::NoValidSeeds { missing: resolution.missing });
        }
        if !resolution.missing.is_empty() {
            tracing::warn!(
                "{} seed domains not in graph: {:?}",
                resolution.missing.len(),
                resolution.missing
            );
        }
        Ok(resolution)
    }
}

fn check_deadline(deadline: Option<Instant>, started: Instant) -> Result<()> {
    match deadline {
        Some(d) if Instant::now() >= d => Err(DiscoveryError::Timeout {
            elapsed_ms: started.elapsed().as_millis() as u64,
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LabelNotation;
    use crate::graph::{InMemoryGraph, InMemoryGraphBuilder};

    /// Seeds a,b,c; x -> a,b; y -> a,c; z -> a; a -> b (seed-to-seed); b -> x (outlink)
    fn scenario_graph() -> InMemoryGraph {
        let mut g = InMemoryGraphBuilder::new();
        g.edge("x.com", "a.com");
        g.edge("x.com", "b.com");
        g.edge("y.com", "a.com");
        g.edge("y.com", "c.com");
        g.edge("z.com", "a.com");
        g.edge("a.com", "b.com");
        g.edge("a.com", "q.com");
        g.edge("b.com", "q.com");
        g.edge("c.com", "q.com");
        g.edge("c.com", "r.com");
        g.build()
    }

    fn engine(threads: usize) -> DiscoveryEngine {
        let config = DiscoveryConfig { fetch_threads: threads, ..DiscoveryConfig::default() };
        DiscoveryEngine::new(Arc::new(scenario_graph()), config).unwrap()
    }

    #[test]
    fn test_backlinks_threshold_two() {
        let result = engine(1)
            .discover_backlinks(&["a.com", "b.com", "c.com"], &DiscoveryOptions::new(2))
            .unwrap();

        let domains: Vec<&str> = result.nodes().iter().map(|n| n.domain.as_str()).collect();
        assert_eq!(domains, vec!["x.com", "y.com"]);
        assert_eq!(result.nodes()[0].connections, 2);
        assert_eq!(result.nodes()[0].percentage, 66.67);
        assert_eq!(
            result.edges(),
            &[
                ("x.com".to_string(), "a.com".to_string()),
                ("x.com".to_string(), "b.com".to_string()),
                ("y.com".to_string(), "a.com".to_string()),
                ("y.com".to_string(), "c.com".to_string()),
            ]
        );
        assert_eq!(result.metadata().candidates_scanned, 2);
        assert_eq!(result.metadata().unique_neighbors, 3);
    }

    #[test]
    fn test_shared_outlinks_orientation() {
        let result = engine(4)
            .discover_shared_outlinks(&["a.com", "b.com", "c.com"], &DiscoveryOptions::new(2))
            .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.nodes()[0].domain, "q.com");
        assert_eq!(result.nodes()[0].connections, 3);
        assert_eq!(result.nodes()[0].percentage, 100.0);
        assert!(result.edges().iter().all(|(_, to)| to == "q.com"));
        assert_eq!(result.edges()[0], ("a.com".to_string(), "q.com".to_string()));
        assert_eq!(result.metadata().direction, Direction::Outlinks);
    }

    #[test]
    fn test_seed_to_seed_links_are_not_candidates() {
        // a -> b exists, but a is a seed.
        let result = engine(1)
            .discover_backlinks(&["a.com", "b.com"], &DiscoveryOptions::new(1))
            .unwrap();
        assert!(result.node("a.com").is_none());
        assert!(result.node("b.com").is_none());
    }

    #[test]
    fn test_max_results_truncates_after_ranking() {
        let result = engine(2)
            .discover_backlinks(&["a.com", "b.com", "c.com"], &DiscoveryOptions::new(1).max_results(2))
            .unwrap();

        // x,y have 2; z has 1. Tie x/y broken by name.
        let domains: Vec<&str> = result.nodes().iter().map(|n| n.domain.as_str()).collect();
        assert_eq!(domains, vec!["x.com", "y.com"]);
        assert_eq!(result.metadata().candidates_scanned, 3);
        assert!(result.edges().iter().all(|(from, _)| from != "z.com"));
    }

    #[test]
    fn test_missing_seeds_reported() {
        let result = engine(1)
            .discover_backlinks(&["a.com", "MISSING.xyz", "a.com"], &DiscoveryOptions::new(1))
            .unwrap();
        assert_eq!(result.metadata().resolved_seed_count, 1);
        assert!(result.metadata().missing_seeds.contains("missing.xyz"));
        assert_eq!(result.seeds(), &["a.com"]);
    }

    #[test]
    fn test_no_valid_seeds() {
        let err = engine(1)
            .discover_backlinks(&["nope.com"], &DiscoveryOptions::new(1))
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::NoValidSeeds { missing } if missing.contains("nope.com")));
    }

    #[test]
    fn test_invalid_arguments() {
        let e = engine(1);
        let empty: [&str; 0] = [];
        assert!(matches!(
            e.discover_backlinks(&empty, &DiscoveryOptions::new(1)),
            Err(DiscoveryError::InvalidArgument(_))
        ));
        assert!(matches!(
            e.discover_backlinks(&["a.com"], &DiscoveryOptions::new(0)),
            Err(DiscoveryError::InvalidArgument(_))
        ));
        assert!(matches!(
            DiscoveryOptions::from_raw(2, Some(-1)),
            Err(DiscoveryError::InvalidArgument(_))
        ));
        assert!(matches!(
            DiscoveryOptions::from_raw(-3, None),
            Err(DiscoveryError::InvalidArgument(_))
        ));
        assert_eq!(
            DiscoveryOptions::from_raw(2, Some(10)).unwrap(),
            DiscoveryOptions::new(2).max_results(10)
        );
    }

    #[test]
    fn test_min_connections_above_seed_count_is_empty() {
        let result = engine(1)
            .discover_backlinks(&["a.com", "b.com"], &DiscoveryOptions::new(3))
            .unwrap();
        assert!(result.is_empty());
        assert!(result.edges().is_empty());
    }

    #[test]
    fn test_shared_neighbors_names_only() {
        let e = engine(1);
        let all = e
            .shared_neighbors(&["a.com", "b.com"], None, Direction::Backlinks)
            .unwrap();
        assert_eq!(all, vec!["x.com".to_string()]);

        let any = e
            .shared_neighbors(&["a.com", "c.com"], Some(1), Direction::Outlinks)
            .unwrap();
        assert_eq!(any, vec!["b.com".to_string(), "q.com".to_string(), "r.com".to_string()]);
    }

    #[test]
    fn test_neighbors_of() {
        let e = engine(1);
        assert_eq!(
            e.neighbors_of("A.com", Direction::Backlinks).unwrap(),
            vec!["x.com".to_string(), "y.com".to_string(), "z.com".to_string()]
        );
        assert!(e.neighbors_of("nope.com", Direction::Outlinks).unwrap().is_empty());
    }

    #[test]
    fn test_clear_cache() {
        let e = engine(1);
        e.discover_backlinks(&["a.com"], &DiscoveryOptions::new(1)).unwrap();
        assert!(e.cache_stats().domains > 0);

        e.clear_cache();
        assert_eq!(e.cache_stats(), CacheStats::default());
        assert_eq!(e.domain_to_id("a.com").unwrap(), Some(1));
    }

    #[test]
    fn test_reload_clears_cache() {
        let mut e = engine(1);
        e.domain_to_id("a.com").unwrap();
        assert_eq!(e.cache_stats().domains, 1);

        let mut g = InMemoryGraphBuilder::new();
        g.edge("com.other", "com.thing");
        e.reload(Arc::new(g.build().with_version("v2"))).unwrap();

        assert_eq!(e.cache_stats().domains, 0);
        assert_eq!(e.snapshot().version.as_deref(), Some("v2"));
        assert_eq!(e.domain_to_id("a.com").unwrap(), None);
    }

    #[test]
    fn test_reversed_notation_round_trip() {
        let mut g = InMemoryGraphBuilder::new();
        g.edge("com.cnn.www", "com.bbc");
        let config = DiscoveryConfig {
            label_notation: LabelNotation::Reversed,
            ..DiscoveryConfig::default()
        };
        let e = DiscoveryEngine::new(Arc::new(g.build()), config).unwrap();

        let result = e.discover_backlinks(&["bbc.com"], &DiscoveryOptions::new(1)).unwrap();
        assert_eq!(result.nodes()[0].domain, "www.cnn.com");
        assert_eq!(e.id_to_domain(1).unwrap().as_deref(), Some("bbc.com"));
    }
}
