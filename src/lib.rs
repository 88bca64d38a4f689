//! Seed-based domain discovery over a web-link graph.
//!
//! Given seed domains, find the domains that link to many of them
//! (backlinks) or that many of them link to (shared outlinks), ranked by
//! how many distinct seeds each one connects to.
//!
//! ```no_run
//! use std::sync::Arc;
//! use webgraph_discovery::{DiscoveryEngine, DiscoveryOptions, FlatFileGraph};
//!
//! # fn main() -> webgraph_discovery::Result<()> {
//! let graph = FlatFileGraph::open("data/cc-main-2024-feb")?;
//! let engine = DiscoveryEngine::with_store(Arc::new(graph))?;
//! let result = engine.discover_backlinks(&["cnn.com", "bbc.com"], &DiscoveryOptions::new(2))?;
//! println!("{}", result);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod convert;
pub mod discovery;
pub mod error;
pub mod graph;
pub mod index;
pub mod result;

pub use config::{DiscoveryConfig, LabelNotation};
pub use convert::{DomainGraph, DomainNode, IndexedEdges};
pub use discovery::{DiscoveryEngine, DiscoveryOptions};
pub use error::{DiscoveryError, Result};
pub use graph::{
    Direction, FlatFileGraph, GraphStore, GraphView, InMemoryGraph, InMemoryGraphBuilder,
    SnapshotInfo, VertexId,
};
pub use index::{normalize_domain, CacheStats, DomainIndex};
pub use result::{DiscoveredNode, DiscoveryResult, ResultMetadata};
