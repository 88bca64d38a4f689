//! Error types for the discovery engine

use std::collections::BTreeSet;

use thiserror::Error;

use crate::graph::VertexId;

pub type Result<T> = std::result::Result<T, DiscoveryError>;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("No valid seed domains found in graph (missing: {missing:?})")]
    NoValidSeeds { missing: BTreeSet<String> },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Graph store unavailable: {0}")]
    GraphStoreUnavailable(String),

    #[error("Vertex {vertex} has no label (snapshot has {node_count} vertices)")]
    ConsistencyFault { vertex: VertexId, node_count: u64 },

    #[error("Discovery deadline elapsed after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DiscoveryError {
    /// Get error code for callers that report errors over a wire or exit status
    pub fn code(&self) -> &'static str {
        match self {
            DiscoveryError::NoValidSeeds { .. } => "NO_VALID_SEEDS",
            DiscoveryError::InvalidArgument(_) => "INVALID_ARGUMENT",
            DiscoveryError::GraphStoreUnavailable(_) => "GRAPH_STORE_UNAVAILABLE",
            DiscoveryError::ConsistencyFault { .. } => "CONSISTENCY_FAULT",
            DiscoveryError::Timeout { .. } => "TIMEOUT",
            DiscoveryError::Config(_) => "CONFIG_ERROR",
            _ => "INTERNAL_ERROR",
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        DiscoveryError::InvalidArgument(msg.into())
    }
}
