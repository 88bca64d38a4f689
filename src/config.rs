//! Engine configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config.
//!
//! ```toml
//! label_notation = "reversed"   # store labels look like "com.cnn"
//! cache_capacity = 100000       # bound the domain cache (LRU); omit for unbounded
//! fetch_threads = 8             # 0 = available parallelism
//! timeout_ms = 30000            # default per-discovery deadline
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DiscoveryError, Result};

/// How the graph store spells domain labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelNotation {
    /// `www.cnn.com`
    #[default]
    Plain,
    /// `com.cnn.www` (CommonCrawl graph notation)
    Reversed,
}

impl LabelNotation {
    /// Normal domain -> store label.
    pub fn to_store(&self, domain: &str) -> String {
        match self {
            LabelNotation::Plain => domain.to_string(),
            LabelNotation::Reversed => reverse_labels(domain),
        }
    }

    /// Store label -> normal domain.
    pub fn from_store(&self, label: &str) -> String {
        // Reversal is an involution.
        self.to_store(label)
    }
}

fn reverse_labels(name: &str) -> String {
    name.rsplit('.').collect::<Vec<_>>().join(".")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub label_notation: LabelNotation,

    /// Max entries per direction in the domain cache. `None` = unbounded.
    pub cache_capacity: Option<usize>,

    /// Worker threads for neighbor fetches. 0 = available parallelism.
    pub fetch_threads: usize,

    /// Deadline applied to discoveries that do not set their own.
    pub timeout_ms: Option<u64>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            label_notation: LabelNotation::Plain,
            cache_capacity: None,
            fetch_threads: 0,
            timeout_ms: None,
        }
    }
}

impl DiscoveryConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| DiscoveryError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == Some(0) {
            return Err(DiscoveryError::Config(
                "cache_capacity must be at least 1 (omit it for an unbounded cache)".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolved worker count for neighbor fetches.
    pub fn effective_fetch_threads(&self) -> usize {
        if self.fetch_threads > 0 {
            return self.fetch_threads;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
