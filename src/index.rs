//! DomainIndex - cached bidirectional mapping between domains and vertex ids.
//!
//! All public inputs and outputs are normalized plain domains ("cnn.com").
//! The store's label notation is applied only at the store boundary.
//!
//! Entries are resolved on first lookup and kept for the lifetime of the
//! index (or until `clear()`); a capacity turns both directions into LRU
//! caches. Store lookups run outside the cache lock and the first writer
//! of an entry wins, so concurrent resolvers of one domain agree on it.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use lru::LruCache;

use crate::config::LabelNotation;
use crate::error::{DiscoveryError, Result};
use crate::graph::{GraphStore, VertexId};

/// Trim + ASCII-lowercase, the canonical form for every domain we see.
pub fn normalize_domain(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Seeds partitioned into graph vertices and unknown names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Normalized domain + vertex id, in first-occurrence order, no duplicates.
    pub resolved: Vec<(String, VertexId)>,
    pub missing: BTreeSet<String>,
}

impl Resolution {
    pub fn ids(&self) -> Vec<VertexId> {
        self.resolved.iter().map(|(_, id)| *id).collect()
    }

    pub fn domains(&self) -> Vec<String> {
        self.resolved.iter().map(|(d, _)| d.clone()).collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub domains: usize,
    pub vertices: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Hit rate (0.0-1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

struct DomainCache {
    by_domain: LruCache<String, VertexId>,
    by_vertex: LruCache<VertexId, String>,
    hits: u64,
    misses: u64,
}

pub struct DomainIndex {
    store: Arc<dyn GraphStore>,
    notation: LabelNotation,
    cache: Mutex<DomainCache>,
}

impl DomainIndex {
    /// `capacity: None` keeps every entry; `Some(n)` evicts least recently used.
    pub fn new(
        store: Arc<dyn GraphStore>,
        notation: LabelNotation,
        capacity: Option<usize>,
    ) -> Result<Self> {
        let (by_domain, by_vertex) = match capacity {
            None => (LruCache::unbounded(), LruCache::unbounded()),
            Some(n) => {
                let n = NonZeroUsize::new(n).ok_or_else(|| {
                    DiscoveryError::Config("cache capacity must be at least 1".to_string())
                })?;
                (LruCache::new(n), LruCache::new(n))
            }
        };

        Ok(Self {
            store,
            notation,
            cache: Mutex::new(DomainCache { by_domain, by_vertex, hits: 0, misses: 0 }),
        })
    }

    fn cache(&self) -> MutexGuard<'_, DomainCache> {
        // Entries are inserted whole; a panicked holder cannot leave one half-written.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Vertex id for a domain, or `None` if the graph does not contain it.
    pub fn lookup(&self, domain: &str) -> Result<Option<VertexId>> {
        self.lookup_normalized(&normalize_domain(domain))
    }

    fn lookup_normalized(&self, domain: &str) -> Result<Option<VertexId>> {
        if domain.is_empty() {
            return Ok(None);
        }

        {
            let mut guard = self.cache();
            let cache = &mut *guard;
            if let Some(id) = cache.by_domain.get(domain).copied() {
                cache.hits += 1;
                return Ok(Some(id));
            }
            cache.misses += 1;
        }

        let label = self.notation.to_store(domain);
        let Some(id) = self.store.domain_to_id(&label)? else {
            return Ok(None);
        };

        let mut guard = self.cache();
        let cache = &mut *guard;
        let id = *cache.by_domain.get_or_insert(domain.to_string(), || id);
        cache.by_vertex.get_or_insert(id, || domain.to_string());
        Ok(Some(id))
    }

    /// Domain for a vertex id, or `None` if the store has no label for it.
    ///
    /// Store labels are normalized like any other input, so a label stored
    /// as "com.CNN" comes back as "cnn.com" and is cached under that name.
    pub fn label(&self, id: VertexId) -> Result<Option<String>> {
        {
            let mut guard = self.cache();
            let cache = &mut *guard;
            if let Some(domain) = cache.by_vertex.get(&id).cloned() {
                cache.hits += 1;
                return Ok(Some(domain));
            }
            cache.misses += 1;
        }

        let Some(label) = self.store.id_to_domain(id)? else {
            return Ok(None);
        };
        let domain = normalize_domain(&self.notation.from_store(&label));

        let mut guard = self.cache();
        let cache = &mut *guard;
        let domain = cache.by_vertex.get_or_insert(id, || domain).clone();
        cache.by_domain.get_or_insert(domain.clone(), || id);
        Ok(Some(domain))
    }

    /// Partition names into resolved vertices and missing names.
    ///
    /// Unknown names never fail the call; only store failures do.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Resolution> {
        let mut resolution = Resolution::default();
        let mut seen = HashSet::new();

        for name in names {
            let domain = normalize_domain(name.as_ref());
            if !seen.insert(domain.clone()) {
                continue;
            }
            match self.lookup_normalized(&domain)? {
                Some(id) => resolution.resolved.push((domain, id)),
                None => {
                    resolution.missing.insert(domain);
                }
            }
        }

        Ok(resolution)
    }

    /// Domains for vertex ids reported by the store.
    ///
    /// An id the store cannot label is a snapshot mismatch and fails with
    /// `ConsistencyFault`.
    pub fn reverse_resolve<I>(&self, ids: I) -> Result<HashMap<VertexId, String>>
    where
        I: IntoIterator<Item = VertexId>,
    {
        let mut out = HashMap::new();
        for id in ids {
            if out.contains_key(&id) {
                continue;
            }
            let domain = self.label(id)?.ok_or_else(|| DiscoveryError::ConsistencyFault {
                vertex: id,
                node_count: self.store.node_count(),
            })?;
            out.insert(id, domain);
        }
        Ok(out)
    }

    /// (found, missing) in input order, normalized and de-duplicated.
    pub fn validate_seeds<S: AsRef<str>>(&self, seeds: &[S]) -> Result<(Vec<String>, Vec<String>)> {
        let mut found = Vec::new();
        let mut missing = Vec::new();
        let mut seen = HashSet::new();

        for seed in seeds {
            let domain = normalize_domain(seed.as_ref());
            if !seen.insert(domain.clone()) {
                continue;
            }
            if self.lookup_normalized(&domain)?.is_some() {
                found.push(domain);
            } else {
                missing.push(domain);
            }
        }

        Ok((found, missing))
    }

    /// Drop every cached entry; the next lookups go back to the store.
    pub fn clear(&self) {
        let mut cache = self.cache();
        cache.by_domain.clear();
        cache.by_vertex.clear();
        cache.hits = 0;
        cache.misses = 0;
    }

    pub fn stats(&self) -> CacheStats {
        let cache = self.cache();
        CacheStats {
            domains: cache.by_domain.len(),
            vertices: cache.by_vertex.len(),
            hits: cache.hits,
            misses: cache.misses,
        }
    }

    pub fn notation(&self) -> LabelNotation {
        self.notation
    }
}
