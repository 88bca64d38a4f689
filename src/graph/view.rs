//! GraphView - deduplicating, batching layer over a `GraphStore`.
//!
//! Store calls are blocking round-trips. For more than one vertex the view
//! fans fetches out over a rayon pool and hands each vertex's complete,
//! deduplicated neighbor set back over a channel, so the consumer merges
//! whole sets one at a time regardless of completion order.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::error::{DiscoveryError, Result};
use super::{neighbors, Direction, GraphStore, VertexId};

type Fetched = (VertexId, Result<BTreeSet<VertexId>>);

pub struct GraphView {
    store: Arc<dyn GraphStore>,
    /// `None` when configured for a single fetch thread.
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl GraphView {
    pub fn new(store: Arc<dyn GraphStore>, fetch_threads: usize) -> Result<Self> {
        let pool = if fetch_threads <= 1 {
            None
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(fetch_threads)
                .thread_name(|i| format!("graph-fetch-{}", i))
                .build()
                .map_err(|e| DiscoveryError::Config(format!("rayon pool: {e}")))?;
            Some(Arc::new(pool))
        };
        Ok(Self { store, pool })
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Deduplicated neighbors of one vertex.
    pub fn neighbors(&self, id: VertexId, direction: Direction) -> Result<BTreeSet<VertexId>> {
        fetch_set(self.store.as_ref(), id, direction)
    }

    pub fn predecessors(&self, id: VertexId) -> Result<BTreeSet<VertexId>> {
        self.neighbors(id, Direction::Backlinks)
    }

    pub fn successors(&self, id: VertexId) -> Result<BTreeSet<VertexId>> {
        self.neighbors(id, Direction::Outlinks)
    }

    pub fn predecessors_batch(&self, ids: &[VertexId]) -> Result<HashMap<VertexId, BTreeSet<VertexId>>> {
        self.neighbors_batch(ids, Direction::Backlinks)
    }

    pub fn successors_batch(&self, ids: &[VertexId]) -> Result<HashMap<VertexId, BTreeSet<VertexId>>> {
        self.neighbors_batch(ids, Direction::Outlinks)
    }

    /// Same result as calling `neighbors` per id; fetched concurrently.
    pub fn neighbors_batch(
        &self,
        ids: &[VertexId],
        direction: Direction,
    ) -> Result<HashMap<VertexId, BTreeSet<VertexId>>> {
        let mut stream = self.stream(ids, direction);
        let mut out = HashMap::with_capacity(ids.len());
        while let Some(fetched) = stream.next_before(None) {
            let (id, set) = fetched?;
            out.insert(id, set);
        }
        Ok(out)
    }

    /// Start fetching neighbor sets for `ids`; consume with `next_before`.
    ///
    /// Duplicate ids are fetched once.
    pub fn stream(&self, ids: &[VertexId], direction: Direction) -> NeighborStream {
        let mut seen = BTreeSet::new();
        let ids: VecDeque<VertexId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        let started = Instant::now();

        let pool = match &self.pool {
            Some(pool) if ids.len() > 1 => pool,
            // Sequential path: no pool overhead for a single seed or thread.
            _ => {
                return NeighborStream {
                    source: Source::Inline {
                        store: Arc::clone(&self.store),
                        pending: ids,
                        direction,
                    },
                    started,
                    cancelled: Arc::new(AtomicBool::new(false)),
                }
            }
        };

        let (tx, rx) = crossbeam_channel::unbounded::<Fetched>();
        let cancelled = Arc::new(AtomicBool::new(false));
        let remaining = ids.len();
        for id in ids {
            let tx = tx.clone();
            let store = Arc::clone(&self.store);
            let cancelled = Arc::clone(&cancelled);
            pool.spawn(move || {
                // Stream dropped (timeout, error): leave the worker to live streams.
                if cancelled.load(Ordering::Acquire) {
                    return;
                }
                let fetched = fetch_set(store.as_ref(), id, direction);
                let _ = tx.send((id, fetched));
            });
        }

        NeighborStream {
            source: Source::Channel { rx, remaining },
            started,
            cancelled,
        }
    }
}

/// One store fetch, deduplicated. A panicking store surfaces as
/// `GraphStoreUnavailable` instead of unwinding into the pool.
fn fetch_set<S: GraphStore + ?Sized>(
    store: &S,
    id: VertexId,
    direction: Direction,
) -> Result<BTreeSet<VertexId>> {
    let fetched = panic::catch_unwind(AssertUnwindSafe(|| neighbors(store, id, direction)))
        .map_err(|payload| {
            let reason = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            DiscoveryError::GraphStoreUnavailable(format!(
                "store panicked fetching vertex {}: {}",
                id, reason
            ))
        })?;
    Ok(fetched?.into_iter().collect())
}

enum Source {
    Inline {
        store: Arc<dyn GraphStore>,
        pending: VecDeque<VertexId>,
        direction: Direction,
    },
    Channel {
        rx: Receiver<Fetched>,
        remaining: usize,
    },
}

/// Neighbor sets arriving one complete vertex at a time.
pub struct NeighborStream {
    source: Source,
    started: Instant,
    /// Set on drop; queued fetches check it before calling the store.
    cancelled: Arc<AtomicBool>,
}

impl Drop for NeighborStream {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

impl NeighborStream {
    /// Next complete neighbor set, or `None` when every vertex was delivered.
    ///
    /// Fails with `Timeout` once `deadline` passes; a store failure for any
    /// vertex is returned as-is.
    pub fn next_before(
        &mut self,
        deadline: Option<Instant>,
    ) -> Option<Result<(VertexId, BTreeSet<VertexId>)>> {
        let started = self.started;
        let timeout = move || DiscoveryError::Timeout {
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        let expired = |deadline: Option<Instant>| deadline.is_some_and(|d| Instant::now() >= d);

        match &mut self.source {
            Source::Inline { store, pending, direction } => {
                let id = pending.pop_front()?;
                if expired(deadline) {
                    return Some(Err(timeout()));
                }
                let fetched = fetch_set(store.as_ref(), id, *direction);
                // The call itself cannot be interrupted; reject late results.
                if expired(deadline) {
                    return Some(Err(timeout()));
                }
                Some(fetched.map(|set| (id, set)))
            }
            Source::Channel { rx, remaining } => {
                if *remaining == 0 {
                    return None;
                }
                let received = match deadline {
                    Some(d) => rx.recv_deadline(d),
                    None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
                };
                match received {
                    Ok((id, fetched)) => {
                        *remaining -= 1;
                        Some(fetched.map(|set| (id, set)))
                    }
                    Err(RecvTimeoutError::Timeout) => Some(Err(timeout())),
                    Err(RecvTimeoutError::Disconnected) => Some(Err(
                        DiscoveryError::GraphStoreUnavailable(
                            "fetch worker exited without a result".to_string(),
                        ),
                    )),
                }
            }
        }
    }

    /// Vertices still to be delivered.
    pub fn remaining(&self) -> usize {
        match &self.source {
            Source::Inline { pending, .. } => pending.len(),
            Source::Channel { remaining, .. } => *remaining,
        }
    }
}
