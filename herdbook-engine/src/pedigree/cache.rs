//! Single-flight ancestor cache
//!
//! One [`OnceCell`] per normalized code. The first caller for a code runs
//! the resolver; concurrent callers for the same code await that result
//! instead of issuing their own lookup. Found and not-found answers are
//! cached. Failed lookups leave the cell empty, so a later caller retries.

use super::resolver::{AncestorResolver, ResolvedAncestor, ResolverError};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

type Slot = Arc<OnceCell<Option<Arc<ResolvedAncestor>>>>;

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Total lookups served
    pub lookups: usize,
    /// Lookups answered from an already-populated entry
    pub hits: usize,
    /// Calls made to the underlying resolver
    pub resolver_calls: usize,
}

/// Shared ancestor cache for one prediction run
#[derive(Debug, Default)]
pub struct AncestorCache {
    slots: Mutex<HashMap<String, Slot>>,
    lookups: AtomicUsize,
    hits: AtomicUsize,
    resolver_calls: AtomicUsize,
}

impl AncestorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached answer for `code`, or the resolver's answer on a miss
    ///
    /// `code` must already be normalized.
    pub async fn get_or_resolve(
        &self,
        code: &str,
        resolver: &dyn AncestorResolver,
    ) -> Result<Option<Arc<ResolvedAncestor>>, ResolverError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);

        let slot = {
            let mut slots = self.slots.lock().await;
            slots.entry(code.to_string()).or_default().clone()
        };

        if let Some(cached) = slot.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(cached.clone());
        }

        let value = slot
            .get_or_try_init(|| async {
                self.resolver_calls.fetch_add(1, Ordering::Relaxed);
                debug!(code, "Resolving ancestor");
                resolver.resolve(code).await.map(|found| found.map(Arc::new))
            })
            .await?;

        Ok(value.clone())
    }

    /// Answer already cached for `code`, without resolving
    ///
    /// `None` when nothing is cached; `Some(None)` when the code is cached as
    /// not found.
    pub async fn cached(&self, code: &str) -> Option<Option<Arc<ResolvedAncestor>>> {
        let slots = self.slots.lock().await;
        slots.get(code).and_then(|slot| slot.get().cloned())
    }

    /// Number of populated entries
    pub async fn len(&self) -> usize {
        let slots = self.slots.lock().await;
        slots.values().filter(|slot| slot.initialized()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            lookups: self.lookups.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            resolver_calls: self.resolver_calls.load(Ordering::Relaxed),
        }
    }
}
