// Batch Pedigree Prediction
//
// Predicts many animals concurrently (bounded by `concurrency`) against a
// shared AncestorCache. Each row is independent: a missing or unresolved sire
// fails only that row, and missing optional ancestors are treated as
// omitted. Results come back in input order.

use super::cache::{AncestorCache, CacheStats};
use super::predictor::{predict, AncestorRole, PedigreePrediction};
use super::resolver::{normalize_code, AncestorResolver, ResolvedAncestor, ResolverError};
use crate::types::PedigreeInput;
use futures::stream::{self, StreamExt};
use herdbook_common::events::{EventBus, HerdEvent};
use herdbook_common::time;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// One animal to predict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PedigreeRequest {
    /// Caller's label for the animal being predicted
    pub target: String,
    #[serde(flatten)]
    pub ancestors: PedigreeInput,
}

impl PedigreeRequest {
    pub fn new(target: impl Into<String>, ancestors: PedigreeInput) -> Self {
        Self {
            target: target.into(),
            ancestors,
        }
    }
}

/// Row-level prediction failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PedigreeRowError {
    #[error("sire code is missing or empty")]
    MissingSire,

    #[error("sire '{code}' not found")]
    SireNotFound { code: String },

    #[error("sire lookup failed: {0}")]
    Lookup(#[from] ResolverError),
}

/// Outcome of one row
#[derive(Debug, Clone, PartialEq)]
pub struct PedigreeRowOutcome {
    pub target: String,
    pub result: Result<PedigreePrediction, PedigreeRowError>,
    /// Optional ancestors that were omitted and why
    pub notes: Vec<String>,
}

impl PedigreeRowOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

impl Serialize for PedigreeRowOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PedigreeRowOutcome", 4)?;
        state.serialize_field("target", &self.target)?;
        match &self.result {
            Ok(prediction) => {
                state.serialize_field("prediction", prediction)?;
                state.skip_field("error")?;
            }
            Err(e) => {
                state.skip_field("prediction")?;
                state.serialize_field("error", &e.to_string())?;
            }
        }
        state.serialize_field("notes", &self.notes)?;
        state.end()
    }
}

/// Result of a whole batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchPredictionReport {
    /// One outcome per request, in request order
    pub rows: Vec<PedigreeRowOutcome>,
    pub succeeded: usize,
    pub failed: usize,
    pub cache: CacheStats,
}

/// Concurrent batch predictor
pub struct BatchPredictor {
    resolver: Arc<dyn AncestorResolver>,
    cache: Arc<AncestorCache>,
    concurrency: usize,
    events: Option<EventBus>,
}

impl BatchPredictor {
    pub fn new(resolver: Arc<dyn AncestorResolver>, concurrency: usize) -> Self {
        Self {
            resolver,
            cache: Arc::new(AncestorCache::new()),
            concurrency: concurrency.max(1),
            events: None,
        }
    }

    /// Share an existing cache (e.g. across several batches)
    pub fn with_cache(mut self, cache: Arc<AncestorCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn cache(&self) -> &Arc<AncestorCache> {
        &self.cache
    }

    /// Predict one animal
    pub async fn predict_one(&self, request: &PedigreeRequest) -> PedigreeRowOutcome {
        let mut notes = Vec::new();
        let result = self.predict_row(request, &mut notes).await;

        if let Err(e) = &result {
            warn!(target_animal = %request.target, error = %e, "Pedigree prediction failed");
            if let Some(bus) = &self.events {
                bus.emit_lossy(HerdEvent::PredictionRowFailed {
                    target: request.target.clone(),
                    error: e.to_string(),
                    timestamp: time::now(),
                });
            }
        }

        PedigreeRowOutcome {
            target: request.target.clone(),
            result,
            notes,
        }
    }

    async fn predict_row(
        &self,
        request: &PedigreeRequest,
        notes: &mut Vec<String>,
    ) -> Result<PedigreePrediction, PedigreeRowError> {
        let sire_code = request
            .ancestors
            .sire
            .as_deref()
            .and_then(normalize_code)
            .ok_or(PedigreeRowError::MissingSire)?;

        let (sire, mgs, mggs) = tokio::join!(
            self.cache.get_or_resolve(&sire_code, self.resolver.as_ref()),
            self.resolve_optional(request.ancestors.mgs.as_deref()),
            self.resolve_optional(request.ancestors.mggs.as_deref()),
        );

        let sire = sire?.ok_or(PedigreeRowError::SireNotFound { code: sire_code })?;
        let mgs = self.optional_outcome(AncestorRole::Mgs, mgs, notes);
        let mggs = self.optional_outcome(AncestorRole::Mggs, mggs, notes);

        Ok(predict(
            &sire.traits,
            mgs.as_ref().map(|a| &a.traits),
            mggs.as_ref().map(|a| &a.traits),
        ))
    }

    async fn resolve_optional(&self, code: Option<&str>) -> Option<(String, LookupResult)> {
        let code = code.and_then(normalize_code)?;
        let result = self.cache.get_or_resolve(&code, self.resolver.as_ref()).await;
        Some((code, result))
    }

    /// Optional ancestor, or `None` with a note when it is not usable
    fn optional_outcome(
        &self,
        role: AncestorRole,
        lookup: Option<(String, LookupResult)>,
        notes: &mut Vec<String>,
    ) -> Option<Arc<ResolvedAncestor>> {
        let (code, result) = lookup?;
        match result {
            Ok(Some(ancestor)) => Some(ancestor),
            Ok(None) => {
                notes.push(format!("{} '{}' not found, treated as omitted", role.label(), code));
                None
            }
            Err(e) => {
                notes.push(format!("{} lookup failed ({}), treated as omitted", role.label(), e));
                None
            }
        }
    }

    /// Predict every request; rows run concurrently and report in input order
    pub async fn predict_batch(&self, requests: &[PedigreeRequest]) -> BatchPredictionReport {
        let start = time::now();

        let rows: Vec<PedigreeRowOutcome> = stream::iter(requests)
            .map(|request| self.predict_one(request))
            .buffered(self.concurrency)
            .collect()
            .await;

        let succeeded = rows.iter().filter(|r| r.is_ok()).count();
        let failed = rows.len() - succeeded;
        let cache = self.cache.stats();

        info!(
            rows = rows.len(),
            succeeded,
            failed,
            cache_hits = cache.hits,
            resolver_calls = cache.resolver_calls,
            elapsed_ms = time::elapsed_ms(start),
            "Pedigree batch completed"
        );

        BatchPredictionReport {
            rows,
            succeeded,
            failed,
            cache,
        }
    }
}

type LookupResult = Result<Option<Arc<ResolvedAncestor>>, ResolverError>;
