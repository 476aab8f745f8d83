//! Batch pedigree prediction against a slow, counting resolver

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use herdbook_common::events::{EventBus, HerdEvent};
use herdbook_engine::pedigree::{
    AncestorCache, AncestorResolver, BatchPredictor, PedigreeRequest, PedigreeRowError, ResolvedAncestor,
    ResolverError,
};
use herdbook_engine::{CanonicalField, PedigreeInput, TraitVector};

/// Registry stand-in: counts calls per code, sleeps, fails codes listed in `flaky` once
struct SlowRegistry {
    tpi: HashMap<&'static str, f64>,
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    flaky: Vec<&'static str>,
}

impl SlowRegistry {
    fn new(flaky: Vec<&'static str>) -> Self {
        Self {
            tpi: HashMap::from([("S1", 2500.0), ("S2", 2700.0), ("M1", 2600.0), ("G1", 2400.0)]),
            calls: Mutex::new(HashMap::new()),
            total: AtomicUsize::new(0),
            flaky,
        }
    }

    fn calls_for(&self, code: &str) -> usize {
        self.calls.lock().unwrap().get(code).copied().unwrap_or(0)
    }
}

#[async_trait]
impl AncestorResolver for SlowRegistry {
    async fn resolve(&self, code: &str) -> Result<Option<ResolvedAncestor>, ResolverError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(code.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        self.total.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(25)).await;

        if call == 1 && self.flaky.iter().any(|f| *f == code) {
            return Err(ResolverError::new(code, "connection reset"));
        }
        Ok(self.tpi.get(code).map(|tpi| {
            let mut traits = TraitVector::new();
            traits.insert(CanonicalField::Tpi, Some(*tpi));
            ResolvedAncestor {
                code: code.to_string(),
                display_name: format!("Bull {}", code),
                traits,
            }
        }))
    }
}

fn request(target: &str, sire: &str, mgs: Option<&str>, mggs: Option<&str>) -> PedigreeRequest {
    PedigreeRequest::new(
        target,
        PedigreeInput {
            sire: Some(sire.to_string()),
            mgs: mgs.map(str::to_string),
            mggs: mggs.map(str::to_string),
        },
    )
}

#[tokio::test]
async fn shared_ancestors_resolve_once() {
    let registry = Arc::new(SlowRegistry::new(Vec::new()));
    let predictor = BatchPredictor::new(registry.clone(), 8);

    let requests: Vec<PedigreeRequest> = (0..24)
        .map(|i| {
            let sire = if i % 2 == 0 { "S1" } else { "s2" };
            request(&format!("calf-{}", i), sire, Some("M1"), Some("G1"))
        })
        .collect();
    let report = predictor.predict_batch(&requests).await;

    assert_eq!(report.succeeded, 24);
    assert_eq!(report.failed, 0);
    for code in ["S1", "S2", "M1", "G1"] {
        assert_eq!(registry.calls_for(code), 1, "code {}", code);
    }
    assert_eq!(report.cache.resolver_calls, 4);
    assert_eq!(report.cache.lookups, 24 * 3);

    for (i, row) in report.rows.iter().enumerate() {
        assert_eq!(row.target, format!("calf-{}", i));
    }
}

#[tokio::test]
async fn failed_sire_lookup_is_retried_by_later_batch() {
    let registry = Arc::new(SlowRegistry::new(vec!["S1"]));
    let cache = Arc::new(AncestorCache::new());
    let predictor = BatchPredictor::new(registry.clone(), 1).with_cache(cache.clone());

    let first = predictor.predict_batch(&[request("calf", "S1", None, None)]).await;
    assert!(matches!(first.rows[0].result, Err(PedigreeRowError::Lookup(_))));
    assert!(cache.cached("S1").await.is_none());

    let second = predictor.predict_batch(&[request("calf", "S1", None, None)]).await;
    let prediction = second.rows[0].result.as_ref().unwrap();
    assert_eq!(prediction.get(CanonicalField::Tpi), Some(2500.0));
    assert_eq!(registry.calls_for("S1"), 2);
}

#[tokio::test]
async fn row_failures_are_published() {
    let events = EventBus::new(16);
    let mut rx = events.subscribe();
    let predictor = BatchPredictor::new(Arc::new(SlowRegistry::new(Vec::new())), 2).with_events(events);

    let report = predictor
        .predict_batch(&[
            request("good", "S1", Some("UNKNOWN"), None),
            request("orphan", "NOBODY", Some("M1"), None),
        ])
        .await;

    assert!(report.rows[0].is_ok());
    assert_eq!(report.rows[0].notes.len(), 1);
    assert_eq!(
        report.rows[1].result,
        Err(PedigreeRowError::SireNotFound { code: "NOBODY".to_string() })
    );

    match rx.recv().await.unwrap() {
        HerdEvent::PredictionRowFailed { target, error, .. } => {
            assert_eq!(target, "orphan");
            assert!(error.contains("NOBODY"));
        }
        other => panic!("unexpected event: {:?}", other),
    }
}
