// Scoring Epoch
//
// One full scoring pass over an immutable population:
//   statistics -> composite scores -> percentile ranking -> segmentation
//
// Statistics are complete before any animal is scored. When no animal has a
// valid score under the configured mode, the epoch re-scores in direct mode
// with the fallback trait and records a diagnostic.

use super::index::CompositeScorer;
use super::percentile::rank_percentiles;
use super::segmentation::{SegmentDecision, SegmentGroup, SegmentationRules};
use super::statistics::{compute_statistics, PopulationStatistics};
use super::ScoringError;
use crate::diagnostics::{publish, Diagnostic};
use crate::fields::CanonicalField;
use crate::types::AnimalRecord;
use herdbook_common::events::{EventBus, HerdEvent, Stage};
use herdbook_common::time;
use serde::Serialize;
use tracing::info;

/// Score and rank of one animal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreResult {
    pub key: String,
    pub display_name: String,
    pub score: f64,
    /// 1-based position, best first
    pub rank: usize,
    pub percentile: u8,
}

/// Group sizes of one epoch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SegmentCounts {
    pub donors: usize,
    pub intermediates: usize,
    pub recipients: usize,
}

/// Everything one epoch produced
#[derive(Debug, Clone, Serialize)]
pub struct EpochOutcome {
    pub statistics: PopulationStatistics,
    /// Scored animals, best first
    pub scores: Vec<ScoreResult>,
    /// One decision per scored animal, in rank order
    pub segments: Vec<SegmentDecision>,
    /// Keys of animals without a valid score (excluded from ranking and segments)
    pub unscored: Vec<String>,
    pub counts: SegmentCounts,
    pub used_fallback: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Statistics → scoring → ranking → segmentation driver
#[derive(Clone)]
pub struct ScoringEpoch {
    scorer: CompositeScorer,
    fallback_trait: CanonicalField,
    rules: SegmentationRules,
    events: Option<EventBus>,
}

impl ScoringEpoch {
    pub fn new(scorer: CompositeScorer, fallback_trait: CanonicalField, rules: SegmentationRules) -> Self {
        Self {
            scorer,
            fallback_trait,
            rules,
            events: None,
        }
    }

    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    pub fn scorer(&self) -> &CompositeScorer {
        &self.scorer
    }

    pub fn rules(&self) -> &SegmentationRules {
        &self.rules
    }

    /// Run one epoch over `records`
    pub fn run(&self, records: &[AnimalRecord]) -> Result<EpochOutcome, ScoringError> {
        if records.is_empty() {
            return Err(ScoringError::EmptyPopulation);
        }
        let start = time::now();
        let mut diagnostics = Vec::new();

        let trait_keys: Vec<CanonicalField> = CanonicalField::traits().collect();
        let statistics = compute_statistics(records, &trait_keys);

        if self.scorer.used_default_weights() {
            diagnostics.push(Diagnostic::new(
                Stage::Scoring,
                "custom weights were all zero, default weights used",
            ));
        }

        let mut scores = self.scorer.score_all(records, &statistics)?;
        let mut used_fallback = false;

        if scores.iter().all(Option::is_none) {
            diagnostics.push(Diagnostic::new(
                Stage::Scoring,
                format!(
                    "no animal has a valid score, ranking by fallback trait '{}'",
                    self.fallback_trait
                ),
            ));
            scores = CompositeScorer::direct(self.fallback_trait).score_all(records, &statistics)?;
            used_fallback = true;
        }

        let mut unscored = Vec::new();
        let mut pairs = Vec::with_capacity(records.len());
        for (idx, score) in scores.iter().enumerate() {
            match score.filter(|s| s.is_finite()) {
                Some(s) => pairs.push((idx, s)),
                None => unscored.push(records[idx].key()),
            }
        }

        let ranked = rank_percentiles(pairs);
        let total = ranked.len();
        let mut counts = SegmentCounts::default();
        let mut score_results = Vec::with_capacity(ranked.len());
        let mut segments = Vec::with_capacity(ranked.len());

        for entry in ranked {
            let record = &records[entry.key];
            let top_percent = SegmentationRules::top_percent(entry.rank, total);
            let (group, rationale) = self.rules.classify(top_percent, &record.trait_vector());
            match group {
                SegmentGroup::Donor => counts.donors += 1,
                SegmentGroup::Intermediate => counts.intermediates += 1,
                SegmentGroup::Recipient => counts.recipients += 1,
            }

            score_results.push(ScoreResult {
                key: record.key(),
                display_name: record.display_name().to_string(),
                score: entry.score,
                rank: entry.rank,
                percentile: entry.percentile,
            });
            segments.push(SegmentDecision {
                key: record.key(),
                display_name: record.display_name().to_string(),
                percentile: entry.percentile,
                top_percent,
                group,
                rationale,
            });
        }

        for diagnostic in &diagnostics {
            publish(self.events.as_ref(), diagnostic);
        }

        info!(
            scored = score_results.len(),
            unscored = unscored.len(),
            donors = counts.donors,
            intermediates = counts.intermediates,
            recipients = counts.recipients,
            used_fallback,
            elapsed_ms = time::elapsed_ms(start),
            "Scoring epoch completed"
        );
        if let Some(bus) = &self.events {
            bus.emit_lossy(HerdEvent::EpochCompleted {
                scored: score_results.len(),
                unscored: unscored.len(),
                donors: counts.donors,
                intermediates: counts.intermediates,
                recipients: counts.recipients,
                timestamp: time::now(),
            });
        }

        Ok(EpochOutcome {
            statistics,
            scores: score_results,
            segments,
            unscored,
            counts,
            used_fallback,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::segmentation::Rationale;
    use crate::types::FieldValue;
    use std::collections::BTreeMap;

    fn record(id: &str, values: &[(CanonicalField, FieldValue)]) -> AnimalRecord {
        let mut fields = BTreeMap::new();
        fields.insert(CanonicalField::Id, FieldValue::Text(id.to_string()));
        fields.extend(values.iter().cloned());
        AnimalRecord::new(fields).unwrap()
    }

    fn epoch(scorer: CompositeScorer) -> ScoringEpoch {
        ScoringEpoch::new(scorer, CanonicalField::Tpi, SegmentationRules::default())
    }

    #[test]
    fn test_direct_epoch_ranks_and_segments() {
        let records = vec![
            record("a", &[(CanonicalField::Tpi, FieldValue::Integer(1000))]),
            record("b", &[(CanonicalField::Tpi, FieldValue::Integer(3000)), (CanonicalField::Scs, FieldValue::Number(2.6)), (CanonicalField::Pl, FieldValue::Number(2.0))]),
            record("c", &[(CanonicalField::Tpi, FieldValue::Integer(2000))]),
            record("d", &[]),
            record("e", &[(CanonicalField::Tpi, FieldValue::Integer(1500))]),
            record("f", &[(CanonicalField::Tpi, FieldValue::Integer(2500))]),
        ];
        let outcome = epoch(CompositeScorer::direct(CanonicalField::Tpi)).run(&records).unwrap();

        let ranked: Vec<(&str, u8)> = outcome
            .scores
            .iter()
            .map(|s| (s.key.as_str(), s.percentile))
            .collect();
        assert_eq!(ranked, vec![("b", 100), ("f", 80), ("c", 60), ("e", 40), ("a", 20)]);
        assert_eq!(outcome.unscored, vec!["d".to_string()]);
        assert!(!outcome.used_fallback);

        let segments: Vec<(&str, f64, Rationale)> = outcome
            .segments
            .iter()
            .map(|s| (s.key.as_str(), s.top_percent, s.rationale))
            .collect();
        assert_eq!(
            segments,
            vec![
                ("b", 20.0, Rationale::TopHealthOk),
                ("f", 40.0, Rationale::MidRange),
                ("c", 60.0, Rationale::MidRange),
                ("e", 80.0, Rationale::BelowThreshold),
                ("a", 100.0, Rationale::BelowThreshold),
            ]
        );
        assert_eq!(
            outcome.counts,
            SegmentCounts {
                donors: 1,
                intermediates: 2,
                recipients: 2,
            }
        );
    }

    #[test]
    fn test_small_herd_has_no_donor_outside_cutoff() {
        let records = vec![
            record("a", &[(CanonicalField::Tpi, FieldValue::Integer(1000))]),
            record("b", &[(CanonicalField::Tpi, FieldValue::Integer(3000)), (CanonicalField::Scs, FieldValue::Number(2.6)), (CanonicalField::Pl, FieldValue::Number(2.0))]),
            record("c", &[(CanonicalField::Tpi, FieldValue::Integer(2000))]),
        ];
        let outcome = epoch(CompositeScorer::direct(CanonicalField::Tpi)).run(&records).unwrap();

        // Best of three is the top 33%, worst is the top 100%
        assert_eq!(outcome.segments[0].key, "b");
        assert_eq!(outcome.segments[0].rationale, Rationale::MidRange);
        assert_eq!(outcome.segments[2].key, "a");
        assert_eq!(outcome.segments[2].group, SegmentGroup::Recipient);
        assert_eq!(outcome.counts.donors, 0);
    }

    #[test]
    fn test_fallback_trait_when_nothing_scores() {
        let records = vec![
            record("a", &[(CanonicalField::Tpi, FieldValue::Integer(1500))]),
            record("b", &[(CanonicalField::Tpi, FieldValue::Integer(2500))]),
        ];
        let outcome = epoch(CompositeScorer::direct(CanonicalField::NmDollar)).run(&records).unwrap();
        assert!(outcome.used_fallback);
        assert_eq!(outcome.scores[0].key, "b");
        assert_eq!(outcome.diagnostics.len(), 1);
        assert!(outcome.diagnostics[0].message.contains("fallback"));
    }

    #[test]
    fn test_empty_population() {
        let err = epoch(CompositeScorer::direct(CanonicalField::Tpi)).run(&[]).unwrap_err();
        assert_eq!(err, ScoringError::EmptyPopulation);
    }

    #[tokio::test]
    async fn test_epoch_completed_event() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let records = vec![record("a", &[(CanonicalField::Tpi, FieldValue::Integer(1))])];
        epoch(CompositeScorer::direct(CanonicalField::Tpi))
            .with_events(bus)
            .run(&records)
            .unwrap();

        match rx.recv().await.unwrap() {
            HerdEvent::EpochCompleted { scored, .. } => assert_eq!(scored, 1),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
