// Composite Index Scorer
//
// Direct mode ranks by one raw trait. Custom mode ranks by a weighted sum of
// per-trait z-scores, with one "lower is better" trait subtracted.

use super::statistics::PopulationStatistics;
use super::ScoringError;
use crate::fields::CanonicalField;
use crate::types::{AnimalRecord, TraitVector};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Ranking criterion
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScoringMode {
    /// Raw value of one trait, unnormalized
    Direct { trait_field: CanonicalField },
    /// Weighted z-score composite
    Custom { weights: BTreeMap<CanonicalField, f64> },
}

/// Built-in custom-mode weights, used when the configured map is all zero
pub fn default_weights() -> BTreeMap<CanonicalField, f64> {
    BTreeMap::from([
        (CanonicalField::Protein, 0.25),
        (CanonicalField::Fat, 0.20),
        (CanonicalField::Pl, 0.15),
        (CanonicalField::Dpr, 0.10),
        (CanonicalField::Udc, 0.10),
        (CanonicalField::Scs, 0.10),
        (CanonicalField::Flc, 0.05),
        (CanonicalField::Ptat, 0.05),
    ])
}

/// Scores animals under one [`ScoringMode`]
#[derive(Debug, Clone)]
pub struct CompositeScorer {
    mode: ScoringMode,
    penalty: CanonicalField,
    used_default_weights: bool,
}

impl CompositeScorer {
    pub fn direct(trait_field: CanonicalField) -> Self {
        Self {
            mode: ScoringMode::Direct { trait_field },
            penalty: CanonicalField::Scs,
            used_default_weights: false,
        }
    }

    /// Custom composite; an all-zero (or empty) weight map is replaced by
    /// [`default_weights`]
    pub fn custom(weights: BTreeMap<CanonicalField, f64>, penalty: CanonicalField) -> Self {
        let all_zero = weights.values().all(|w| *w == 0.0 || !w.is_finite());
        let (weights, used_default_weights) = if all_zero {
            warn!("Custom weight map is entirely zero; using default weights");
            (default_weights(), true)
        } else {
            (weights, false)
        };

        Self {
            mode: ScoringMode::Custom { weights },
            penalty,
            used_default_weights,
        }
    }

    pub fn mode(&self) -> &ScoringMode {
        &self.mode
    }

    pub fn penalty(&self) -> CanonicalField {
        self.penalty
    }

    /// True when the configured weights were replaced by the defaults
    pub fn used_default_weights(&self) -> bool {
        self.used_default_weights
    }

    /// Traits that contribute to a score under this mode
    pub fn contributing_traits(&self) -> Vec<CanonicalField> {
        match &self.mode {
            ScoringMode::Direct { trait_field } => vec![*trait_field],
            ScoringMode::Custom { weights } => weights
                .iter()
                .filter(|(_, w)| **w != 0.0 && w.is_finite())
                .map(|(field, _)| *field)
                .collect(),
        }
    }

    /// Score one animal
    ///
    /// # Algorithm
    /// - Direct: the raw trait value
    /// - Custom: `Σ ± w · (v − mean) / sd`, `sd := 1` when zero or undefined,
    ///   minus for the penalty trait; traits without statistics contribute 0
    ///
    /// Returns `None` only when every contributing trait is missing.
    pub fn score(&self, traits: &TraitVector, stats: &PopulationStatistics) -> Option<f64> {
        match &self.mode {
            ScoringMode::Direct { trait_field } => traits.get(*trait_field),
            ScoringMode::Custom { weights } => {
                let mut total = 0.0;
                let mut any_present = false;

                for (field, weight) in weights {
                    if *weight == 0.0 || !weight.is_finite() {
                        continue;
                    }
                    let Some(value) = traits.get(*field) else {
                        continue;
                    };
                    any_present = true;

                    let Some(summary) = stats.get(*field) else {
                        continue;
                    };
                    let sd = if summary.std_dev > 0.0 && summary.std_dev.is_finite() {
                        summary.std_dev
                    } else {
                        1.0
                    };
                    let z = (value - summary.mean) / sd;

                    if *field == self.penalty {
                        total -= weight * z;
                    } else {
                        total += weight * z;
                    }
                }

                any_present.then_some(total)
            }
        }
    }

    /// Score every record against statistics computed for exactly this slice
    pub fn score_all(
        &self,
        records: &[AnimalRecord],
        stats: &PopulationStatistics,
    ) -> Result<Vec<Option<f64>>, ScoringError> {
        if records.is_empty() {
            return Err(ScoringError::EmptyPopulation);
        }
        if !stats.is_current_for(records) {
            return Err(ScoringError::StaleStatistics {
                expected: short_fingerprint(stats.fingerprint()),
                actual: short_fingerprint(&super::statistics::population_fingerprint(records)),
            });
        }

        Ok(records
            .iter()
            .map(|record| self.score(&record.trait_vector(), stats))
            .collect())
    }
}

fn short_fingerprint(fingerprint: &str) -> String {
    fingerprint.chars().take(12).collect()
}
