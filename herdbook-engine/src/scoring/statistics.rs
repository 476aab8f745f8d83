// Trait Statistics Engine
//
// Mean and population standard deviation (divide by N) per trait over the
// finite observations of a record collection. Statistics carry a SHA-256
// fingerprint of the collection they describe, so a scorer can refuse
// statistics that no longer match the records in front of it.

use crate::fields::CanonicalField;
use crate::types::AnimalRecord;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Summary of one trait over the population
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TraitStats {
    pub mean: f64,
    /// Population standard deviation (÷N)
    pub std_dev: f64,
    /// Number of finite observations
    pub count: usize,
}

/// Per-trait statistics for one population
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationStatistics {
    /// `None` when a trait had no finite observation
    traits: BTreeMap<CanonicalField, Option<TraitStats>>,
    population: usize,
    fingerprint: String,
}

impl PopulationStatistics {
    /// Statistics for `field`; `None` when absent or never observed
    pub fn get(&self, field: CanonicalField) -> Option<&TraitStats> {
        self.traits.get(&field).and_then(Option::as_ref)
    }

    pub fn traits(&self) -> &BTreeMap<CanonicalField, Option<TraitStats>> {
        &self.traits
    }

    /// Number of records the statistics were computed over
    pub fn population(&self) -> usize {
        self.population
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// True when these statistics describe exactly `records`
    pub fn is_current_for(&self, records: &[AnimalRecord]) -> bool {
        self.population == records.len() && self.fingerprint == population_fingerprint(records)
    }
}

/// Mean / population standard deviation / count of the finite values
pub fn trait_stats<I>(values: I) -> Option<TraitStats>
where
    I: IntoIterator<Item = f64>,
{
    let observations: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    if observations.is_empty() {
        return None;
    }

    let n = observations.len() as f64;
    let mean = observations.iter().sum::<f64>() / n;
    let variance = observations.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    Some(TraitStats {
        mean,
        std_dev: variance.sqrt(),
        count: observations.len(),
    })
}

/// Compute statistics for `traits` over the whole collection
pub fn compute_statistics(records: &[AnimalRecord], traits: &[CanonicalField]) -> PopulationStatistics {
    let vectors: Vec<_> = records.iter().map(AnimalRecord::trait_vector).collect();

    let stats = traits
        .iter()
        .map(|field| {
            let summary = trait_stats(vectors.iter().filter_map(|v| v.get(*field)));
            (*field, summary)
        })
        .collect();

    tracing::debug!(
        population = records.len(),
        traits = traits.len(),
        "Computed population statistics"
    );

    PopulationStatistics {
        traits: stats,
        population: records.len(),
        fingerprint: population_fingerprint(records),
    }
}

/// SHA-256 over every record's key and trait values, in collection order
pub fn population_fingerprint(records: &[AnimalRecord]) -> String {
    let mut hasher = Sha256::new();
    for record in records {
        hasher.update(record.key().as_bytes());
        hasher.update([0u8]);
        for (field, value) in record.trait_vector().iter() {
            hasher.update(field.as_str().as_bytes());
            match value {
                Some(v) => hasher.update(v.to_bits().to_le_bytes()),
                None => hasher.update([0xffu8]),
            }
        }
        hasher.update([0x1eu8]);
    }
    format!("{:x}", hasher.finalize())
}
