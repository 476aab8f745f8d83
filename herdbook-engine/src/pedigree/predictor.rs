// Pedigree Predictor
//
// Predicts trait values from up to three ancestors with nominal weights
// sire 0.57, maternal grandsire 0.28, maternal great-grandsire 0.15.
//
// Algorithm:
// 1. Collect every trait key present in at least one ancestor
// 2. For each trait, keep the ancestors that supply a finite value
// 3. Renormalize their nominal weights to sum to 1.0
// 4. predicted = Σ(weight_a × value_a); no contributors → null

use crate::fields::CanonicalField;
use crate::types::TraitVector;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub const SIRE_WEIGHT: f64 = 0.57;
pub const MGS_WEIGHT: f64 = 0.28;
pub const MGGS_WEIGHT: f64 = 0.15;

/// Position of an ancestor in the pedigree
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AncestorRole {
    Sire,
    /// Maternal grandsire
    Mgs,
    /// Maternal great-grandsire
    Mggs,
}

impl AncestorRole {
    pub fn nominal_weight(self) -> f64 {
        match self {
            AncestorRole::Sire => SIRE_WEIGHT,
            AncestorRole::Mgs => MGS_WEIGHT,
            AncestorRole::Mggs => MGGS_WEIGHT,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AncestorRole::Sire => "sire",
            AncestorRole::Mgs => "maternal grandsire",
            AncestorRole::Mggs => "maternal great-grandsire",
        }
    }
}

/// One ancestor's share of a predicted trait
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TraitContribution {
    pub role: AncestorRole,
    /// Renormalized weight actually applied
    pub weight: f64,
    pub value: f64,
}

/// Predicted trait values plus per-trait provenance
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PedigreePrediction {
    pub traits: TraitVector,
    pub contributions: BTreeMap<CanonicalField, Vec<TraitContribution>>,
}

impl PedigreePrediction {
    /// Predicted value for `field`
    pub fn get(&self, field: CanonicalField) -> Option<f64> {
        self.traits.get(field)
    }
}

/// Weighted pedigree prediction for one animal
pub fn predict(
    sire: &TraitVector,
    mgs: Option<&TraitVector>,
    mggs: Option<&TraitVector>,
) -> PedigreePrediction {
    let ancestors: Vec<(AncestorRole, &TraitVector)> = [
        Some((AncestorRole::Sire, sire)),
        mgs.map(|v| (AncestorRole::Mgs, v)),
        mggs.map(|v| (AncestorRole::Mggs, v)),
    ]
    .into_iter()
    .flatten()
    .collect();

    let keys: BTreeSet<CanonicalField> = ancestors.iter().flat_map(|(_, v)| v.keys()).collect();

    let mut prediction = PedigreePrediction::default();
    for field in keys {
        let present: Vec<(AncestorRole, f64)> = ancestors
            .iter()
            .filter_map(|(role, v)| v.get(field).map(|value| (*role, value)))
            .collect();

        let weight_sum: f64 = present.iter().map(|(role, _)| role.nominal_weight()).sum();
        if present.is_empty() || weight_sum <= 0.0 {
            prediction.traits.insert(field, None);
            continue;
        }

        let contributions: Vec<TraitContribution> = present
            .into_iter()
            .map(|(role, value)| TraitContribution {
                role,
                weight: role.nominal_weight() / weight_sum,
                value,
            })
            .collect();
        let predicted: f64 = contributions.iter().map(|c| c.weight * c.value).sum();

        prediction.traits.insert(field, Some(predicted));
        prediction.contributions.insert(field, contributions);
    }

    prediction
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(values: &[(CanonicalField, Option<f64>)]) -> TraitVector {
        values.iter().copied().collect()
    }

    #[test]
    fn test_sire_and_mgs_renormalize() {
        let sire = vector(&[(CanonicalField::Tpi, Some(2500.0))]);
        let mgs = vector(&[(CanonicalField::Tpi, Some(2600.0))]);
        let prediction = predict(&sire, Some(&mgs), None);

        let expected = 2500.0 * (0.57 / 0.85) + 2600.0 * (0.28 / 0.85);
        let tpi = prediction.get(CanonicalField::Tpi).unwrap();
        assert!((tpi - expected).abs() < 1e-9);
        assert_eq!(tpi.round(), 2533.0);

        let weights: Vec<f64> = prediction.contributions[&CanonicalField::Tpi]
            .iter()
            .map(|c| c.weight)
            .collect();
        assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!((weights[0] - 0.57 / 0.85).abs() < 1e-12);
    }

    #[test]
    fn test_all_three_use_nominal_weights() {
        let v = |x| vector(&[(CanonicalField::Milk, Some(x))]);
        let prediction = predict(&v(100.0), Some(&v(200.0)), Some(&v(300.0)));
        let expected = 0.57 * 100.0 + 0.28 * 200.0 + 0.15 * 300.0;
        assert!((prediction.get(CanonicalField::Milk).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_weights_differ_per_trait() {
        let sire = vector(&[(CanonicalField::Milk, Some(1000.0)), (CanonicalField::Scs, None)]);
        let mgs = vector(&[(CanonicalField::Milk, Some(500.0)), (CanonicalField::Scs, Some(2.8))]);
        let prediction = predict(&sire, Some(&mgs), None);

        // Only the grandsire supplies SCS, so it carries the full weight
        assert_eq!(prediction.get(CanonicalField::Scs), Some(2.8));
        assert_eq!(prediction.contributions[&CanonicalField::Scs].len(), 1);
        assert_eq!(prediction.contributions[&CanonicalField::Milk].len(), 2);
    }

    #[test]
    fn test_trait_without_contributors_is_null() {
        let sire = vector(&[(CanonicalField::Pl, None)]);
        let prediction = predict(&sire, None, None);
        assert!(prediction.traits.contains(CanonicalField::Pl));
        assert_eq!(prediction.get(CanonicalField::Pl), None);
        assert!(!prediction.contributions.contains_key(&CanonicalField::Pl));
    }
}
