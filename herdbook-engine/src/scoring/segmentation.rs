// Segmentation Classifier
//
// Partitions ranked animals into breeding tiers. Cutoffs are "top percent of
// the herd": the animal at 1-based rank r of N sits in the top
// round(r / N * 100)%, so in a herd of 5 the best animal is in the top 20%
// and the worst in the top 100%.
//
// Decision order, first match wins:
//   1. critical health override        -> Recipient
//   2. top <= donor cutoff             -> Donor if gates pass, else Intermediate
//   3. top <= intermediate cutoff      -> Intermediate
//   4. otherwise                       -> Recipient

use crate::fields::CanonicalField;
use crate::types::TraitVector;
use serde::Serialize;
use std::fmt;

/// Breeding-program tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentGroup {
    Donor,
    Intermediate,
    Recipient,
}

impl fmt::Display for SegmentGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentGroup::Donor => write!(f, "donor"),
            SegmentGroup::Intermediate => write!(f, "intermediate"),
            SegmentGroup::Recipient => write!(f, "recipient"),
        }
    }
}

/// Why an animal landed in its tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rationale {
    CriticalHealth,
    TopHealthOk,
    TopHealthInsufficient,
    MidRange,
    BelowThreshold,
}

impl Rationale {
    pub fn as_str(self) -> &'static str {
        match self {
            Rationale::CriticalHealth => "critical health",
            Rationale::TopHealthOk => "top + health ok",
            Rationale::TopHealthInsufficient => "top, health insufficient",
            Rationale::MidRange => "mid-range",
            Rationale::BelowThreshold => "below threshold",
        }
    }
}

impl fmt::Display for Rationale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Rationale {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Tier assignment for one ranked animal
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentDecision {
    pub key: String,
    pub display_name: String,
    pub percentile: u8,
    /// Position as a percent of the herd, best first
    pub top_percent: f64,
    pub group: SegmentGroup,
    pub rationale: Rationale,
}

/// Segmentation thresholds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentationRules {
    /// Donor candidates: top `donor_cutoff` percent
    pub donor_cutoff: f64,
    /// Intermediate: top `intermediate_cutoff` percent (after donors)
    pub intermediate_cutoff: f64,
    /// Health trait gated by a maximum (somatic cell score)
    pub gate_max_trait: CanonicalField,
    /// Health trait gated by a minimum (productive life)
    pub gate_min_trait: CanonicalField,
    pub donor_max: f64,
    pub donor_min: f64,
    pub critical_max: f64,
    pub critical_min: f64,
}

impl Default for SegmentationRules {
    fn default() -> Self {
        Self {
            donor_cutoff: 20.0,
            intermediate_cutoff: 70.0,
            gate_max_trait: CanonicalField::Scs,
            gate_min_trait: CanonicalField::Pl,
            donor_max: 2.9,
            donor_min: 1.0,
            critical_max: 3.2,
            critical_min: -2.0,
        }
    }
}

impl SegmentationRules {
    /// Top-percent position of 1-based `rank` among `total` ranked animals
    pub fn top_percent(rank: usize, total: usize) -> f64 {
        if total == 0 {
            return 100.0;
        }
        (rank as f64 / total as f64 * 100.0).round()
    }

    /// Classify one animal
    ///
    /// A missing gate value fails the donor gate; a missing value never
    /// triggers the critical override.
    pub fn classify(&self, top_percent: f64, traits: &TraitVector) -> (SegmentGroup, Rationale) {
        let max_value = traits.get(self.gate_max_trait);
        let min_value = traits.get(self.gate_min_trait);

        let critical = max_value.is_some_and(|v| v > self.critical_max)
            || min_value.is_some_and(|v| v < self.critical_min);
        if critical {
            return (SegmentGroup::Recipient, Rationale::CriticalHealth);
        }

        if top_percent <= self.donor_cutoff {
            let gates_pass = max_value.is_some_and(|v| v <= self.donor_max)
                && min_value.is_some_and(|v| v >= self.donor_min);
            return if gates_pass {
                (SegmentGroup::Donor, Rationale::TopHealthOk)
            } else {
                (SegmentGroup::Intermediate, Rationale::TopHealthInsufficient)
            };
        }

        if top_percent <= self.intermediate_cutoff {
            return (SegmentGroup::Intermediate, Rationale::MidRange);
        }

        (SegmentGroup::Recipient, Rationale::BelowThreshold)
    }
}
