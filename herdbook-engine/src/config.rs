//! Engine settings derived from the bootstrap TOML configuration
//!
//! [`HerdbookConfig`] holds strings and numbers as the user wrote them;
//! [`EngineSettings`] is the validated, typed form the pipeline consumes.

use crate::error::{EngineError, EngineResult};
use crate::fields::CanonicalField;
use crate::ingest::{Coercer, HeaderCanonicalizer, Ingestor};
use crate::scoring::{CompositeScorer, ScoringEpoch, SegmentationRules};
use herdbook_common::config::{HerdbookConfig, ScoringModeConfig};
use std::collections::{BTreeMap, HashMap};

/// Validated engine settings
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub aliases: HashMap<String, CanonicalField>,
    pub null_tokens: Vec<String>,
    pub scorer: CompositeScorer,
    pub fallback_trait: CanonicalField,
    pub rules: SegmentationRules,
    pub concurrency: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            aliases: HashMap::new(),
            null_tokens: herdbook_common::config::IngestConfig::default().null_tokens,
            scorer: CompositeScorer::direct(CanonicalField::Tpi),
            fallback_trait: CanonicalField::Tpi,
            rules: SegmentationRules::default(),
            concurrency: 8,
        }
    }
}

impl EngineSettings {
    /// Validate and convert a loaded configuration
    pub fn from_config(config: &HerdbookConfig) -> EngineResult<Self> {
        let mut aliases = HashMap::new();
        for (alias, target) in &config.ingest.aliases {
            let field = target.parse::<CanonicalField>().map_err(|e| {
                EngineError::Settings(format!("[ingest.aliases] '{}': {}", alias, e))
            })?;
            aliases.insert(alias.clone(), field);
        }

        let scoring = &config.scoring;
        let penalty = trait_field("scoring.penalty_trait", &scoring.penalty_trait)?;
        let fallback_trait = trait_field("scoring.fallback_trait", &scoring.fallback_trait)?;
        let scorer = match scoring.mode {
            ScoringModeConfig::Direct => {
                CompositeScorer::direct(trait_field("scoring.direct_trait", &scoring.direct_trait)?)
            }
            ScoringModeConfig::Custom => {
                let mut weights = BTreeMap::new();
                for (name, weight) in &scoring.weights {
                    if !weight.is_finite() {
                        return Err(EngineError::Settings(format!(
                            "scoring.weights.{} must be finite",
                            name
                        )));
                    }
                    weights.insert(trait_field("scoring.weights", name)?, *weight);
                }
                CompositeScorer::custom(weights, penalty)
            }
        };

        let seg = &config.segmentation;
        for (name, cutoff) in [
            ("donor_cutoff", seg.donor_cutoff),
            ("intermediate_cutoff", seg.intermediate_cutoff),
        ] {
            if !(0.0..=100.0).contains(&cutoff) {
                return Err(EngineError::Settings(format!(
                    "segmentation.{} must be within 0..=100, got {}",
                    name, cutoff
                )));
            }
        }
        if seg.donor_cutoff > seg.intermediate_cutoff {
            return Err(EngineError::Settings(format!(
                "segmentation.donor_cutoff ({}) exceeds intermediate_cutoff ({})",
                seg.donor_cutoff, seg.intermediate_cutoff
            )));
        }
        let rules = SegmentationRules {
            donor_cutoff: seg.donor_cutoff,
            intermediate_cutoff: seg.intermediate_cutoff,
            gate_max_trait: trait_field("segmentation.gate_max_trait", &seg.gate_max_trait)?,
            gate_min_trait: trait_field("segmentation.gate_min_trait", &seg.gate_min_trait)?,
            donor_max: seg.donor_max,
            donor_min: seg.donor_min,
            critical_max: seg.critical_max,
            critical_min: seg.critical_min,
        };

        if config.pedigree.concurrency == 0 {
            return Err(EngineError::Settings(
                "pedigree.concurrency must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            aliases,
            null_tokens: config.ingest.null_tokens.clone(),
            scorer,
            fallback_trait,
            rules,
            concurrency: config.pedigree.concurrency,
        })
    }

    /// Ingestor configured with these aliases and null tokens
    pub fn ingestor(&self) -> Ingestor {
        Ingestor::new(
            HeaderCanonicalizer::new(self.aliases.clone()),
            Coercer::new(&self.null_tokens),
        )
    }

    /// Scoring epoch configured with these scoring and segmentation settings
    pub fn epoch(&self) -> ScoringEpoch {
        ScoringEpoch::new(self.scorer.clone(), self.fallback_trait, self.rules.clone())
    }
}

/// Parse a numeric trait id from configuration
fn trait_field(key: &str, name: &str) -> EngineResult<CanonicalField> {
    let field = name
        .parse::<CanonicalField>()
        .map_err(|e| EngineError::Settings(format!("{}: {}", key, e)))?;
    if !field.is_trait() {
        return Err(EngineError::Settings(format!(
            "{}: '{}' is not a numeric trait",
            key, field
        )));
    }
    Ok(field)
}
