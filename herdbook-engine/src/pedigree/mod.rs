//! Pedigree-based trait prediction
//!
//! Predicts an animal's trait values from its sire, maternal grandsire and
//! maternal great-grandsire. Ancestor codes resolve through an
//! [`AncestorResolver`] behind a single-flight [`AncestorCache`].

pub mod batch;
pub mod cache;
pub mod predictor;
pub mod resolver;

pub use batch::{BatchPredictionReport, BatchPredictor, PedigreeRequest, PedigreeRowError, PedigreeRowOutcome};
pub use cache::{AncestorCache, CacheStats};
pub use predictor::{predict, AncestorRole, PedigreePrediction, TraitContribution};
pub use resolver::{normalize_code, AncestorResolver, RecordResolver, ResolvedAncestor, ResolverError};
