//! Error types for herdbook-engine
//!
//! Stage-specific errors live beside their stages (`IngestError`,
//! `ScoringError`, `PedigreeRowError`); `EngineError` is the umbrella used
//! by configuration and the binary.

use crate::ingest::IngestError;
use crate::scoring::ScoringError;
use thiserror::Error;

/// Engine-level error
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid engine settings (unknown trait names, bad cutoffs, ...)
    #[error("Invalid settings: {0}")]
    Settings(String),

    /// Ingestion rejected the batch
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Scoring epoch failed
    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

/// Result type for engine-level operations
pub type EngineResult<T> = Result<T, EngineError>;
