//! Ingestion: header canonicalization, dialect detection, type coercion and
//! row validation
//!
//! Raw batches enter through [`pipeline::Ingestor`] and leave as validated
//! [`crate::types::AnimalRecord`]s, all-or-nothing per batch.

pub mod coerce;
pub mod dialect;
pub mod header;
pub mod pipeline;
pub mod validate;

pub use coerce::{Coerced, Coercer, CoercionOutcome};
pub use header::{HeaderCanonicalizer, HeaderMapping};
pub use pipeline::{IngestReport, Ingestor};
pub use validate::{RowError, RowValidator, ValidationError};

use thiserror::Error;

/// Header set with no recognizable canonical field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("no recognizable columns in header {headers:?}")]
    NoRecognizableSchema { headers: Vec<String> },
}

/// Batch-level ingestion failure
#[derive(Debug, Clone, Error)]
pub enum IngestError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Ingestion cancelled after {processed} row(s)")]
    Cancelled { processed: usize },
}
