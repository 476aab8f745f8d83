//! # Herdbook Engine
//!
//! Normalizes heterogeneous dairy-cattle evaluation tables into canonical
//! animal records, ranks and segments the herd by a composite breeding
//! index, and predicts trait values from pedigree.
//!
//! Pipeline:
//! - [`ingest`]: header canonicalization, dialect detection, type coercion, row validation
//! - [`scoring`]: population statistics, composite index, percentiles, breeding tiers
//! - [`pedigree`]: weighted ancestor prediction with a single-flight ancestor cache

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fields;
pub mod ingest;
pub mod pedigree;
pub mod scoring;
pub mod sink;
pub mod types;

pub use crate::config::EngineSettings;
pub use crate::diagnostics::Diagnostic;
pub use crate::error::{EngineError, EngineResult};
pub use crate::fields::{CanonicalField, ValueClass};
pub use crate::types::{AnimalRecord, CellValue, FieldValue, HeaderRow, PedigreeInput, RawBatch, RecordPatch, TraitVector};
