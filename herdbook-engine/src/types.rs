// Shared Types and Data Contracts
//
// Defines the contracts between the pipeline stages:
// raw rows (row source) → typed records (ingest) → trait vectors (scoring, pedigree)

use crate::fields::CanonicalField;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// Row Source Types (raw, untyped)
// ============================================================================

/// One raw cell as supplied by the row source
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Empty,
}

impl From<serde_json::Value> for CellValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => CellValue::Empty,
            serde_json::Value::Bool(b) => CellValue::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Empty),
            serde_json::Value::String(s) => CellValue::Text(s),
            // Nested JSON is handed on as text; the structured-map path re-parses it
            other => CellValue::Text(other.to_string()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(CellValue::from)
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Number(n) => serializer.serialize_f64(*n),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::Date(d) => d.serialize(serializer),
            CellValue::DateTime(dt) => dt.serialize(serializer),
            CellValue::Empty => serializer.serialize_none(),
        }
    }
}

/// Header row of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderRow {
    /// Pre-tokenized header cells (spreadsheet rows)
    Cells(Vec<String>),
    /// Raw delimited header line; the delimiter is detected
    Delimited(String),
}

/// One ingestion batch: header plus tokenized rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBatch {
    pub header: HeaderRow,
    #[serde(default)]
    pub rows: Vec<Vec<CellValue>>,
}

impl RawBatch {
    pub fn new(header: HeaderRow, rows: Vec<Vec<CellValue>>) -> Self {
        Self { header, rows }
    }
}

// ============================================================================
// Canonical Record Types
// ============================================================================

/// Typed value of a canonical field
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Integer(i64),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Text(String),
    Map(serde_json::Map<String, serde_json::Value>),
}

impl FieldValue {
    /// Finite numeric view of the value, if any
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) if n.is_finite() => Some(*n),
            FieldValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Text view of the value, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Error raised when a record cannot be built or patched
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    #[error("record has no resolvable display name (name, identifier, external id and id are all empty)")]
    UnresolvedName,
}

/// Display-name fallback chain
pub const NAME_FALLBACK: [CanonicalField; 4] = [
    CanonicalField::Name,
    CanonicalField::Identifier,
    CanonicalField::ExternalId,
    CanonicalField::Id,
];

/// Resolve the display name of a field map via the fallback chain
pub fn resolve_display_name(fields: &BTreeMap<CanonicalField, FieldValue>) -> Option<String> {
    NAME_FALLBACK.iter().find_map(|field| {
        fields
            .get(field)
            .and_then(FieldValue::as_text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

/// Canonical animal record
///
/// Created once from a validated row; later edits go through
/// [`AnimalRecord::patched`], which returns a new record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimalRecord {
    display_name: String,
    source_row: usize,
    fields: BTreeMap<CanonicalField, FieldValue>,
}

impl AnimalRecord {
    /// Build a record outside of batch ingestion (no batch uniqueness checks)
    pub fn new(fields: BTreeMap<CanonicalField, FieldValue>) -> Result<Self, RecordError> {
        let display_name = resolve_display_name(&fields).ok_or(RecordError::UnresolvedName)?;
        Ok(Self {
            display_name,
            source_row: 0,
            fields,
        })
    }

    pub(crate) fn from_validated(
        fields: BTreeMap<CanonicalField, FieldValue>,
        display_name: String,
        source_row: usize,
    ) -> Self {
        Self {
            display_name,
            source_row,
            fields,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// 1-based data row the record came from (0 when built directly)
    pub fn source_row(&self) -> usize {
        self.source_row
    }

    pub fn fields(&self) -> &BTreeMap<CanonicalField, FieldValue> {
        &self.fields
    }

    pub fn get(&self, field: CanonicalField) -> Option<&FieldValue> {
        self.fields.get(&field)
    }

    pub fn get_text(&self, field: CanonicalField) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_text)
    }

    pub fn get_number(&self, field: CanonicalField) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_f64)
    }

    /// Stable key used to address this animal in scores and segments
    ///
    /// Prefers `id`, then `identifier`, then the source row.
    pub fn key(&self) -> String {
        self.get_text(CanonicalField::Id)
            .or_else(|| self.get_text(CanonicalField::Identifier))
            .map(str::to_string)
            .unwrap_or_else(|| format!("row-{}", self.source_row))
    }

    /// Numeric trait values present on this record
    pub fn trait_vector(&self) -> TraitVector {
        self.fields
            .iter()
            .filter(|(field, _)| field.is_trait())
            .map(|(field, value)| (*field, value.as_f64()))
            .collect()
    }

    /// Ancestor codes carried by this record
    pub fn pedigree_input(&self) -> PedigreeInput {
        let code = |field| self.get_text(field).map(str::to_string);
        PedigreeInput {
            sire: code(CanonicalField::SireRef),
            mgs: code(CanonicalField::MgsRef),
            mggs: code(CanonicalField::MggsRef),
        }
    }

    /// Apply an explicit patch, producing an updated record
    pub fn patched(&self, patch: &RecordPatch) -> Result<AnimalRecord, RecordError> {
        let mut fields = self.fields.clone();
        for field in &patch.clear {
            fields.remove(field);
        }
        for (field, value) in &patch.set {
            fields.insert(*field, value.clone());
        }
        let display_name = resolve_display_name(&fields).ok_or(RecordError::UnresolvedName)?;
        Ok(AnimalRecord {
            display_name,
            source_row: self.source_row,
            fields,
        })
    }
}

/// Explicit field edits applied with [`AnimalRecord::patched`]
#[derive(Debug, Clone, Default)]
pub struct RecordPatch {
    set: BTreeMap<CanonicalField, FieldValue>,
    clear: BTreeSet<CanonicalField>,
}

impl RecordPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: CanonicalField, value: FieldValue) -> Self {
        self.clear.remove(&field);
        self.set.insert(field, value);
        self
    }

    pub fn clear(mut self, field: CanonicalField) -> Self {
        self.set.remove(&field);
        self.clear.insert(field);
        self
    }
}

// ============================================================================
// Trait and Pedigree Types
// ============================================================================

/// Numeric trait values keyed by trait; `None` marks an explicit null
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraitVector(BTreeMap<CanonicalField, Option<f64>>);

impl TraitVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: CanonicalField, value: Option<f64>) {
        self.0.insert(field, value);
    }

    /// Finite value for `field`, if present and non-null
    pub fn get(&self, field: CanonicalField) -> Option<f64> {
        self.0.get(&field).copied().flatten().filter(|v| v.is_finite())
    }

    pub fn contains(&self, field: CanonicalField) -> bool {
        self.0.contains_key(&field)
    }

    pub fn keys(&self) -> impl Iterator<Item = CanonicalField> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CanonicalField, Option<f64>)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(CanonicalField, Option<f64>)> for TraitVector {
    fn from_iter<I: IntoIterator<Item = (CanonicalField, Option<f64>)>>(iter: I) -> Self {
        TraitVector(iter.into_iter().collect())
    }
}

/// Ancestor codes for one animal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PedigreeInput {
    /// Sire code (required for a prediction to be attempted)
    #[serde(default)]
    pub sire: Option<String>,
    /// Maternal grandsire code
    #[serde(default)]
    pub mgs: Option<String>,
    /// Maternal great-grandsire code
    #[serde(default)]
    pub mggs: Option<String>,
}
