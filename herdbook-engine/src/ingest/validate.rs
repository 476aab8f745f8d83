// Row Validator
//
// Turns coerced field maps into AnimalRecords while enforcing the batch
// invariants: every record has a display name, and `id` / `identifier` are
// unique within the batch. Errors accumulate across the whole batch; the
// batch is accepted only when none were found.

use crate::fields::CanonicalField;
use crate::ingest::coerce::number_to_text;
use crate::types::{resolve_display_name, AnimalRecord, FieldValue};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use thiserror::Error;

/// Number of example errors carried by a [`ValidationError`]
pub const PREVIEW_LIMIT: usize = 3;

/// One row-level validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowError {
    #[error("row {row}: no display name (name, identifier, external id and id are all empty)")]
    UnresolvedName { row: usize },

    #[error("row {row}: duplicate id '{id}' (first seen in row {first_row})")]
    DuplicateId { row: usize, id: String, first_row: usize },

    #[error("row {row}: duplicate identifier '{identifier}' (first seen in row {first_row})")]
    DuplicateIdentifier {
        row: usize,
        identifier: String,
        first_row: usize,
    },
}

impl RowError {
    pub fn row(&self) -> usize {
        match self {
            RowError::UnresolvedName { row }
            | RowError::DuplicateId { row, .. }
            | RowError::DuplicateIdentifier { row, .. } => *row,
        }
    }
}

/// Aggregated batch rejection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Total number of row errors found
    pub total: usize,
    /// First errors in row order (at most [`PREVIEW_LIMIT`])
    pub preview: Vec<RowError>,
    /// Errors not included in the preview
    pub remaining: usize,
}

impl ValidationError {
    fn from_errors(errors: Vec<RowError>) -> Self {
        let total = errors.len();
        let preview: Vec<RowError> = errors.into_iter().take(PREVIEW_LIMIT).collect();
        Self {
            total,
            remaining: total - preview.len(),
            preview,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch rejected with {} validation error(s): ", self.total)?;
        let shown: Vec<String> = self.preview.iter().map(ToString::to_string).collect();
        f.write_str(&shown.join("; "))?;
        if self.remaining > 0 {
            write!(f, " (and {} more)", self.remaining)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Batch-scoped validator
#[derive(Debug, Default)]
pub struct RowValidator {
    seen_ids: HashMap<String, usize>,
    seen_identifiers: HashMap<String, usize>,
    errors: Vec<RowError>,
}

impl RowValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate one coerced row
    ///
    /// Returns the record when the row itself is valid. Failures are kept in
    /// the validator and surface from [`RowValidator::finish`].
    pub fn validate(
        &mut self,
        row: usize,
        mut fields: BTreeMap<CanonicalField, FieldValue>,
    ) -> Option<AnimalRecord> {
        normalize_id_fields(&mut fields);
        let errors_before = self.errors.len();

        let display_name = resolve_display_name(&fields);
        if display_name.is_none() {
            self.errors.push(RowError::UnresolvedName { row });
        }

        if let Some(id) = fields.get(&CanonicalField::Id).and_then(FieldValue::as_text) {
            match self.seen_ids.get(id) {
                Some(first_row) => self.errors.push(RowError::DuplicateId {
                    row,
                    id: id.to_string(),
                    first_row: *first_row,
                }),
                None => {
                    self.seen_ids.insert(id.to_string(), row);
                }
            }
        }

        if let Some(identifier) = fields
            .get(&CanonicalField::Identifier)
            .and_then(FieldValue::as_text)
        {
            match self.seen_identifiers.get(identifier) {
                Some(first_row) => self.errors.push(RowError::DuplicateIdentifier {
                    row,
                    identifier: identifier.to_string(),
                    first_row: *first_row,
                }),
                None => {
                    self.seen_identifiers.insert(identifier.to_string(), row);
                }
            }
        }

        if self.errors.len() > errors_before {
            return None;
        }
        display_name.map(|name| AnimalRecord::from_validated(fields, name, row))
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Close the batch: all records, or the aggregated rejection
    pub fn finish(self, records: Vec<AnimalRecord>) -> Result<Vec<AnimalRecord>, ValidationError> {
        if self.errors.is_empty() {
            Ok(records)
        } else {
            Err(ValidationError::from_errors(self.errors))
        }
    }
}

/// Render id-like fields as trimmed text and drop empty ones
fn normalize_id_fields(fields: &mut BTreeMap<CanonicalField, FieldValue>) {
    for field in CanonicalField::ID_LIKE {
        let Some(value) = fields.remove(field) else {
            continue;
        };
        let text = match value {
            FieldValue::Text(s) => s.trim().to_string(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Number(n) => number_to_text(n),
            other => {
                fields.insert(*field, other);
                continue;
            }
        };
        if !text.is_empty() {
            fields.insert(*field, FieldValue::Text(text));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(CanonicalField, FieldValue)]) -> BTreeMap<CanonicalField, FieldValue> {
        pairs.iter().cloned().collect()
    }

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    #[test]
    fn test_valid_rows_become_records() {
        let mut validator = RowValidator::new();
        let rec = validator
            .validate(1, row(&[(CanonicalField::Identifier, text(" 7HO1 ")), (CanonicalField::Tpi, FieldValue::Integer(2500))]))
            .unwrap();
        assert_eq!(rec.display_name(), "7HO1");
        assert_eq!(rec.get_text(CanonicalField::Identifier), Some("7HO1"));
        assert_eq!(rec.source_row(), 1);
        assert_eq!(validator.finish(vec![rec]).unwrap().len(), 1);
    }

    #[test]
    fn test_numeric_ids_are_stringified() {
        let mut validator = RowValidator::new();
        let rec = validator
            .validate(1, row(&[(CanonicalField::Id, FieldValue::Number(42.0))]))
            .unwrap();
        assert_eq!(rec.get_text(CanonicalField::Id), Some("42"));
        assert_eq!(rec.display_name(), "42");
    }

    #[test]
    fn test_blank_identity_is_unresolved() {
        let mut validator = RowValidator::new();
        assert!(validator
            .validate(4, row(&[(CanonicalField::Identifier, text("   ")), (CanonicalField::Tpi, FieldValue::Integer(1))]))
            .is_none());
        let err = validator.finish(Vec::new()).unwrap_err();
        assert_eq!(err.preview, vec![RowError::UnresolvedName { row: 4 }]);
    }

    #[test]
    fn test_duplicate_identifier_cites_first_row() {
        let mut validator = RowValidator::new();
        let first = validator.validate(1, row(&[(CanonicalField::Identifier, text("A"))]));
        assert!(first.is_some());
        assert!(validator
            .validate(5, row(&[(CanonicalField::Identifier, text("A"))]))
            .is_none());

        let err = validator.finish(first.into_iter().collect()).unwrap_err();
        assert_eq!(
            err.preview[0],
            RowError::DuplicateIdentifier {
                row: 5,
                identifier: "A".to_string(),
                first_row: 1
            }
        );
        assert!(err.to_string().contains("first seen in row 1"));
    }

    #[test]
    fn test_duplicate_id() {
        let mut validator = RowValidator::new();
        validator.validate(1, row(&[(CanonicalField::Id, text("x")), (CanonicalField::Name, text("Ann"))]));
        validator.validate(2, row(&[(CanonicalField::Id, text("x")), (CanonicalField::Name, text("Bea"))]));
        let err = validator.finish(Vec::new()).unwrap_err();
        assert!(matches!(err.preview[0], RowError::DuplicateId { row: 2, first_row: 1, .. }));
    }

    #[test]
    fn test_preview_is_capped_with_remainder() {
        let mut validator = RowValidator::new();
        for r in 1..=5 {
            validator.validate(r, row(&[(CanonicalField::Tpi, FieldValue::Integer(1))]));
        }
        assert_eq!(validator.error_count(), 5);
        let err = validator.finish(Vec::new()).unwrap_err();
        assert_eq!(err.total, 5);
        assert_eq!(err.preview.len(), PREVIEW_LIMIT);
        assert_eq!(err.remaining, 2);
        assert!(err.to_string().ends_with("(and 2 more)"));
    }
}
