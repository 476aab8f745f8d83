//! Batch ingestion pipeline
//!
//! Header canonicalization (with dialect detection for a raw header line),
//! per-row coercion and validation. A batch yields either every record or a
//! structured rejection; nothing in between.

use super::coerce::{Coerced, Coercer};
use super::dialect::{detect_delimiter, split_quoted};
use super::header::HeaderCanonicalizer;
use super::validate::RowValidator;
use super::IngestError;
use crate::diagnostics::{publish, Diagnostic};
use crate::fields::CanonicalField;
use crate::types::{AnimalRecord, CellValue, FieldValue, HeaderRow, RawBatch};
use herdbook_common::config::IngestConfig;
use herdbook_common::events::{EventBus, HerdEvent, Stage};
use herdbook_common::time;
use serde::Serialize;
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of an accepted batch
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub records: Vec<AnimalRecord>,
    pub diagnostics: Vec<Diagnostic>,
    /// Original header text of every dropped column
    pub dropped_columns: Vec<String>,
    /// Delimiter detected for a raw header line
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<char>,
    /// (original header, canonical field) for every resolved column
    pub column_map: Vec<(String, CanonicalField)>,
}

/// Header → coercion → validation driver
#[derive(Clone)]
pub struct Ingestor {
    canonicalizer: HeaderCanonicalizer,
    coercer: Coercer,
    events: Option<EventBus>,
}

impl Default for Ingestor {
    fn default() -> Self {
        Self::new(
            HeaderCanonicalizer::default(),
            Coercer::new(IngestConfig::default().null_tokens),
        )
    }
}

impl Ingestor {
    pub fn new(canonicalizer: HeaderCanonicalizer, coercer: Coercer) -> Self {
        Self {
            canonicalizer,
            coercer,
            events: None,
        }
    }

    /// Publish diagnostics and batch outcomes on `events`
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Ingest one batch
    ///
    /// Cancellation is checked before each row; a cancelled batch returns no
    /// records.
    pub fn ingest(
        &self,
        batch: &RawBatch,
        cancel_token: &CancellationToken,
    ) -> Result<IngestReport, IngestError> {
        let start = time::now();
        let result = self.run(batch, cancel_token);

        match &result {
            Ok(report) => {
                info!(
                    records = report.records.len(),
                    diagnostics = report.diagnostics.len(),
                    dropped_columns = report.dropped_columns.len(),
                    elapsed_ms = time::elapsed_ms(start),
                    "Batch accepted"
                );
                self.emit(HerdEvent::BatchAccepted {
                    records: report.records.len(),
                    diagnostics: report.diagnostics.len(),
                    timestamp: time::now(),
                });
            }
            Err(IngestError::Cancelled { processed }) => {
                info!(processed, "Ingestion cancelled");
            }
            Err(e) => {
                warn!(error = %e, "Batch rejected");
                self.emit(HerdEvent::BatchRejected {
                    reason: e.to_string(),
                    timestamp: time::now(),
                });
            }
        }

        result
    }

    fn run(
        &self,
        batch: &RawBatch,
        cancel_token: &CancellationToken,
    ) -> Result<IngestReport, IngestError> {
        let (headers, delimiter) = match &batch.header {
            HeaderRow::Cells(cells) => (cells.clone(), None),
            HeaderRow::Delimited(line) => {
                let delimiter = detect_delimiter(line);
                debug!(delimiter = ?delimiter, "Detected header delimiter");
                (split_quoted(line, delimiter), Some(delimiter))
            }
        };

        let mapping = self.canonicalizer.resolve(&headers)?;
        let mut diagnostics = mapping.diagnostics.clone();
        for diagnostic in &diagnostics {
            publish(self.events.as_ref(), diagnostic);
        }

        let columns: Vec<(usize, String, CanonicalField)> = mapping
            .resolved()
            .map(|(idx, header, field)| (idx, header.to_string(), field))
            .collect();

        let mut validator = RowValidator::new();
        let mut records = Vec::with_capacity(batch.rows.len());

        for (idx, cells) in batch.rows.iter().enumerate() {
            if cancel_token.is_cancelled() {
                return Err(IngestError::Cancelled { processed: idx });
            }
            let row = idx + 1;

            if cells.len() != headers.len() {
                let diagnostic = Diagnostic::new(
                    Stage::Coercion,
                    format!(
                        "row has {} cell(s) for {} column(s)",
                        cells.len(),
                        headers.len()
                    ),
                )
                .at_row(row);
                publish(self.events.as_ref(), &diagnostic);
                diagnostics.push(diagnostic);
            }

            let mut fields = BTreeMap::new();
            for (col, header, field) in &columns {
                let cell = cells.get(*col).unwrap_or(&CellValue::Empty);
                let outcome = self.coercer.coerce(cell, field.value_class());

                for message in outcome.diagnostics {
                    let diagnostic = Diagnostic::new(Stage::Coercion, message)
                        .at_row(row)
                        .in_column(header.clone());
                    publish(self.events.as_ref(), &diagnostic);
                    diagnostics.push(diagnostic);
                }

                match outcome.value {
                    Coerced::Value(value) => {
                        fields.insert(*field, value);
                    }
                    Coerced::Degraded(text) => {
                        fields.insert(*field, FieldValue::Text(text));
                    }
                    Coerced::Null => {}
                }
            }

            if let Some(record) = validator.validate(row, fields) {
                records.push(record);
            }
        }

        let records = validator.finish(records)?;

        Ok(IngestReport {
            records,
            diagnostics,
            dropped_columns: mapping.dropped,
            delimiter,
            column_map: columns
                .into_iter()
                .map(|(_, header, field)| (header, field))
                .collect(),
        })
    }

    fn emit(&self, event: HerdEvent) {
        if let Some(bus) = &self.events {
            bus.emit_lossy(event);
        }
    }
}
