//! Non-fatal diagnostics returned alongside pipeline results
//!
//! Every diagnostic is logged at `warn` and, when an [`EventBus`] is
//! attached, published as [`HerdEvent::Diagnostic`].

use herdbook_common::events::{EventBus, HerdEvent, Stage};
use serde::Serialize;
use std::fmt;
use tracing::warn;

/// Human-readable warning tied to an optional row and column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub stage: Stage,
    /// 1-based data row number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    /// Original header text of the column
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            row: None,
            column: None,
            message: message.into(),
        }
    }

    pub fn at_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }

    pub fn in_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.row, &self.column) {
            (Some(row), Some(column)) => write!(f, "row {}, column '{}': {}", row, column, self.message),
            (Some(row), None) => write!(f, "row {}: {}", row, self.message),
            (None, Some(column)) => write!(f, "column '{}': {}", column, self.message),
            (None, None) => f.write_str(&self.message),
        }
    }
}

/// Log a diagnostic and forward it to the event bus, if any
pub(crate) fn publish(events: Option<&EventBus>, diagnostic: &Diagnostic) {
    warn!(stage = %diagnostic.stage, "{}", diagnostic);
    if let Some(bus) = events {
        bus.emit_lossy(HerdEvent::diagnostic(diagnostic.stage, diagnostic.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_location() {
        let diag = Diagnostic::new(Stage::Coercion, "could not normalize date")
            .at_row(3)
            .in_column("Nascimento");
        assert_eq!(
            diag.to_string(),
            "row 3, column 'Nascimento': could not normalize date"
        );
        assert_eq!(
            Diagnostic::new(Stage::Header, "dropped").to_string(),
            "dropped"
        );
    }

    #[tokio::test]
    async fn test_publish_forwards_to_bus() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        publish(Some(&bus), &Diagnostic::new(Stage::Scoring, "fallback trait used"));

        match rx.recv().await.unwrap() {
            HerdEvent::Diagnostic { stage, message, .. } => {
                assert_eq!(stage, Stage::Scoring);
                assert_eq!(message, "fallback trait used");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
