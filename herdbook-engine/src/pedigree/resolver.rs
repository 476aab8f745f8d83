//! Ancestor resolution
//!
//! The [`AncestorResolver`] trait is the seam to whatever knows ancestors'
//! trait values (a herdbook service, a registry client, or a local record
//! collection). Resolution is read-only and safe to retry.

use crate::fields::CanonicalField;
use crate::types::{AnimalRecord, TraitVector};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Trait values and display name of a resolved ancestor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedAncestor {
    pub code: String,
    pub display_name: String,
    pub traits: TraitVector,
}

/// Transient lookup failure (the resolver could not answer)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("lookup for ancestor '{code}' failed: {message}")]
pub struct ResolverError {
    pub code: String,
    pub message: String,
}

impl ResolverError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Ancestor-code → trait values lookup
#[async_trait]
pub trait AncestorResolver: Send + Sync {
    /// Resolve one normalized ancestor code
    ///
    /// # Returns
    /// * `Ok(Some(_))` - ancestor found
    /// * `Ok(None)` - ancestor unknown to this resolver
    /// * `Err(_)` - lookup failed; the caller may retry later
    async fn resolve(&self, code: &str) -> Result<Option<ResolvedAncestor>, ResolverError>;
}

/// Canonical form of an ancestor code: trimmed, uppercase, non-empty
pub fn normalize_code(code: &str) -> Option<String> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

/// Resolves ancestor codes against an in-memory record collection
///
/// Codes match `identifier` first, then `registration`, then `external_id`.
/// Within one key kind the first record wins.
#[derive(Debug, Clone, Default)]
pub struct RecordResolver {
    by_identifier: HashMap<String, ResolvedAncestor>,
    by_registration: HashMap<String, ResolvedAncestor>,
    by_external_id: HashMap<String, ResolvedAncestor>,
}

impl RecordResolver {
    pub fn from_records(records: &[AnimalRecord]) -> Self {
        let mut resolver = Self::default();

        for record in records {
            let ancestor = |code: String| ResolvedAncestor {
                code,
                display_name: record.display_name().to_string(),
                traits: record.trait_vector(),
            };

            let indexes = [
                (CanonicalField::Identifier, &mut resolver.by_identifier),
                (CanonicalField::Registration, &mut resolver.by_registration),
                (CanonicalField::ExternalId, &mut resolver.by_external_id),
            ];
            for (field, index) in indexes {
                if let Some(code) = record.get_text(field).and_then(normalize_code) {
                    index.entry(code.clone()).or_insert_with(|| ancestor(code));
                }
            }
        }

        tracing::debug!(
            identifiers = resolver.by_identifier.len(),
            registrations = resolver.by_registration.len(),
            external_ids = resolver.by_external_id.len(),
            "Built record resolver"
        );
        resolver
    }

    pub fn len(&self) -> usize {
        self.by_identifier.len() + self.by_registration.len() + self.by_external_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, code: &str) -> Option<&ResolvedAncestor> {
        self.by_identifier
            .get(code)
            .or_else(|| self.by_registration.get(code))
            .or_else(|| self.by_external_id.get(code))
    }
}

#[async_trait]
impl AncestorResolver for RecordResolver {
    async fn resolve(&self, code: &str) -> Result<Option<ResolvedAncestor>, ResolverError> {
        let Some(code) = normalize_code(code) else {
            return Ok(None);
        };
        Ok(self.lookup(&code).cloned())
    }
}
