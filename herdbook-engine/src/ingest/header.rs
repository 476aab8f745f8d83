// Header Canonicalizer
//
// Maps arbitrary column-header text to canonical field ids:
// normalize → static alias table → configured aliases → verbatim canonical id.
// Unrecognized columns are dropped with a diagnostic; zero recognized columns
// aborts the batch before any row is processed.

use crate::diagnostics::Diagnostic;
use crate::fields::CanonicalField;
use crate::ingest::SchemaError;
use herdbook_common::events::Stage;
use std::collections::HashMap;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize header text for alias lookup
///
/// Strips diacritics, lowercases, maps `$` → `_dollar` and `%` → `_pct`,
/// collapses runs of characters outside `[a-z0-9_]` to a single `_`, and
/// trims `_` from both ends. Idempotent.
///
/// `_` itself is treated as a separator, so `a__b` becomes `a_b`. Without
/// this, `Fat %` would expand to `fat__pct` and miss the `fat_pct` field.
pub fn normalize(header: &str) -> String {
    let stripped: String = header.nfd().filter(|c| !is_combining_mark(*c)).collect();
    let lowered = stripped.to_lowercase();

    let mut expanded = String::with_capacity(lowered.len() + 8);
    for c in lowered.chars() {
        match c {
            '$' => expanded.push_str("_dollar"),
            '%' => expanded.push_str("_pct"),
            other => expanded.push(other),
        }
    }

    let mut out = String::with_capacity(expanded.len());
    let mut pending_sep = false;
    for c in expanded.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c);
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Static alias table: normalized header spelling → canonical field
const ALIASES: &[(&str, CanonicalField)] = &[
    // Identity
    ("internal_id", CanonicalField::Id),
    ("db_id", CanonicalField::Id),
    ("codigo_interno", CanonicalField::Id),
    ("naab", CanonicalField::Identifier),
    ("naab_code", CanonicalField::Identifier),
    ("codigo_naab", CanonicalField::Identifier),
    ("bull_code", CanonicalField::Identifier),
    ("code", CanonicalField::Identifier),
    ("codigo", CanonicalField::Identifier),
    ("identificador", CanonicalField::Identifier),
    ("ext_id", CanonicalField::ExternalId),
    ("id_externo", CanonicalField::ExternalId),
    ("interbull_id", CanonicalField::ExternalId),
    ("animal_id", CanonicalField::ExternalId),
    ("reg", CanonicalField::Registration),
    ("reg_no", CanonicalField::Registration),
    ("registration_number", CanonicalField::Registration),
    ("registro", CanonicalField::Registration),
    ("hb_number", CanonicalField::Registration),
    ("herdbook_number", CanonicalField::Registration),
    ("nome", CanonicalField::Name),
    ("animal_name", CanonicalField::Name),
    ("bull_name", CanonicalField::Name),
    ("nome_do_animal", CanonicalField::Name),
    ("nome_touro", CanonicalField::Name),
    ("touro", CanonicalField::Name),
    ("raca", CanonicalField::Breed),
    ("sexo", CanonicalField::Sex),
    ("gender", CanonicalField::Sex),
    // Dates
    ("birthdate", CanonicalField::BirthDate),
    ("dob", CanonicalField::BirthDate),
    ("date_of_birth", CanonicalField::BirthDate),
    ("nascimento", CanonicalField::BirthDate),
    ("data_nascimento", CanonicalField::BirthDate),
    ("data_de_nascimento", CanonicalField::BirthDate),
    ("eval_date", CanonicalField::EvaluationDate),
    ("proof_date", CanonicalField::EvaluationDate),
    ("data_avaliacao", CanonicalField::EvaluationDate),
    ("data_da_prova", CanonicalField::EvaluationDate),
    ("last_updated", CanonicalField::UpdatedAt),
    ("modified", CanonicalField::UpdatedAt),
    ("atualizado_em", CanonicalField::UpdatedAt),
    // Pedigree
    ("sire", CanonicalField::SireRef),
    ("sire_code", CanonicalField::SireRef),
    ("sire_naab", CanonicalField::SireRef),
    ("father", CanonicalField::SireRef),
    ("pai", CanonicalField::SireRef),
    ("mgs", CanonicalField::MgsRef),
    ("mgs_code", CanonicalField::MgsRef),
    ("maternal_grandsire", CanonicalField::MgsRef),
    ("avo_materno", CanonicalField::MgsRef),
    ("mggs", CanonicalField::MggsRef),
    ("mmgs", CanonicalField::MggsRef),
    ("mggs_code", CanonicalField::MggsRef),
    ("maternal_great_grandsire", CanonicalField::MggsRef),
    ("bisavo_materno", CanonicalField::MggsRef),
    // Indices
    ("gtpi", CanonicalField::Tpi),
    ("nm", CanonicalField::NmDollar),
    ("net_merit", CanonicalField::NmDollar),
    ("merito_liquido", CanonicalField::NmDollar),
    ("hhp", CanonicalField::HhpDollar),
    ("cheese_merit", CanonicalField::CmDollar),
    ("fluid_merit", CanonicalField::FmDollar),
    ("grazing_merit", CanonicalField::GmDollar),
    // Production
    ("ptam", CanonicalField::Milk),
    ("pta_milk", CanonicalField::Milk),
    ("leite", CanonicalField::Milk),
    ("ptaf", CanonicalField::Fat),
    ("pta_fat", CanonicalField::Fat),
    ("gordura", CanonicalField::Fat),
    ("ptaf_pct", CanonicalField::FatPct),
    ("gordura_pct", CanonicalField::FatPct),
    ("pct_gordura", CanonicalField::FatPct),
    ("ptap", CanonicalField::Protein),
    ("pta_protein", CanonicalField::Protein),
    ("proteina", CanonicalField::Protein),
    ("ptap_pct", CanonicalField::ProteinPct),
    ("proteina_pct", CanonicalField::ProteinPct),
    ("pct_proteina", CanonicalField::ProteinPct),
    // Health and fertility
    ("somatic_cell_score", CanonicalField::Scs),
    ("ccs", CanonicalField::Scs),
    ("escore_celulas_somaticas", CanonicalField::Scs),
    ("productive_life", CanonicalField::Pl),
    ("vida_produtiva", CanonicalField::Pl),
    ("vp", CanonicalField::Pl),
    ("daughter_pregnancy_rate", CanonicalField::Dpr),
    ("taxa_prenhez_filhas", CanonicalField::Dpr),
    ("heifer_conception_rate", CanonicalField::Hcr),
    ("cow_conception_rate", CanonicalField::Ccr),
    ("liv", CanonicalField::Livability),
    ("sobrevivencia", CanonicalField::Livability),
    // Type and calving
    ("type", CanonicalField::Ptat),
    ("tipo", CanonicalField::Ptat),
    ("pta_type", CanonicalField::Ptat),
    ("udder_composite", CanonicalField::Udc),
    ("composto_ubere", CanonicalField::Udc),
    ("feet_legs_composite", CanonicalField::Flc),
    ("composto_pernas_pes", CanonicalField::Flc),
    ("sire_calving_ease", CanonicalField::Sce),
    ("facilidade_parto_touro", CanonicalField::Sce),
    ("daughter_calving_ease", CanonicalField::Dce),
    // Genomics
    ("genomic_future_inbreeding", CanonicalField::Gfi),
    ("inbreeding", CanonicalField::Gfi),
    ("consanguinidade", CanonicalField::Gfi),
    ("rel", CanonicalField::Reliability),
    ("rel_pct", CanonicalField::Reliability),
    ("confiabilidade", CanonicalField::Reliability),
    ("betacasein", CanonicalField::BetaCasein),
    ("beta_caseina", CanonicalField::BetaCasein),
    ("kappa_caseina", CanonicalField::KappaCasein),
    ("haplotipos", CanonicalField::Haplotypes),
    ("genetic_tests", CanonicalField::Haplotypes),
    ("obs", CanonicalField::Notes),
    ("observacoes", CanonicalField::Notes),
    ("comments", CanonicalField::Notes),
];

/// Header-to-field mapping for one batch
#[derive(Debug, Clone, Default)]
pub struct HeaderMapping {
    /// Canonical field per column position (`None` = dropped)
    pub columns: Vec<Option<CanonicalField>>,
    /// Original header text per column position
    pub headers: Vec<String>,
    /// Original text of dropped columns
    pub dropped: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl HeaderMapping {
    pub fn resolved_count(&self) -> usize {
        self.columns.iter().filter(|c| c.is_some()).count()
    }

    /// (original header, canonical field) pairs for resolved columns
    pub fn resolved(&self) -> impl Iterator<Item = (usize, &str, CanonicalField)> + '_ {
        self.columns
            .iter()
            .enumerate()
            .filter_map(|(idx, field)| field.map(|f| (idx, self.headers[idx].as_str(), f)))
    }
}

/// Resolves batch headers to canonical fields
#[derive(Debug, Clone)]
pub struct HeaderCanonicalizer {
    extra_aliases: HashMap<String, CanonicalField>,
}

impl Default for HeaderCanonicalizer {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

impl HeaderCanonicalizer {
    /// Create a canonicalizer with configured aliases (keys are normalized here)
    pub fn new(extra_aliases: HashMap<String, CanonicalField>) -> Self {
        let extra_aliases = extra_aliases
            .into_iter()
            .map(|(alias, field)| (normalize(&alias), field))
            .collect();
        Self { extra_aliases }
    }

    /// Resolve one header to a canonical field
    pub fn resolve_one(&self, header: &str) -> Option<CanonicalField> {
        let key = normalize(header);
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, field)| *field)
            .or_else(|| self.extra_aliases.get(&key).copied())
            .or_else(|| CanonicalField::from_id(&key))
    }

    /// Resolve all headers of a batch
    ///
    /// The first column mapping to a given field wins; later duplicates are
    /// dropped with a diagnostic.
    pub fn resolve(&self, headers: &[String]) -> Result<HeaderMapping, SchemaError> {
        let mut mapping = HeaderMapping {
            headers: headers.to_vec(),
            ..Default::default()
        };
        let mut claimed: HashMap<CanonicalField, usize> = HashMap::new();

        for (idx, header) in headers.iter().enumerate() {
            match self.resolve_one(header) {
                Some(field) => {
                    if let Some(first) = claimed.get(&field) {
                        mapping.diagnostics.push(
                            Diagnostic::new(
                                Stage::Header,
                                format!(
                                    "duplicate column for '{}' (already mapped from column {}), dropped",
                                    field,
                                    first + 1
                                ),
                            )
                            .in_column(header.clone()),
                        );
                        mapping.dropped.push(header.clone());
                        mapping.columns.push(None);
                    } else {
                        claimed.insert(field, idx);
                        mapping.columns.push(Some(field));
                    }
                }
                None => {
                    mapping.diagnostics.push(
                        Diagnostic::new(Stage::Header, "unrecognized column, dropped")
                            .in_column(header.clone()),
                    );
                    mapping.dropped.push(header.clone());
                    mapping.columns.push(None);
                }
            }
        }

        if mapping.resolved_count() == 0 {
            return Err(SchemaError::NoRecognizableSchema {
                headers: headers.to_vec(),
            });
        }

        Ok(mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_examples() {
        assert_eq!(normalize("NM$"), "nm_dollar");
        assert_eq!(normalize("Fat %"), "fat_pct");
        assert_eq!(normalize("  Data de Nascimento "), "data_de_nascimento");
        assert_eq!(normalize("Raça"), "raca");
        assert_eq!(normalize("Proteína (%)"), "proteina_pct");
        assert_eq!(normalize("__TPI__"), "tpi");
        assert_eq!(normalize("% Gordura"), "pct_gordura");
        assert_eq!(normalize("%Gordura"), "pctgordura");
        assert_eq!(normalize("---"), "");
    }

    #[test]
    fn test_underscore_runs_collapse() {
        assert_eq!(normalize("a__b"), "a_b");
        assert_eq!(normalize("fat__pct"), "fat_pct");
        assert_eq!(normalize("Fat %"), normalize("fat_pct"));
        assert_eq!(normalize("HHP _ $"), "hhp_dollar");
    }

    #[test]
    fn test_normalize_is_idempotent_on_samples() {
        for h in ["NM$", "Fat %", "Raça", "a__b", "_x_", "HHP$ (2024)", "ÇÃO%$"] {
            let once = normalize(h);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", h);
        }
    }

    #[test]
    fn test_resolve_naab_nome_tpi_nm() {
        let canonicalizer = HeaderCanonicalizer::default();
        let mapping = canonicalizer
            .resolve(&headers(&["NAAB", "Nome", "TPI", "NM$"]))
            .unwrap();

        assert!(mapping.dropped.is_empty());
        assert_eq!(
            mapping.columns,
            vec![
                Some(CanonicalField::Identifier),
                Some(CanonicalField::Name),
                Some(CanonicalField::Tpi),
                Some(CanonicalField::NmDollar),
            ]
        );
    }

    #[test]
    fn test_unrecognized_columns_are_dropped_with_diagnostic() {
        let canonicalizer = HeaderCanonicalizer::default();
        let mapping = canonicalizer
            .resolve(&headers(&["NAAB", "Favorite Color"]))
            .unwrap();

        assert_eq!(mapping.resolved_count(), 1);
        assert_eq!(mapping.dropped, vec!["Favorite Color".to_string()]);
        assert_eq!(mapping.diagnostics.len(), 1);
    }

    #[test]
    fn test_zero_recognized_columns_is_schema_error() {
        let canonicalizer = HeaderCanonicalizer::default();
        let result = canonicalizer.resolve(&headers(&["foo", "bar"]));
        assert!(matches!(result, Err(SchemaError::NoRecognizableSchema { .. })));
    }

    #[test]
    fn test_duplicate_target_first_wins() {
        let canonicalizer = HeaderCanonicalizer::default();
        let mapping = canonicalizer
            .resolve(&headers(&["TPI", "GTPI"]))
            .unwrap();
        assert_eq!(mapping.columns, vec![Some(CanonicalField::Tpi), None]);
        assert_eq!(mapping.dropped, vec!["GTPI".to_string()]);
    }

    #[test]
    fn test_configured_alias_is_consulted() {
        let mut extra = HashMap::new();
        extra.insert("Código do Touro".to_string(), CanonicalField::Identifier);
        let canonicalizer = HeaderCanonicalizer::new(extra);
        assert_eq!(
            canonicalizer.resolve_one("codigo do touro"),
            Some(CanonicalField::Identifier)
        );
    }

    #[test]
    fn test_verbatim_canonical_id_accepted() {
        let canonicalizer = HeaderCanonicalizer::default();
        assert_eq!(
            canonicalizer.resolve_one("birth_date"),
            Some(CanonicalField::BirthDate)
        );
        assert_eq!(canonicalizer.resolve_one("Beta Casein"), Some(CanonicalField::BetaCasein));
    }
}
