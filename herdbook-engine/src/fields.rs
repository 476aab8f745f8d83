//! Canonical field identifiers and their value classes
//!
//! Every column that survives header canonicalization maps to exactly one
//! [`CanonicalField`], and every canonical field carries exactly one
//! [`ValueClass`] that drives type coercion.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declared value class of a canonical field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueClass {
    /// Floating-point trait value
    Numeric,
    /// Numeric subclass truncated toward zero (index scores)
    Integer,
    /// Calendar date
    Date,
    /// Instant in time, normalized to UTC
    Timestamp,
    /// Free text (identifiers, names, codes)
    Text,
    /// Key/value map
    StructuredMap,
}

impl ValueClass {
    /// True for classes that produce trait values
    pub fn is_numeric(self) -> bool {
        matches!(self, ValueClass::Numeric | ValueClass::Integer)
    }
}

/// Canonical field identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    // Identity
    Id,
    Identifier,
    ExternalId,
    Registration,
    Name,
    Breed,
    Sex,

    // Dates
    BirthDate,
    EvaluationDate,
    UpdatedAt,

    // Pedigree references
    SireRef,
    MgsRef,
    MggsRef,

    // Composite indices
    Tpi,
    NmDollar,
    HhpDollar,
    CmDollar,
    FmDollar,
    GmDollar,

    // Production
    Milk,
    Fat,
    FatPct,
    Protein,
    ProteinPct,

    // Health and fertility
    Scs,
    Pl,
    Dpr,
    Hcr,
    Ccr,
    Livability,

    // Type and calving
    Ptat,
    Udc,
    Flc,
    Sce,
    Dce,

    // Genomics
    Gfi,
    Reliability,
    BetaCasein,
    KappaCasein,
    Haplotypes,

    Notes,
}

impl CanonicalField {
    /// All canonical fields, in declaration order
    pub const ALL: &'static [CanonicalField] = &[
        CanonicalField::Id,
        CanonicalField::Identifier,
        CanonicalField::ExternalId,
        CanonicalField::Registration,
        CanonicalField::Name,
        CanonicalField::Breed,
        CanonicalField::Sex,
        CanonicalField::BirthDate,
        CanonicalField::EvaluationDate,
        CanonicalField::UpdatedAt,
        CanonicalField::SireRef,
        CanonicalField::MgsRef,
        CanonicalField::MggsRef,
        CanonicalField::Tpi,
        CanonicalField::NmDollar,
        CanonicalField::HhpDollar,
        CanonicalField::CmDollar,
        CanonicalField::FmDollar,
        CanonicalField::GmDollar,
        CanonicalField::Milk,
        CanonicalField::Fat,
        CanonicalField::FatPct,
        CanonicalField::Protein,
        CanonicalField::ProteinPct,
        CanonicalField::Scs,
        CanonicalField::Pl,
        CanonicalField::Dpr,
        CanonicalField::Hcr,
        CanonicalField::Ccr,
        CanonicalField::Livability,
        CanonicalField::Ptat,
        CanonicalField::Udc,
        CanonicalField::Flc,
        CanonicalField::Sce,
        CanonicalField::Dce,
        CanonicalField::Gfi,
        CanonicalField::Reliability,
        CanonicalField::BetaCasein,
        CanonicalField::KappaCasein,
        CanonicalField::Haplotypes,
        CanonicalField::Notes,
    ];

    /// Fields whose values are trimmed strings used for identity and pedigree lookups
    pub const ID_LIKE: &'static [CanonicalField] = &[
        CanonicalField::Id,
        CanonicalField::Identifier,
        CanonicalField::ExternalId,
        CanonicalField::Registration,
        CanonicalField::SireRef,
        CanonicalField::MgsRef,
        CanonicalField::MggsRef,
    ];

    /// Canonical id string (matches the serde representation)
    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalField::Id => "id",
            CanonicalField::Identifier => "identifier",
            CanonicalField::ExternalId => "external_id",
            CanonicalField::Registration => "registration",
            CanonicalField::Name => "name",
            CanonicalField::Breed => "breed",
            CanonicalField::Sex => "sex",
            CanonicalField::BirthDate => "birth_date",
            CanonicalField::EvaluationDate => "evaluation_date",
            CanonicalField::UpdatedAt => "updated_at",
            CanonicalField::SireRef => "sire_ref",
            CanonicalField::MgsRef => "mgs_ref",
            CanonicalField::MggsRef => "mggs_ref",
            CanonicalField::Tpi => "tpi",
            CanonicalField::NmDollar => "nm_dollar",
            CanonicalField::HhpDollar => "hhp_dollar",
            CanonicalField::CmDollar => "cm_dollar",
            CanonicalField::FmDollar => "fm_dollar",
            CanonicalField::GmDollar => "gm_dollar",
            CanonicalField::Milk => "milk",
            CanonicalField::Fat => "fat",
            CanonicalField::FatPct => "fat_pct",
            CanonicalField::Protein => "protein",
            CanonicalField::ProteinPct => "protein_pct",
            CanonicalField::Scs => "scs",
            CanonicalField::Pl => "pl",
            CanonicalField::Dpr => "dpr",
            CanonicalField::Hcr => "hcr",
            CanonicalField::Ccr => "ccr",
            CanonicalField::Livability => "livability",
            CanonicalField::Ptat => "ptat",
            CanonicalField::Udc => "udc",
            CanonicalField::Flc => "flc",
            CanonicalField::Sce => "sce",
            CanonicalField::Dce => "dce",
            CanonicalField::Gfi => "gfi",
            CanonicalField::Reliability => "reliability",
            CanonicalField::BetaCasein => "beta_casein",
            CanonicalField::KappaCasein => "kappa_casein",
            CanonicalField::Haplotypes => "haplotypes",
            CanonicalField::Notes => "notes",
        }
    }

    /// Look up a field by its exact canonical id
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.as_str() == id)
    }

    /// Declared value class
    pub fn value_class(self) -> ValueClass {
        use CanonicalField::*;
        match self {
            Id | Identifier | ExternalId | Registration | Name | Breed | Sex | SireRef
            | MgsRef | MggsRef | BetaCasein | KappaCasein | Notes => ValueClass::Text,
            BirthDate | EvaluationDate => ValueClass::Date,
            UpdatedAt => ValueClass::Timestamp,
            Tpi | NmDollar | HhpDollar | CmDollar | FmDollar | GmDollar => ValueClass::Integer,
            Milk | Fat | FatPct | Protein | ProteinPct | Scs | Pl | Dpr | Hcr | Ccr
            | Livability | Ptat | Udc | Flc | Sce | Dce | Gfi | Reliability => ValueClass::Numeric,
            Haplotypes => ValueClass::StructuredMap,
        }
    }

    /// True if this field contributes to trait vectors
    pub fn is_trait(self) -> bool {
        self.value_class().is_numeric()
    }

    /// All trait fields, in declaration order
    pub fn traits() -> impl Iterator<Item = CanonicalField> {
        Self::ALL.iter().copied().filter(|f| f.is_trait())
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a canonical field id
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown canonical field '{0}'")]
pub struct UnknownField(pub String);

impl FromStr for CanonicalField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s.trim()).ok_or_else(|| UnknownField(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_str_matches_serde_name() {
        for field in CanonicalField::ALL {
            let json = serde_json::to_string(field).unwrap();
            assert_eq!(json, format!("\"{}\"", field.as_str()));
        }
    }

    #[test]
    fn test_from_id_round_trips_every_field() {
        for field in CanonicalField::ALL {
            assert_eq!(CanonicalField::from_id(field.as_str()), Some(*field));
        }
        assert_eq!(CanonicalField::from_id("naab"), None);
    }

    #[test]
    fn test_value_classes() {
        assert_eq!(CanonicalField::Tpi.value_class(), ValueClass::Integer);
        assert_eq!(CanonicalField::Scs.value_class(), ValueClass::Numeric);
        assert_eq!(CanonicalField::BirthDate.value_class(), ValueClass::Date);
        assert_eq!(CanonicalField::UpdatedAt.value_class(), ValueClass::Timestamp);
        assert_eq!(CanonicalField::Haplotypes.value_class(), ValueClass::StructuredMap);
        assert_eq!(CanonicalField::SireRef.value_class(), ValueClass::Text);
    }

    #[test]
    fn test_id_like_fields_are_text() {
        for field in CanonicalField::ID_LIKE {
            assert_eq!(field.value_class(), ValueClass::Text);
        }
    }

    #[test]
    fn test_parse_unknown_field() {
        assert!("tpi".parse::<CanonicalField>().is_ok());
        assert_eq!(
            "bogus".parse::<CanonicalField>(),
            Err(UnknownField("bogus".to_string()))
        );
    }
}
