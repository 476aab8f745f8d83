//! Property tests for pipeline invariants

use herdbook_engine::ingest::coerce::{Coerced, Coercer};
use herdbook_engine::ingest::dialect::{detect_delimiter, CANDIDATE_DELIMITERS};
use herdbook_engine::ingest::header::normalize;
use herdbook_engine::pedigree::predict;
use herdbook_engine::scoring::percentile::rank_percentiles;
use herdbook_engine::scoring::segmentation::{Rationale, SegmentGroup, SegmentationRules};
use herdbook_engine::scoring::statistics::trait_stats;
use herdbook_engine::{CanonicalField, CellValue, TraitVector, ValueClass};
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

const TOL: f64 = 1e-6;

fn classes() -> impl Strategy<Value = ValueClass> {
    prop_oneof![
        Just(ValueClass::Numeric),
        Just(ValueClass::Integer),
        Just(ValueClass::Date),
        Just(ValueClass::Timestamp),
        Just(ValueClass::Text),
        Just(ValueClass::StructuredMap),
    ]
}

fn health(scs: Option<f64>, pl: Option<f64>) -> TraitVector {
    let mut v = TraitVector::new();
    v.insert(CanonicalField::Scs, scs);
    v.insert(CanonicalField::Pl, pl);
    v
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn normalize_is_idempotent(header in "\\PC{0,40}") {
        let once = normalize(&header);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn dialect_detection_is_pure(line in "[a-zA-Z0-9 ;,|\t\"]{0,60}") {
        let first = detect_delimiter(&line);
        prop_assert_eq!(detect_delimiter(&line), first);
        prop_assert!(CANDIDATE_DELIMITERS.contains(&first));
    }

    #[test]
    fn coercion_never_fails(text in "\\PC{0,30}", class in classes()) {
        let coercer = Coercer::new(["", "null", "n/a"]);
        let outcome = coercer.coerce(&CellValue::Text(text.clone()), class);
        if let Coerced::Degraded(original) = outcome.value {
            prop_assert_eq!(original, text);
            prop_assert!(!outcome.diagnostics.is_empty());
        }
    }

    #[test]
    fn statistics_identities(values in prop::collection::vec(-10_000i32..10_000, 1..60)) {
        let values: Vec<f64> = values.into_iter().map(f64::from).collect();
        let stats = trait_stats(values.iter().copied()).unwrap();

        let centered: f64 = values.iter().map(|v| v - stats.mean).sum();
        prop_assert!(centered.abs() < TOL * values.len() as f64);
        prop_assert!(stats.std_dev >= 0.0);

        let all_equal = values.iter().all(|v| *v == values[0]);
        prop_assert_eq!(stats.std_dev == 0.0, all_equal);
    }

    #[test]
    fn percentiles_form_exact_set(scores in prop::collection::vec(-1.0e6f64..1.0e6, 1..200)) {
        let n = scores.len();
        let ranked = rank_percentiles(scores.into_iter().enumerate().collect());

        prop_assert_eq!(ranked.len(), n);
        prop_assert_eq!(ranked[0].percentile, 100);

        let mut observed: Vec<u8> = ranked.iter().map(|r| r.percentile).collect();
        observed.reverse();
        let expected: Vec<u8> = (1..=n)
            .map(|k| ((k as f64 / n as f64) * 100.0).round() as u8)
            .collect();
        prop_assert_eq!(observed, expected);

        for pair in ranked.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn segmentation_partitions_and_respects_override(
        top_percent in 1u8..=100,
        scs in prop::option::of(-1.0f64..5.0),
        pl in prop::option::of(-5.0f64..8.0),
    ) {
        let rules = SegmentationRules::default();
        let (group, rationale) = rules.classify(f64::from(top_percent), &health(scs, pl));

        let critical = scs.is_some_and(|v| v > rules.critical_max)
            || pl.is_some_and(|v| v < rules.critical_min);
        if critical {
            prop_assert_eq!(group, SegmentGroup::Recipient);
            prop_assert_eq!(rationale, Rationale::CriticalHealth);
        }

        let expected_group = match rationale {
            Rationale::TopHealthOk => SegmentGroup::Donor,
            Rationale::TopHealthInsufficient | Rationale::MidRange => SegmentGroup::Intermediate,
            Rationale::CriticalHealth | Rationale::BelowThreshold => SegmentGroup::Recipient,
        };
        prop_assert_eq!(group, expected_group);
    }

    #[test]
    fn pedigree_weights_sum_to_one(
        sire in prop::option::of(-3000.0f64..3000.0),
        mgs in prop::option::of(-3000.0f64..3000.0),
        mggs in prop::option::of(-3000.0f64..3000.0),
    ) {
        let vector = |v: Option<f64>| -> TraitVector {
            [(CanonicalField::Tpi, v)].into_iter().collect()
        };
        let (s, m, g) = (vector(sire), vector(mgs), vector(mggs));
        let prediction = predict(&s, Some(&m), Some(&g));

        match prediction.contributions.get(&CanonicalField::Tpi) {
            Some(contributions) => {
                let total: f64 = contributions.iter().map(|c| c.weight).sum();
                prop_assert!((total - 1.0).abs() < 1e-12);
            }
            None => {
                prop_assert!(sire.is_none() && mgs.is_none() && mggs.is_none());
                prop_assert_eq!(prediction.get(CanonicalField::Tpi), None);
            }
        }
    }
}
