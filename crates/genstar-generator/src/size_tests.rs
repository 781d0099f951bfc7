use proptest::prelude::*;

use super::*;

const FAMILIES: [AlgorithmFamily; 4] = [
    AlgorithmFamily::SyntheticReconstruction,
    AlgorithmFamily::CombinatorialOptimization,
    AlgorithmFamily::Mixture,
    AlgorithmFamily::Multilevel,
];

#[test]
fn test_unspecified_size_keeps_sample_outside_sr() {
    for family in &FAMILIES[1..] {
        assert_eq!(resolve_size(-1, *family, &[10.0]), TargetSize::AsSample);
        assert_eq!(resolve_size(0, *family, &[]), TargetSize::AsSample);
    }
}

#[test]
fn test_zero_total_is_clamped() {
    assert_eq!(
        resolve_size(0, AlgorithmFamily::SyntheticReconstruction, &[0.0, 12.0]),
        TargetSize::Exact(1)
    );
}

proptest! {
    #[test]
    fn test_positive_request_is_kept(s in 1i64..1_000_000, family in 0usize..4) {
        prop_assert_eq!(
            resolve_size(s, FAMILIES[family], &[5.0, 7.0]),
            TargetSize::Exact(s as usize)
        );
    }

    #[test]
    fn test_unspecified_request_uses_min_total(
        s in -1000i64..=0,
        totals in proptest::collection::vec(1u32..100_000, 1..6),
    ) {
        let totals: Vec<f64> = totals.into_iter().map(f64::from).collect();
        let min = totals.iter().copied().fold(f64::INFINITY, f64::min) as usize;
        prop_assert_eq!(
            resolve_size(s, AlgorithmFamily::SyntheticReconstruction, &totals),
            TargetSize::Exact(min)
        );
    }

    #[test]
    fn test_unspecified_request_without_tables(s in -1000i64..=0) {
        prop_assert_eq!(
            resolve_size(s, AlgorithmFamily::SyntheticReconstruction, &[]),
            TargetSize::Exact(1)
        );
    }
}
