//! Properties of the range algebra.

use proptest::prelude::*;

use substrate_pipeline::models::Range;

use super::strategies::{any_range, closed_range, sub_range};

fn contains(range: &Range, height: u64) -> bool {
	range.from <= height && height <= range.end()
}

fn span(range: &Range) -> u64 {
	range.end() - range.from + 1
}

proptest! {
	#[test]
	fn intersection_is_symmetric(a in any_range(), b in any_range()) {
		prop_assert_eq!(a.intersection(&b), b.intersection(&a));
	}

	#[test]
	fn intersection_lies_within_both_operands(a in any_range(), b in any_range()) {
		if let Some(overlap) = a.intersection(&b) {
			prop_assert!(overlap.from <= overlap.end());
			prop_assert!(contains(&a, overlap.from) && contains(&b, overlap.from));
			prop_assert!(contains(&a, overlap.end()) && contains(&b, overlap.end()));
		} else {
			// Disjoint ranges share no height at the boundary either.
			prop_assert!(a.end() < b.from || b.end() < a.from);
		}
	}

	#[test]
	fn intersection_with_self_is_identity(a in any_range()) {
		prop_assert_eq!(a.intersection(&a), Some(a));
	}

	#[test]
	fn difference_and_minus_partition_the_range(
		(a, minus) in closed_range().prop_flat_map(|a| (Just(a), sub_range(a)))
	) {
		let parts = a.difference(&minus);
		prop_assert!(parts.len() <= 2);

		for part in &parts {
			// Each piece lies within `a` and outside `minus`.
			prop_assert!(contains(&a, part.from) && contains(&a, part.end()));
			prop_assert!(part.intersection(&minus).is_none());
		}
		for pair in parts.windows(2) {
			prop_assert!(pair[0].end() < pair[1].from);
		}

		let removed: u64 = parts.iter().map(span).sum();
		prop_assert_eq!(removed + span(&minus), span(&a));
	}
}
