//! Weighted random choice.

use rand::Rng;

/// Picks one item with probability proportional to its weight.
///
/// When every weight is zero the first item wins, so the result only depends
/// on registry order. Returns `None` for an empty slice.
pub fn select_weighted<'a, T>(items: &'a [(T, u32)], rng: &mut impl Rng) -> Option<&'a T> {
    let total: u64 = items.iter().map(|(_, w)| u64::from(*w)).sum();
    if total == 0 {
        return items.first().map(|(item, _)| item);
    }

    let mut pick = rng.random_range(0..total);
    for (item, weight) in items {
        let weight = u64::from(*weight);
        if pick < weight {
            return Some(item);
        }
        pick -= weight;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn empty_selects_nothing() {
        let items: [(&str, u32); 0] = [];
        assert!(select_weighted(&items, &mut rand::rng()).is_none());
    }

    #[test]
    fn zero_total_picks_first() {
        let items = [("legion", 0), ("doctor", 0)];
        assert_eq!(select_weighted(&items, &mut rand::rng()), Some(&"legion"));
    }

    #[test]
    fn zero_weight_never_chosen() {
        let items = [("legion", 0), ("doctor", 5)];
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            assert_eq!(select_weighted(&items, &mut rng), Some(&"doctor"));
        }
    }

    proptest! {
        #[test]
        fn frequencies_converge_to_weights(
            weights in prop::collection::vec(1u32..50, 2..5),
            seed in any::<u64>(),
        ) {
            let items: Vec<(usize, u32)> = weights.iter().copied().enumerate().collect();
            let total: u32 = weights.iter().sum();
            let mut rng = StdRng::seed_from_u64(seed);
            let draws = 20_000;
            let mut counts = vec![0u32; items.len()];
            for _ in 0..draws {
                let idx = *select_weighted(&items, &mut rng).unwrap();
                counts[idx] += 1;
            }
            for (idx, weight) in weights.iter().enumerate() {
                let expected = f64::from(*weight) / f64::from(total);
                let observed = f64::from(counts[idx]) / f64::from(draws);
                prop_assert!((expected - observed).abs() < 0.03,
                    "index {} expected {:.3} observed {:.3}", idx, expected, observed);
            }
        }
    }
}
