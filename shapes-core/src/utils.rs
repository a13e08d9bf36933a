//! Small helpers for ordering and image lists.

use rand::seq::SliceRandom;
use rand::Rng;

/// `[0, 1, ..., len - 1]`.
#[must_use]
pub fn identity_permutation(len: usize) -> Vec<usize> {
    (0..len).collect()
}

/// A uniformly shuffled permutation of `0..len`.
#[must_use]
pub fn random_permutation<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<usize> {
    let mut permutation = identity_permutation(len);
    permutation.shuffle(rng);
    permutation
}

/// Whether `permutation` is a permutation of `0..len`.
#[must_use]
pub fn is_permutation(permutation: &[usize], len: usize) -> bool {
    if permutation.len() != len {
        return false;
    }
    let mut seen = vec![false; len];
    permutation
        .iter()
        .all(|&i| i < len && !std::mem::replace(&mut seen[i], true))
}

/// Walk `items` in permuted order.
///
/// Yields `(display_index, original_index, item)`: the k-th step visits
/// `items[permutation[k]]`. Out of range indexes are skipped.
pub fn permuted<'a, T>(
    items: &'a [T],
    permutation: &'a [usize],
) -> impl Iterator<Item = (usize, usize, &'a T)> + 'a {
    permutation
        .iter()
        .enumerate()
        .filter_map(move |(display, &original)| {
            items.get(original).map(|item| (display, original, item))
        })
}

/// Expand a `%d` pattern over `start..=end`.
///
/// `explode("test%d.png", 1, 3)` gives `test1.png`, `test2.png`, `test3.png`.
/// Only the first `%d` is replaced.
#[must_use]
pub fn explode(pattern: &str, start: i64, end: i64) -> Vec<String> {
    (start..=end)
        .map(|i| pattern.replacen("%d", &i.to_string(), 1))
        .collect()
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn test_random_permutation_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        for len in [0, 1, 2, 10, 57] {
            let p = random_permutation(len, &mut rng);
            assert!(is_permutation(&p, len), "{p:?}");
        }
    }

    #[test]
    fn test_is_permutation() {
        assert!(is_permutation(&[2, 0, 1], 3));
        assert!(!is_permutation(&[0, 0, 1], 3));
        assert!(!is_permutation(&[0, 1], 3));
        assert!(!is_permutation(&[0, 1, 3], 3));
    }

    #[test]
    fn test_permuted_walk() {
        let items = ["a", "b", "c"];
        let walked: Vec<_> = permuted(&items, &[2, 0, 1]).collect();
        assert_eq!(walked, vec![(0, 2, &"c"), (1, 0, &"a"), (2, 1, &"b")]);
    }

    #[test]
    fn test_explode() {
        assert_eq!(
            explode("img/test%d.png", 1, 3),
            vec!["img/test1.png", "img/test2.png", "img/test3.png"]
        );
        assert!(explode("x%d", 3, 2).is_empty());
        assert_eq!(explode("plain.png", 0, 0), vec!["plain.png"]);
    }
}
