/// Guards the division in [`unit_normalize`] against zero-length vectors.
pub const NORM_EPSILON: f32 = 1e-10;

/// Scales `vector` to unit length as `v / (‖v‖ + ε)`.
///
/// A zero vector stays zero, and so scores 0 against everything.
#[must_use]
pub fn unit_normalize(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    vector.iter().map(|v| v / (norm + NORM_EPSILON)).collect()
}

/// Dot product; mismatched lengths score 0 instead of panicking.
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Cosine similarity of two raw vectors, clamped to [-1, 1].
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    dot(&unit_normalize(a), &unit_normalize(b)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn zero_vector_normalizes_to_zero() {
        let normalized = unit_normalize(&[0.0, 0.0, 0.0]);
        assert!(normalized.iter().all(|v| *v == 0.0));
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn self_similarity_is_one() {
        let v = [0.3, -1.2, 4.0, 0.01];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn mismatched_or_empty_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    proptest! {
        #[test]
        fn cosine_stays_in_unit_range(
            pair in (1usize..32).prop_flat_map(|n| (
                prop::collection::vec(-100.0f32..100.0, n),
                prop::collection::vec(-100.0f32..100.0, n),
            ))
        ) {
            let (a, b) = pair;
            let score = cosine_similarity(&a, &b);
            prop_assert!((-1.0..=1.0).contains(&score));
        }
    }
}
