use crate::{Embedding, RecommendError, WeightedVector};

/// Rescales `weights` so they sum to 1.0. Weights must be positive and finite.
pub fn normalize_weights(weights: &[f64]) -> Result<Vec<f64>, RecommendError> {
    if weights.iter().any(|w| !w.is_finite() || *w <= 0.0) {
        return Err(RecommendError::invalid_input("signal weights must be positive and finite"));
    }

    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Err(RecommendError::invalid_input("no signal weights to normalize"));
    }

    Ok(weights.iter().map(|w| w / total).collect())
}

/// Component-wise arithmetic mean of equal-length vectors.
pub fn mean(vectors: &[Embedding]) -> Result<Embedding, RecommendError> {
    let dims = ensure_same_dimension(vectors.iter().map(|v| v.as_slice()))?;

    let mut sum = vec![0.0f64; dims];
    for vector in vectors {
        for (acc, x) in sum.iter_mut().zip(vector) {
            *acc += *x as f64;
        }
    }

    let count = vectors.len() as f64;
    Ok(sum.into_iter().map(|acc| (acc / count) as f32).collect())
}

/// Combines signal vectors into one query vector, weights renormalized to sum to 1.0.
pub fn weighted_average(signals: &[WeightedVector]) -> Result<Embedding, RecommendError> {
    let dims = ensure_same_dimension(signals.iter().map(|s| s.vector.as_slice()))?;
    let weights = normalize_weights(&signals.iter().map(|s| s.weight).collect::<Vec<_>>())?;

    let mut combined = vec![0.0f64; dims];
    for (signal, weight) in signals.iter().zip(weights) {
        for (acc, x) in combined.iter_mut().zip(&signal.vector) {
            *acc += weight * (*x as f64);
        }
    }

    Ok(combined.into_iter().map(|x| x as f32).collect())
}

pub fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (*x as f64) * (*y as f64)).sum()
}

fn ensure_same_dimension<'a>(mut vectors: impl Iterator<Item = &'a [f32]>) -> Result<usize, RecommendError> {
    let first = vectors
        .next()
        .ok_or_else(|| RecommendError::invalid_input("no vectors to combine"))?;

    let dims = first.len();
    if dims == 0 {
        return Err(RecommendError::invalid_input("vectors must not be empty"));
    }
    for vector in vectors {
        if vector.len() != dims {
            return Err(RecommendError::invalid_input(format!(
                "vector dimension mismatch: expected {}, got {}",
                dims,
                vector.len()
            )));
        }
    }

    Ok(dims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_weights_sums_to_one() {
        let combos: [&[f64]; 7] = [
            &[2.0],
            &[1.5],
            &[2.5],
            &[2.0, 1.5],
            &[2.0, 2.5],
            &[1.5, 2.5],
            &[2.0, 1.5, 2.5],
        ];

        for combo in combos {
            let normalized = normalize_weights(combo).unwrap();
            let total: f64 = normalized.iter().sum();
            assert!((total - 1.0).abs() < 1e-9, "{:?} sums to {}", combo, total);
        }

        let all = normalize_weights(&[2.0, 1.5, 2.5]).unwrap();
        assert!((all[0] - 2.0 / 6.0).abs() < 1e-12);
        assert!((all[1] - 1.5 / 6.0).abs() < 1e-12);
        assert!((all[2] - 2.5 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_weights_rejects_non_positive() {
        assert!(normalize_weights(&[]).is_err());
        assert!(normalize_weights(&[1.0, 0.0]).is_err());
        assert!(normalize_weights(&[1.0, -2.0]).is_err());
        assert!(normalize_weights(&[f64::NAN]).is_err());
    }

    #[test]
    fn test_mean() {
        let m = mean(&[vec![1.0, 0.0, 2.0], vec![3.0, 4.0, 0.0]]).unwrap();
        assert_eq!(m, vec![2.0, 2.0, 1.0]);

        let single = mean(&[vec![0.25, -0.5]]).unwrap();
        assert_eq!(single, vec![0.25, -0.5]);
    }

    #[test]
    fn test_mean_dimension_mismatch() {
        let err = mean(&[vec![1.0, 2.0], vec![1.0]]).unwrap_err();
        assert!(matches!(err, RecommendError::InvalidInput(_)));
        assert!(matches!(mean(&[]), Err(RecommendError::InvalidInput(_))));
    }

    #[test]
    fn test_weighted_average_single_signal_is_identity() {
        let v = vec![0.1, 0.2, 0.3];
        let combined = weighted_average(&[WeightedVector::new(v.clone(), 2.5)]).unwrap();
        assert_eq!(combined, v);
    }

    #[test]
    fn test_weighted_average() {
        let combined = weighted_average(&[
            WeightedVector::new(vec![1.0, 0.0], 3.0),
            WeightedVector::new(vec![0.0, 1.0], 1.0),
        ])
        .unwrap();
        assert!((combined[0] - 0.75).abs() < 1e-6);
        assert!((combined[1] - 0.25).abs() < 1e-6);

        let mismatch = weighted_average(&[
            WeightedVector::new(vec![1.0, 0.0], 1.0),
            WeightedVector::new(vec![1.0], 1.0),
        ]);
        assert!(matches!(mismatch, Err(RecommendError::InvalidInput(_))));
    }

    #[test]
    fn test_dot() {
        assert_eq!(dot(&[1.0, 2.0], &[3.0, 4.0]), 11.0);
        assert_eq!(dot(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }
}
