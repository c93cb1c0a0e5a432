use ndarray::Array1;

/// Numerically stable softmax over raw class scores.
pub(crate) fn softmax(logits: &Array1<f32>) -> Array1<f32> {
    if logits.is_empty() {
        return Array1::zeros(0);
    }
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps = logits.mapv(|x| (x - max).exp());
    let sum = exps.sum();
    exps / sum
}

/// Index of the largest value; the first one wins ties.
pub(crate) fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&array![1.0, 2.0, 3.0, 4.0]);
        assert!((probs.sum() - 1.0).abs() < 1e-6);
        assert!(probs[3] > probs[2] && probs[2] > probs[1]);
    }

    #[test]
    fn test_softmax_large_logits() {
        let probs = softmax(&array![1000.0, 1001.0, 999.0]);
        assert!(probs.iter().all(|p| p.is_finite()));
        assert!((probs.sum() - 1.0).abs() < 1e-6);
        assert_eq!(argmax(probs.as_slice().unwrap()), Some(1));
    }

    #[test]
    fn test_argmax_first_wins_ties() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), Some(1));
        assert_eq!(argmax(&[]), None);
    }
}
