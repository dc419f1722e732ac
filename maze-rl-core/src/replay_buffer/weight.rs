//! Importance sampling weights.

/// Computes importance sampling weights for sampled transitions.
///
/// The weight of a transition drawn with probability $P(i)$ from a buffer of
/// `size` transitions is $w_i=\left(N^{-1}P(i)^{-1}\right)^{\beta}$, and the
/// weights are normalized by $\max_i w_i$ within the batch. The largest weight
/// is therefore exactly 1.
pub(super) fn importance_weights(probs: &[f64], size: usize, beta: f32) -> Vec<f32> {
    let n = size as f64;
    let beta = beta as f64;
    let ws = probs
        .iter()
        .map(|&p| (n * p).powf(-beta))
        .collect::<Vec<_>>();
    let w_max = ws.iter().cloned().fold(f64::MIN, f64::max);

    ws.iter().map(|w| (w / w_max) as f32).collect()
}

#[cfg(test)]
mod test {
    use super::importance_weights;

    #[test]
    fn test_max_weight_is_one() {
        let probs = vec![0.1, 0.5, 0.1, 0.3];
        let ws = importance_weights(&probs, 4, 0.7);
        let w_max = ws.iter().cloned().fold(f32::MIN, f32::max);
        assert_eq!(w_max, 1.0);
        assert!(ws.iter().all(|&w| w > 0.0 && w <= 1.0));

        // Rarely drawn transitions get the largest correction.
        assert_eq!(ws[0], 1.0);
        assert!(ws[1] < ws[3]);
    }

    #[test]
    fn test_full_correction() {
        let probs = vec![0.2, 0.4];
        let ws = importance_weights(&probs, 2, 1.0);
        // (2 * 0.2)^-1 = 2.5, (2 * 0.4)^-1 = 1.25
        assert!((ws[0] - 1.0).abs() < 1e-6);
        assert!((ws[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_zero_beta_gives_unit_weights() {
        let probs = vec![0.01, 0.9, 0.09];
        let ws = importance_weights(&probs, 3, 0.0);
        assert_eq!(ws, vec![1.0, 1.0, 1.0]);
    }
}
