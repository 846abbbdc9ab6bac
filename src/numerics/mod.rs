use crate::{Float,float};

pub mod lie;
pub mod pose;

/**
 * Numerically stable ln(sum(exp(x_i))).
 * Returns -inf for an empty slice or when every entry is -inf, NaN if any entry is NaN.
 */
pub fn log_sum_exp(values: &[Float]) -> Float {
    if values.iter().any(|v| v.is_nan()) {
        return float::NAN;
    }
    let max = values.iter().fold(float::NEG_INFINITY, |acc, &v| acc.max(v));

    match max {
        m if m == float::NEG_INFINITY => float::NEG_INFINITY,
        m if m == float::INFINITY => float::INFINITY,
        m => m + values.iter().map(|v| (v - m).exp()).sum::<Float>().ln()
    }
}

/**
 * Converts log weights into normalized weights in `target`.
 * Returns the normalizer; the caller must check it for finiteness before trusting `target`.
 */
pub fn normalize_log_weights(log_weights: &[Float], target: &mut Vec<Float>) -> Float {
    let normalizer = log_sum_exp(log_weights);
    target.clear();
    if normalizer.is_finite() {
        target.extend(log_weights.iter().map(|w| (w - normalizer).exp()));
    }
    normalizer
}

/**
 * Kish effective sample size of normalized weights.
 */
pub fn effective_sample_size(weights: &[Float]) -> Float {
    let sum_sqr = weights.iter().map(|w| w*w).sum::<Float>();
    match sum_sqr {
        s if s > 0.0 => 1.0/s,
        _ => 0.0
    }
}

/**
 * KLD-sampling bound (Fox 2003): number of samples required so that the KL-divergence
 * between the sample based maximum likelihood estimate and the true distribution
 * stays below `epsilon` with probability given by the standard normal `upper_quantile`.
 * `k` is the number of occupied bins.
 */
pub fn kld_sample_bound(k: usize, epsilon: Float, upper_quantile: Float) -> usize {
    if k < 2 {
        return 0;
    }
    let k_1 = (k - 1) as Float;
    let a = 2.0/(9.0*k_1);
    let b = 1.0 - a + a.sqrt()*upper_quantile;
    (k_1/(2.0*epsilon)*b.powi(3)).ceil() as usize
}

pub fn gauss_1d(x: Float, mean: Float, sigma: Float) -> Float {
    let offset = (x - mean)/sigma;
    (-0.5*offset*offset).exp()/(sigma*(2.0*float::consts::PI).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_sum_exp_matches_naive_sum() {
        let values = [-1.0, 0.5, 2.0];
        let naive = values.iter().map(|v: &Float| v.exp()).sum::<Float>().ln();
        assert!((log_sum_exp(&values) - naive).abs() < 1e-12);
    }

    #[test]
    fn log_sum_exp_survives_large_offsets() {
        let values = [-1e4, -1e4 + 1.0];
        let expected = -1e4 + (1.0 + (1.0 as Float).exp()).ln();
        assert!((log_sum_exp(&values) - expected).abs() < 1e-9);
    }

    #[test]
    fn log_sum_exp_all_neg_infinity() {
        assert_eq!(log_sum_exp(&[float::NEG_INFINITY, float::NEG_INFINITY]), float::NEG_INFINITY);
        assert!(log_sum_exp(&[0.0, float::NAN]).is_nan());
    }

    #[test]
    fn kld_bound_grows_with_bins() {
        assert_eq!(kld_sample_bound(1, 0.05, 2.326), 0);
        let small = kld_sample_bound(5, 0.05, 2.326);
        let large = kld_sample_bound(50, 0.05, 2.326);
        assert!(small > 0);
        assert!(large > small);
        assert!(kld_sample_bound(50, 0.01, 2.326) > large);
    }

    #[test]
    fn ess_of_uniform_weights_is_count() {
        let weights = vec![0.25; 4];
        assert!((effective_sample_size(&weights) - 4.0).abs() < 1e-12);
    }
}
