//! AIPW scoring and weighted estimation.
//!
//! `aw_scores` turns the recorded history into doubly-robust per-round,
//! per-arm pseudo-outcomes; `aw_stats` / `aw_contrasts` aggregate weighted
//! scores into the statistics tuple every estimator in this crate reports.

use ndarray::{Array1, Array2};

/// Two-sided 90% normal quantile used for the coverage indicator.
pub const Z_90: f64 = 1.645;

/// Statistic labels, in the fixed order [`ArmStats::named_values`] emits.
pub const STATISTICS: [&str; 9] = [
    "estimate", "stderr", "bias", "coverage", "t-stat", "mse", "CI_width", "truth", "abserr",
];

/// The statistics tuple reported for one arm (or one contrast) by one method.
///
/// Every estimator in the crate — AIPW under any weighting scheme, the
/// posterior baselines, W-decorrelation — exposes this same contract so its
/// rows stack into one table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmStats {
    /// Point estimate.
    pub estimate: f64,
    /// Standard error of the estimate.
    pub stderr: f64,
    /// `estimate - truth`.
    pub bias: f64,
    /// 1.0 if the two-sided interval `estimate ± z·stderr` contains truth.
    pub coverage: f64,
    /// `bias / stderr`.
    pub t_stat: f64,
    /// `bias² + stderr²`.
    pub mse: f64,
    /// `2·z·stderr`.
    pub ci_width: f64,
    /// Ground-truth value (simulation only).
    pub truth: f64,
}

impl ArmStats {
    /// Derive the full tuple from an estimate, its standard error, and the
    /// truth, using the 90% normal quantile.
    pub fn from_estimate(estimate: f64, stderr: f64, truth: f64) -> Self {
        Self::with_z(estimate, stderr, truth, Z_90)
    }

    /// Same, at an arbitrary two-sided quantile `z`.
    ///
    /// A NaN estimate (the `Σw = 0` sentinel) propagates: coverage reads as
    /// 0 and every derived field is NaN.
    pub fn with_z(estimate: f64, stderr: f64, truth: f64, z: f64) -> Self {
        let bias = estimate - truth;
        let coverage = if bias.abs() <= z * stderr { 1.0 } else { 0.0 };
        let t_stat = if stderr > 0.0 {
            bias / stderr
        } else if bias == 0.0 {
            0.0
        } else {
            f64::INFINITY.copysign(bias)
        };
        Self {
            estimate,
            stderr,
            bias,
            coverage,
            t_stat,
            mse: bias * bias + stderr * stderr,
            ci_width: 2.0 * z * stderr,
            truth,
        }
    }

    /// `(label, value)` pairs in the order of [`STATISTICS`].  `abserr` is
    /// derived at emission time, mirroring how result tables are flattened.
    pub fn named_values(&self) -> [(&'static str, f64); 9] {
        [
            ("estimate", self.estimate),
            ("stderr", self.stderr),
            ("bias", self.bias),
            ("coverage", self.coverage),
            ("t-stat", self.t_stat),
            ("mse", self.mse),
            ("CI_width", self.ci_width),
            ("truth", self.truth),
            ("abserr", self.bias.abs()),
        ]
    }
}

/// Running per-arm sample means through each round, `[T, K]`.
///
/// Entry `[t, a]` is the mean reward of arm `a` over rounds `0..=t`, or 0
/// while the arm is unpulled.
pub fn sample_mean(rewards: &Array1<f64>, arms: &[usize], k: usize) -> Array2<f64> {
    let t_len = arms.len();
    let mut out = Array2::zeros((t_len, k));
    let mut sums = vec![0.0_f64; k];
    let mut counts = vec![0u64; k];
    for t in 0..t_len {
        let a = arms[t];
        sums[a] += rewards[t];
        counts[a] += 1;
        for j in 0..k {
            out[[t, j]] = if counts[j] > 0 {
                sums[j] / counts[j] as f64
            } else {
                0.0
            };
        }
    }
    out
}

/// Leave-one-out baseline means `muhat`, `[T, K]`: zero on the first round,
/// then the running sample mean shifted down one round, so `muhat[t]` uses
/// only rounds strictly before `t`.
pub fn leave_one_out_means(rewards: &Array1<f64>, arms: &[usize], k: usize) -> Array2<f64> {
    let t_len = arms.len();
    let running = sample_mean(rewards, arms, k);
    let mut muhat = Array2::zeros((t_len, k));
    for t in 1..t_len {
        for a in 0..k {
            muhat[[t, a]] = running[[t - 1, a]];
        }
    }
    muhat
}

/// Augmented inverse-propensity-weighted scores, `[T, K]`.
///
/// For the realized arm `a_t`:
/// `score = muhat + (reward - muhat)/e`; for every other arm the score
/// collapses to the plug-in baseline `muhat`.
pub fn aw_scores(
    rewards: &Array1<f64>,
    arms: &[usize],
    probs: &Array2<f64>,
    muhat: &Array2<f64>,
) -> Array2<f64> {
    let (t_len, _) = probs.dim();
    let mut scores = muhat.clone();
    for t in 0..t_len {
        let a = arms[t];
        let e = probs[[t, a]];
        scores[[t, a]] = muhat[[t, a]] + (rewards[t] - muhat[[t, a]]) / e;
    }
    scores
}

/// Weighted AIPW statistics per arm.
///
/// Point estimate `Σ w·s / Σ w`; standard error from the delta-method
/// variance of the ratio estimator, `sqrt(Σ w²·(s - est)²) / Σ w`.
///
/// An arm whose weights sum to zero (a degenerate configuration) reports a
/// NaN estimate rather than dividing silently; the rest of the sweep is
/// unaffected.
pub fn aw_stats(scores: &Array2<f64>, weights: &Array2<f64>, truth: &[f64]) -> Vec<ArmStats> {
    let (t_len, k) = scores.dim();
    let mut out = Vec::with_capacity(k);
    for a in 0..k {
        let wsum: f64 = weights.column(a).sum();
        if wsum == 0.0 {
            out.push(ArmStats::from_estimate(f64::NAN, f64::NAN, truth[a]));
            continue;
        }
        let mut num = 0.0;
        for t in 0..t_len {
            num += weights[[t, a]] * scores[[t, a]];
        }
        let estimate = num / wsum;
        let mut var = 0.0;
        for t in 0..t_len {
            let w = weights[[t, a]];
            let d = scores[[t, a]] - estimate;
            var += w * w * d * d;
        }
        let stderr = var.sqrt() / wsum;
        out.push(ArmStats::from_estimate(estimate, stderr, truth[a]));
    }
    out
}

/// Weighted AIPW statistics for the contrasts `arm k − arm 0`, `k = 1..K-1`.
///
/// Identical aggregation applied to the per-round score differences
/// `s[t,k] − s[t,0]`, with the per-round contrast weight taken as the
/// geometric mean `sqrt(w[t,k]·w[t,0])` of the two arms' weights (so equal
/// columns — uniform in particular — reduce to the arm weight itself).
pub fn aw_contrasts(scores: &Array2<f64>, weights: &Array2<f64>, truth: &[f64]) -> Vec<ArmStats> {
    let (t_len, k) = scores.dim();
    let mut out = Vec::with_capacity(k.saturating_sub(1));
    for a in 1..k {
        let truth_diff = truth[a] - truth[0];
        let mut wsum = 0.0;
        for t in 0..t_len {
            wsum += (weights[[t, a]] * weights[[t, 0]]).sqrt();
        }
        if wsum == 0.0 {
            out.push(ArmStats::from_estimate(f64::NAN, f64::NAN, truth_diff));
            continue;
        }
        let mut num = 0.0;
        for t in 0..t_len {
            let w = (weights[[t, a]] * weights[[t, 0]]).sqrt();
            num += w * (scores[[t, a]] - scores[[t, 0]]);
        }
        let estimate = num / wsum;
        let mut var = 0.0;
        for t in 0..t_len {
            let w = (weights[[t, a]] * weights[[t, 0]]).sqrt();
            let d = (scores[[t, a]] - scores[[t, 0]]) - estimate;
            var += w * w * d * d;
        }
        let stderr = var.sqrt() / wsum;
        out.push(ArmStats::from_estimate(estimate, stderr, truth_diff));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2};

    #[test]
    fn sample_mean_tracks_running_averages() {
        let rewards = arr1(&[1.0, 3.0, 2.0, 5.0]);
        let arms = [0, 1, 0, 1];
        let m = sample_mean(&rewards, &arms, 2);
        assert_eq!(m[[0, 0]], 1.0);
        assert_eq!(m[[0, 1]], 0.0); // unpulled
        assert_eq!(m[[1, 1]], 3.0);
        assert_eq!(m[[2, 0]], 1.5);
        assert_eq!(m[[3, 1]], 4.0);
    }

    #[test]
    fn muhat_is_zero_then_shifted() {
        let rewards = arr1(&[1.0, 3.0, 2.0]);
        let arms = [0, 1, 0];
        let mu = leave_one_out_means(&rewards, &arms, 2);
        assert_eq!(mu[[0, 0]], 0.0);
        assert_eq!(mu[[0, 1]], 0.0);
        assert_eq!(mu[[1, 0]], 1.0);
        assert_eq!(mu[[2, 1]], 3.0);
    }

    #[test]
    fn aw_scores_augment_only_the_realized_arm() {
        let rewards = arr1(&[2.0]);
        let arms = [1];
        let probs = arr2(&[[0.5, 0.5]]);
        let muhat = arr2(&[[0.3, 0.7]]);
        let s = aw_scores(&rewards, &arms, &probs, &muhat);
        assert_eq!(s[[0, 0]], 0.3); // plug-in baseline
        assert!((s[[0, 1]] - (0.7 + (2.0 - 0.7) / 0.5)).abs() < 1e-15);
    }

    #[test]
    fn constant_scores_give_zero_bias_and_zero_stderr() {
        let scores = Array2::from_elem((10, 2), 1.0);
        let weights = Array2::ones((10, 2));
        let stats = aw_stats(&scores, &weights, &[1.0, 1.0]);
        for s in &stats {
            assert_eq!(s.bias, 0.0);
            assert_eq!(s.stderr, 0.0);
            assert_eq!(s.coverage, 1.0);
            assert_eq!(s.t_stat, 0.0);
            assert_eq!(s.mse, 0.0);
        }
    }

    #[test]
    fn zero_weight_sum_yields_nan_sentinel_not_panic() {
        let scores = Array2::from_elem((5, 2), 1.0);
        let mut weights = Array2::ones((5, 2));
        weights.column_mut(0).fill(0.0);
        let stats = aw_stats(&scores, &weights, &[1.0, 1.0]);
        assert!(stats[0].estimate.is_nan());
        assert_eq!(stats[0].coverage, 0.0);
        // The healthy arm is unaffected.
        assert_eq!(stats[1].estimate, 1.0);
    }

    #[test]
    fn weighted_estimate_matches_hand_computation() {
        let scores = arr2(&[[2.0], [4.0]]);
        let weights = arr2(&[[1.0], [3.0]]);
        let stats = aw_stats(&scores, &weights, &[3.0]);
        // (1*2 + 3*4) / 4 = 3.5
        assert!((stats[0].estimate - 3.5).abs() < 1e-15);
        // sqrt(1*(2-3.5)² + 9*(4-3.5)²)/4 = sqrt(2.25+2.25)/4
        let want = (4.5_f64).sqrt() / 4.0;
        assert!((stats[0].stderr - want).abs() < 1e-15);
        assert!((stats[0].bias - 0.5).abs() < 1e-15);
    }

    #[test]
    fn contrasts_under_uniform_weights_are_estimate_differences() {
        let scores = arr2(&[
            [1.0, 2.0, 0.5],
            [1.5, 2.5, 0.0],
            [0.5, 3.0, 1.0],
            [1.0, 2.0, 0.5],
        ]);
        let weights = Array2::ones((4, 3));
        let truth = [1.0, 2.0, 0.5];
        let stats = aw_stats(&scores, &weights, &truth);
        let contrasts = aw_contrasts(&scores, &weights, &truth);
        assert_eq!(contrasts.len(), 2);
        for (idx, c) in contrasts.iter().enumerate() {
            let want = stats[idx + 1].estimate - stats[0].estimate;
            assert!(
                (c.estimate - want).abs() < 1e-12,
                "contrast {idx}: {} vs {want}",
                c.estimate
            );
            assert!((c.truth - (truth[idx + 1] - truth[0])).abs() < 1e-15);
        }
    }

    #[test]
    fn named_values_follow_the_statistic_order() {
        let s = ArmStats::from_estimate(1.2, 0.1, 1.0);
        let labels: Vec<_> = s.named_values().iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, STATISTICS);
        let abserr = s.named_values()[8].1;
        assert!((abserr - 0.2).abs() < 1e-12);
    }

    #[test]
    fn coverage_indicator_is_two_sided_at_z() {
        let inside = ArmStats::from_estimate(1.1, 0.1, 1.0);
        assert_eq!(inside.coverage, 1.0); // |bias| = 0.1 < 1.645 * 0.1
        let outside = ArmStats::from_estimate(1.5, 0.1, 1.0);
        assert_eq!(outside.coverage, 0.0);
    }
}
