//! Evaluation weights for adaptively-collected data.
//!
//! Every scheme here is a total function of the assignment-probability
//! matrix `[T, K]` (plus scheme parameters).  Weights never look at rewards:
//! that separation is what keeps them valid instruments under the adaptive
//! central limit theorem of Hadad et al. (arXiv:1911.02768) — conditional on
//! the filtration, a weight is known before the round's reward is revealed.
//!
//! Schemes:
//! - `uniform`: all ones (ordinary AIPW).
//! - `propscore`: the propensities themselves (inverse-variance style).
//! - `lvdl`: `sqrt(e)` — constant allocation rate.
//! - `two_point`: stick-breaking over the two-point stable-variance ratio.
//! - `two_point_old`: the superseded ratio derivation, kept as a named
//!   regression baseline (not dead code).

use ndarray::Array2;

/// Mixing coefficient λ of the two-point stable-variance allocation rate.
///
/// Closed-form approximation to the ratio minimizing the asymptotic variance
/// of a weighted AIPW estimator under a two-point (Bernoulli-mixture) model
/// of the allocation rate:
///
/// ```text
/// λ[t] = (1 - e) / (1 + T·(t/T)^α - t)  +  e² / (1 + T - t)
/// ```
///
/// with `t` 1-indexed, `e` the propensity and `α` the floor decay.  The
/// first denominator governs the propensity-near-the-floor regime, the
/// second the near-saturation regime.
///
/// # Panics
///
/// Asserts `0 ≤ λ ≤ 1` elementwise.  A violation is a derivation bug, never
/// something to clamp silently.
pub fn twopoint_stable_var_ratio(e: &Array2<f64>, alpha: f64) -> Array2<f64> {
    let (t_len, k) = e.dim();
    let big_t = t_len as f64;
    let mut lamb = Array2::zeros((t_len, k));
    for t in 0..t_len {
        let tf = (t + 1) as f64;
        let bad_denom = 1.0 + big_t * (tf / big_t).powf(alpha) - tf; // e small
        let good_denom = 1.0 + big_t - tf; // e large
        for a in 0..k {
            let ei = e[[t, a]];
            let l = (1.0 - ei) / bad_denom + ei * ei / good_denom;
            assert!(
                (0.0..=1.0).contains(&l),
                "two-point ratio out of [0,1]: {l} (round {}, arm {a}, e={ei}, alpha={alpha})",
                t + 1
            );
            lamb[[t, a]] = l;
        }
    }
    lamb
}

/// Superseded two-point ratio derivation, preserved verbatim for regression
/// comparison against `two_point`.
///
/// Approximates `E[e_t / (e_t + … + e_T)]` from the floor schedule:
///
/// ```text
/// l_t = floor_start·((t+1)^{1-α} - t^{1-α}) / (1-α)
/// L_t = floor_start·((T+1)^{1-α} - t^{1-α}) / (1-α)
/// ratio = e·ratio_best + (1-e)·ratio_not_best
/// ```
///
/// with `ratio_best = (1-(K-1)·l_t)/((T+1)-t-(K-1)·L_t)` and
/// `ratio_not_best = l_t/L_t`.
pub fn twopoint_stable_var_ratio_old(
    probs: &Array2<f64>,
    floor_start: f64,
    floor_decay: f64,
) -> Array2<f64> {
    let (t_len, k) = probs.dim();
    let big_t = t_len as f64;
    let kf = k as f64;
    let mut ratio = Array2::zeros((t_len, k));
    for t in 0..t_len {
        let tf = (t + 1) as f64;
        let pow = 1.0 - floor_decay;
        let l_t = floor_start * ((tf + 1.0).powf(pow) - tf.powf(pow)) / pow;
        let big_l_t = floor_start * ((big_t + 1.0).powf(pow) - tf.powf(pow)) / pow;
        let ratio_best = (1.0 - (kf - 1.0) * l_t) / ((big_t + 1.0) - tf - (kf - 1.0) * big_l_t);
        let ratio_not_best = l_t / big_l_t;
        for a in 0..k {
            let e = probs[[t, a]];
            ratio[[t, a]] = e * ratio_best + (1.0 - e) * ratio_not_best;
        }
    }
    ratio
}

/// Stick-breaking transform, applied down each column.
///
/// Maintains a per-arm remaining stick `S[0] = 1`; at each round
/// `w[t] = S[t-1]·λ[t]` and `S[t] = S[t-1]·(1-λ[t])`.  For λ in `[0,1]` the
/// weights are in `[0,1]` and each column consumes at most the unit stick,
/// so no single early round can dominate the estimator.
pub fn stick_breaking(lambda: &Array2<f64>) -> Array2<f64> {
    let (t_len, k) = lambda.dim();
    let mut weights = Array2::zeros((t_len, k));
    let mut remaining = vec![1.0_f64; k];
    for t in 0..t_len {
        for a in 0..k {
            let w = remaining[a] * lambda[[t, a]];
            weights[[t, a]] = w;
            remaining[a] -= w;
        }
    }
    weights
}

/// All-ones weights: the ordinary (unweighted) AIPW estimator.
pub fn uniform_weights(probs: &Array2<f64>) -> Array2<f64> {
    Array2::ones(probs.dim())
}

/// Propensity-score weights: the probabilities themselves.
pub fn propensity_weights(probs: &Array2<f64>) -> Array2<f64> {
    probs.clone()
}

/// Constant-allocation-rate ("lvdl") weights: `sqrt(e)`.
pub fn constant_allocation_weights(probs: &Array2<f64>) -> Array2<f64> {
    probs.mapv(f64::sqrt)
}

/// Two-point stable-variance weights.
///
/// `sqrt(max(0, stick_breaking(λ)·e))`: the max-with-zero guards against
/// negative numerical residue from the recursion, and the square root puts
/// the weight on the scale of a score standard deviation (score variance
/// scales as `1/e`).
pub fn two_point_weights(probs: &Array2<f64>, floor_decay: f64) -> Array2<f64> {
    let ratio = twopoint_stable_var_ratio(probs, floor_decay);
    let h2es = stick_breaking(&ratio);
    (h2es * probs).mapv(|v| v.max(0.0).sqrt())
}

/// Two-point weights built from the superseded ratio formula.
pub fn two_point_weights_old(
    probs: &Array2<f64>,
    floor_start: f64,
    floor_decay: f64,
) -> Array2<f64> {
    let ratio = twopoint_stable_var_ratio_old(probs, floor_start, floor_decay);
    let h2es = stick_breaking(&ratio);
    (h2es * probs).mapv(|v| v.max(0.0).sqrt())
}

/// The weighting schemes evaluated against each other in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightScheme {
    Uniform,
    Propensity,
    ConstantAllocation,
    TwoPoint,
    TwoPointOld,
}

impl WeightScheme {
    /// Every scheme, in the order methods appear in result tables.
    pub const ALL: [WeightScheme; 5] = [
        WeightScheme::Uniform,
        WeightScheme::Propensity,
        WeightScheme::ConstantAllocation,
        WeightScheme::TwoPoint,
        WeightScheme::TwoPointOld,
    ];

    /// Stable method label used in result tables.
    pub fn name(&self) -> &'static str {
        match self {
            WeightScheme::Uniform => "uniform",
            WeightScheme::Propensity => "propscore",
            WeightScheme::ConstantAllocation => "lvdl",
            WeightScheme::TwoPoint => "two_point",
            WeightScheme::TwoPointOld => "two_point_old",
        }
    }

    /// Compute this scheme's weight matrix from the probability matrix.
    pub fn compute(&self, probs: &Array2<f64>, floor_start: f64, floor_decay: f64) -> Array2<f64> {
        match self {
            WeightScheme::Uniform => uniform_weights(probs),
            WeightScheme::Propensity => propensity_weights(probs),
            WeightScheme::ConstantAllocation => constant_allocation_weights(probs),
            WeightScheme::TwoPoint => two_point_weights(probs, floor_decay),
            WeightScheme::TwoPointOld => two_point_weights_old(probs, floor_start, floor_decay),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    fn fixture_probs() -> Array2<f64> {
        arr2(&[
            [0.2, 0.8],
            [0.5, 0.5],
            [0.7, 0.3],
            [0.9, 0.1],
            [0.6, 0.4],
        ])
    }

    fn assert_close(got: &Array2<f64>, want: &[[f64; 2]], tol: f64) {
        for (t, row) in want.iter().enumerate() {
            for (a, &w) in row.iter().enumerate() {
                let g = got[[t, a]];
                assert!((g - w).abs() < tol, "[{t},{a}]: got {g}, want {w}");
            }
        }
    }

    // Fixture values computed independently from the closed-form formulas.
    #[test]
    fn twopoint_ratio_matches_fixture() {
        let lamb = twopoint_stable_var_ratio(&fixture_probs(), 0.7);
        assert_close(
            &lamb,
            &[
                [0.50162709017600771, 0.25140677254400190],
                [0.36872911507959177, 0.36872911507959177],
                [0.36375542866997945, 0.49765155578550757],
                [0.48331231326645069, 0.70981081939805624],
                [0.76000000000000001, 0.76000000000000001],
            ],
            1e-12,
        );
    }

    #[test]
    fn twopoint_ratio_old_matches_fixture() {
        let lamb = twopoint_stable_var_ratio_old(&fixture_probs(), 0.5, 0.7);
        assert_close(
            &lamb,
            &[
                [0.29203617678865973, 0.19390671313528474],
                [0.28048150611261891, 0.28048150611261891],
                [0.34170661469100944, 0.36928314739773516],
                [0.49732869248889905, 0.53104787956015720],
                [1.0, 1.0],
            ],
            1e-12,
        );
    }

    #[test]
    fn two_point_weights_match_fixture() {
        let w = two_point_weights(&fixture_probs(), 0.7);
        assert_close(
            &w,
            &[
                [0.31674187919377123, 0.44847008599816501],
                [0.30312093462761847, 0.37150243492770391],
                [0.28303416032010797, 0.26561594178865749],
                [0.29507493686390829, 0.12980895832092096],
                [0.21716689181486679, 0.14471406977955947],
            ],
            1e-12,
        );
    }

    #[test]
    fn stick_breaking_of_zeros_leaves_the_stick_untouched() {
        let w = stick_breaking(&Array2::zeros((6, 3)));
        assert!(w.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn stick_breaking_of_ones_is_one_hot_on_the_first_round() {
        let w = stick_breaking(&Array2::ones((6, 1)));
        assert_eq!(w[[0, 0]], 1.0);
        let total: f64 = w.column(0).sum();
        assert!((total - 1.0).abs() < 1e-15);
        for t in 1..6 {
            assert_eq!(w[[t, 0]], 0.0);
        }
    }

    #[test]
    fn stick_breaking_columns_consume_at_most_the_unit_stick() {
        let lamb = twopoint_stable_var_ratio(&fixture_probs(), 0.3);
        let w = stick_breaking(&lamb);
        for a in 0..2 {
            let total: f64 = w.column(a).sum();
            assert!(total <= 1.0 + 1e-12, "column {a} mass {total}");
        }
        assert!(w.iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn ratio_at_the_last_round_reduces_to_the_pointwise_form() {
        // At t = T both denominators are 1, so λ = 1 - e + e².
        let probs = fixture_probs();
        let lamb = twopoint_stable_var_ratio(&probs, 0.25);
        for a in 0..2 {
            let e = probs[[4, a]];
            let want = 1.0 - e + e * e;
            assert!((lamb[[4, a]] - want).abs() < 1e-15);
        }
    }

    #[test]
    fn scheme_names_are_stable() {
        let names: Vec<_> = WeightScheme::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            ["uniform", "propscore", "lvdl", "two_point", "two_point_old"]
        );
    }

    #[test]
    fn schemes_have_probability_shape_and_nonnegative_entries() {
        let probs = fixture_probs();
        for scheme in WeightScheme::ALL {
            let w = scheme.compute(&probs, 0.5, 0.7);
            assert_eq!(w.dim(), probs.dim(), "{:?}", scheme);
            assert!(
                w.iter().all(|&v| v.is_finite() && v >= 0.0),
                "{:?} produced a negative or non-finite weight",
                scheme
            );
        }
    }
}
