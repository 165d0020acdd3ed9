//! Property tests for the weighting engine.

use aweval::{
    constant_allocation_weights, stick_breaking, two_point_weights, twopoint_stable_var_ratio,
    uniform_weights, WeightScheme,
};
use ndarray::Array2;
use proptest::prelude::*;

/// A random `[T, K]` row-stochastic matrix with strictly positive entries.
fn row_stochastic(max_t: usize, max_k: usize) -> impl Strategy<Value = Array2<f64>> {
    (1..=max_t, 2..=max_k).prop_flat_map(|(t, k)| {
        proptest::collection::vec(1e-6f64..1.0, t * k).prop_map(move |raw| {
            let mut m = Array2::from_shape_vec((t, k), raw).expect("shape");
            for mut row in m.rows_mut() {
                let sum: f64 = row.sum();
                row.mapv_inplace(|v| v / sum);
            }
            m
        })
    })
}

proptest! {
    /// The two-point ratio lies in [0,1] for every valid propensity matrix
    /// and floor decay (the in-code assertion must never fire).
    #[test]
    fn twopoint_ratio_is_a_mixing_coefficient(
        probs in row_stochastic(40, 5),
        alpha in 0.0f64..0.999,
    ) {
        let lamb = twopoint_stable_var_ratio(&probs, alpha);
        for &l in lamb.iter() {
            prop_assert!((0.0..=1.0).contains(&l), "lambda = {l}");
        }
    }

    /// Stick-breaking keeps weights in [0,1] and each column consumes at
    /// most the unit stick.
    #[test]
    fn stick_breaking_partitions_a_unit_stick(
        probs in row_stochastic(40, 5),
        alpha in 0.0f64..0.999,
    ) {
        let lamb = twopoint_stable_var_ratio(&probs, alpha);
        let w = stick_breaking(&lamb);
        for &v in w.iter() {
            prop_assert!((0.0..=1.0).contains(&v), "weight = {v}");
        }
        for col in w.columns() {
            let mass: f64 = col.sum();
            prop_assert!(mass <= 1.0 + 1e-9, "column mass = {mass}");
        }
    }

    /// Two-point weights are finite and non-negative whenever propensities
    /// are valid.
    #[test]
    fn two_point_weights_are_well_formed(
        probs in row_stochastic(40, 4),
        alpha in 0.0f64..0.999,
    ) {
        let w = two_point_weights(&probs, alpha);
        prop_assert_eq!(w.dim(), probs.dim());
        for &v in w.iter() {
            prop_assert!(v.is_finite() && v >= 0.0, "weight = {v}");
        }
    }

    /// Every scheme is a deterministic function of the propensity matrix:
    /// recomputation gives identical matrices.
    #[test]
    fn schemes_are_deterministic(
        probs in row_stochastic(30, 4),
        alpha in 0.0f64..0.999,
    ) {
        for scheme in WeightScheme::ALL {
            let a = scheme.compute(&probs, 0.25, alpha);
            let b = scheme.compute(&probs, 0.25, alpha);
            prop_assert_eq!(a, b);
        }
    }

    /// Uniform weights are all ones; constant-allocation weights are the
    /// elementwise square root of the propensities.
    #[test]
    fn simple_schemes_match_their_closed_forms(probs in row_stochastic(30, 4)) {
        let u = uniform_weights(&probs);
        prop_assert!(u.iter().all(|&v| v == 1.0));
        let c = constant_allocation_weights(&probs);
        for (got, want) in c.iter().zip(probs.iter()) {
            prop_assert!((got - want.sqrt()).abs() < 1e-15);
        }
    }
}
