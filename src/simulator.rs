//! Bandit experiment simulator.
//!
//! Drives `T` rounds of `Draw(arm) → Observe(reward) → Update(posterior)`,
//! recording the chosen arm, the revealed reward, and the full assignment
//! probability vector at every round.  The recorded history is immutable
//! once the run ends; everything downstream (weighting, AIPW estimation) is
//! a pure function of it.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Uniform};

use crate::config::{ConfigError, ExperimentConfig, ExplorationPolicy, NoiseModel};
use crate::policy::{sample_categorical, AllocationPolicy, ThompsonPolicy};

/// Recorded history of one experiment run.
#[derive(Debug, Clone)]
pub struct History {
    /// Chosen arm per round, length `T`.
    pub arms: Vec<usize>,
    /// Observed reward per round, length `T`.
    pub rewards: Array1<f64>,
    /// Realized assignment probability of every arm at every round, `[T, K]`.
    pub probs: Array2<f64>,
}

/// Draw the full `[T, K]` potential-outcome matrix `truth + noise`.
///
/// Uniform noise is `U(-scale, scale)`; exponential noise is centered,
/// `Exp(1/scale) - scale`, so both models have mean zero.
pub fn draw_potential_outcomes(
    truth: &[f64],
    cfg: &ExperimentConfig,
    rng: &mut StdRng,
) -> Array2<f64> {
    let (t_len, k) = (cfg.t, cfg.k.min(truth.len()));
    let mut ys = Array2::zeros((t_len, truth.len()));
    match cfg.noise {
        NoiseModel::Uniform => {
            let dist = Uniform::new_inclusive(-cfg.noise_scale, cfg.noise_scale);
            for t in 0..t_len {
                for a in 0..k {
                    ys[[t, a]] = truth[a] + dist.sample(rng);
                }
            }
        }
        NoiseModel::Exponential => {
            // rand_distr parameterizes Exp by rate; mean = 1/rate = scale.
            let dist = match Exp::new(1.0 / cfg.noise_scale) {
                Ok(d) => d,
                // Nonpositive scale is caught by validate(); leave zeros.
                Err(_) => return ys,
            };
            for t in 0..t_len {
                for a in 0..k {
                    ys[[t, a]] = truth[a] + dist.sample(rng) - cfg.noise_scale;
                }
            }
        }
    }
    ys
}

/// Run a `T`-round adaptive experiment over the potential outcomes `ys`.
///
/// The first `initial * K` rounds are deterministic round-robin pure
/// exploration (recorded with a one-hot probability vector), which guarantees
/// every arm has a nonzero pull count before the adaptive policy takes over.
/// Fails fast with a [`ConfigError`] before simulating anything if the
/// configuration or the `ys` shape is invalid.
pub fn run_experiment(
    ys: &Array2<f64>,
    cfg: &ExperimentConfig,
    seed: u64,
) -> Result<History, ConfigError> {
    cfg.validate()?;
    if ys.dim() != (cfg.t, cfg.k) {
        return Err(ConfigError::ShapeMismatch {
            expected: (cfg.t, cfg.k),
            got: ys.dim(),
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut policy: Box<dyn AllocationPolicy> = match cfg.exploration {
        ExplorationPolicy::ThompsonSampling => Box::new(ThompsonPolicy::new(
            cfg.k,
            cfg.floor_start,
            cfg.floor_decay,
            rng.gen(),
        )),
    };

    let mut arms = Vec::with_capacity(cfg.t);
    let mut rewards = Array1::zeros(cfg.t);
    let mut probs = Array2::zeros((cfg.t, cfg.k));

    for t in 0..cfg.t {
        let (arm, p) = if t < cfg.initial * cfg.k {
            let arm = t % cfg.k;
            let mut p = vec![0.0; cfg.k];
            p[arm] = 1.0;
            (arm, p)
        } else {
            let p = policy.probabilities(t + 1);
            let arm = sample_categorical(&p, &mut rng);
            (arm, p)
        };

        let reward = ys[[t, arm]];
        policy.update(arm, reward);

        arms.push(arm);
        rewards[t] = reward;
        for (a, &v) in p.iter().enumerate() {
            probs[[t, a]] = v;
        }
    }

    Ok(History {
        arms,
        rewards,
        probs,
    })
}
