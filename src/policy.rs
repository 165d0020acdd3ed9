//! Allocation-probability policies.
//!
//! A policy maps its posterior state to a full probability vector over arms
//! each round — not just a chosen arm — because downstream AIPW scoring and
//! weighting need the realized assignment probability for *every* arm.
//!
//! Policies are seedable so a replicate is reproducible given `(config, seed)`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

/// Posterior draws used to estimate per-arm argmax probabilities.
const ARGMAX_DRAWS: usize = 1000;

/// Common interface for sequential allocation policies.
///
/// [`ThompsonPolicy`] is the built-in implementation; any other
/// probability-generating rule can be plugged in through this trait.
pub trait AllocationPolicy {
    /// Probability vector over arms for round `t` (1-indexed), already
    /// floored and renormalized to a valid simplex.
    fn probabilities(&mut self, t: usize) -> Vec<f64>;

    /// Record the observed reward for the arm that was played.
    fn update(&mut self, arm: usize, reward: f64);
}

/// Thompson-sampling-like allocation with a decaying probability floor.
///
/// Per-arm running summaries (count, mean, squared deviations) define a
/// Gaussian posterior `N(mean, var/n)`; the assignment probability of an arm
/// is the Monte-Carlo frequency with which its posterior draw is the argmax.
/// The floor `floor_start * t^{-floor_decay}` is then applied via
/// [`apply_floor`].
#[derive(Debug, Clone)]
pub struct ThompsonPolicy {
    floor_start: f64,
    floor_decay: f64,
    counts: Vec<u64>,
    means: Vec<f64>,
    // Welford running sum of squared deviations, per arm.
    m2: Vec<f64>,
    rng: StdRng,
}

impl ThompsonPolicy {
    pub fn new(k: usize, floor_start: f64, floor_decay: f64, seed: u64) -> Self {
        Self {
            floor_start,
            floor_decay,
            counts: vec![0; k],
            means: vec![0.0; k],
            m2: vec![0.0; k],
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Posterior standard deviation of the mean for one arm.
    ///
    /// Unit variance is assumed until an arm has two observations; the Monte
    /// Carlo step only needs a rough posterior to rank arms, and the floor
    /// guarantees exploration regardless.
    fn posterior_sd(&self, arm: usize) -> f64 {
        let n = self.counts[arm].max(1) as f64;
        let var = if self.counts[arm] >= 2 {
            self.m2[arm] / (self.counts[arm] - 1) as f64
        } else {
            1.0
        };
        (var.max(1e-12) / n).sqrt()
    }
}

impl AllocationPolicy for ThompsonPolicy {
    fn probabilities(&mut self, t: usize) -> Vec<f64> {
        let k = self.counts.len();
        let mut wins = vec![0u32; k];
        for _ in 0..ARGMAX_DRAWS {
            let mut best = 0;
            let mut best_draw = f64::NEG_INFINITY;
            for arm in 0..k {
                let sd = self.posterior_sd(arm);
                let draw = match Normal::new(self.means[arm], sd) {
                    Ok(dist) => dist.sample(&mut self.rng),
                    Err(_) => self.means[arm],
                };
                if draw > best_draw {
                    best_draw = draw;
                    best = arm;
                }
            }
            wins[best] += 1;
        }

        let mut p: Vec<f64> = wins
            .iter()
            .map(|&w| w as f64 / ARGMAX_DRAWS as f64)
            .collect();
        let floor = self.floor_start * (t.max(1) as f64).powf(-self.floor_decay);
        apply_floor(&mut p, floor.min(1.0 / k as f64));
        p
    }

    fn update(&mut self, arm: usize, reward: f64) {
        self.counts[arm] += 1;
        let n = self.counts[arm] as f64;
        let delta = reward - self.means[arm];
        self.means[arm] += delta / n;
        self.m2[arm] += delta * (reward - self.means[arm]);
    }
}

/// Clip a probability vector from below at `amin` and remove the introduced
/// excess proportionally to each arm's slack above the floor.
///
/// Keeps the vector a valid simplex with `min(p) >= amin`.  `amin` must not
/// exceed `1/K` or the constraint is infeasible; callers clamp it.
pub fn apply_floor(p: &mut [f64], amin: f64) {
    let k = p.len();
    if k == 0 {
        return;
    }
    for v in p.iter_mut() {
        *v = v.max(amin);
    }
    let total: f64 = p.iter().sum();
    let excess = total - 1.0;
    let slack: f64 = p.iter().map(|v| v - amin).sum();
    if slack <= 0.0 || excess <= 0.0 {
        // Everything is at the floor (amin == 1/K) or nothing to remove.
        if excess > 0.0 {
            let uniform = 1.0 / k as f64;
            for v in p.iter_mut() {
                *v = uniform;
            }
        }
        return;
    }
    let c = excess / slack;
    for v in p.iter_mut() {
        *v -= c * (*v - amin);
    }
}

/// Draw an index from a probability vector via its cumulative sum.
///
/// Total function: a vector whose entries do not quite sum to one (floating
/// residue) falls back to the last index.
pub fn sample_categorical(p: &[f64], rng: &mut StdRng) -> usize {
    let u: f64 = rng.gen();
    let mut cum = 0.0;
    for (i, &v) in p.iter().enumerate() {
        cum += v;
        if u < cum {
            return i;
        }
    }
    p.len().saturating_sub(1)
}
