//! Run configuration: one immutable record per replicate.
//!
//! Every knob of a simulation replicate lives here and is validated once,
//! up front.  Downstream components (simulator, weighting, estimation) take
//! the record by reference and never re-derive `T`/`K` from array shapes on
//! their own, so a malformed sweep entry fails before any simulation work
//! begins.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.  All of these are fail-fast: they are raised before
/// a single round of the experiment is simulated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("need at least 2 arms, got {0}")]
    TooFewArms(usize),

    #[error("horizon T={t} is shorter than the pure-exploration phase initial*K = {initial}*{k}")]
    HorizonTooShort { t: usize, k: usize, initial: usize },

    #[error("initial must be >= 1")]
    ZeroInitial,

    #[error("floor_start must lie in (0, 1], got {0}")]
    FloorStartOutOfRange(f64),

    #[error("floor_decay must lie in [0, 1), got {0}")]
    FloorDecayOutOfRange(f64),

    #[error("noise_scale must be > 0, got {0}")]
    NonPositiveNoiseScale(f64),

    #[error("potential-outcome matrix has shape {got:?}, config says {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
}

/// Reward noise model for the simulated data-generating process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseModel {
    /// `Uniform(-scale, scale)`, mean zero.
    Uniform,
    /// `Exp(1/scale) - scale`, centered so the mean is zero.
    Exponential,
}

impl NoiseModel {
    /// Stable label used in result tables and artifact keys.
    pub fn label(&self) -> &'static str {
        match self {
            NoiseModel::Uniform => "uniform",
            NoiseModel::Exponential => "exponential",
        }
    }
}

/// Exploration policy used by the simulator.
///
/// Only Thompson-sampling-style exploration is supported; other policies can
/// be supplied through the [`AllocationPolicy`][crate::AllocationPolicy]
/// seam instead of this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplorationPolicy {
    ThompsonSampling,
}

/// Immutable configuration for one experiment replicate.
///
/// Constructed once per replicate and passed by reference everywhere; never
/// mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Number of rounds (samples) in the experiment.
    pub t: usize,
    /// Number of arms.
    pub k: usize,
    /// Reward noise model.
    pub noise: NoiseModel,
    /// Noise scale (uniform half-width, or exponential mean).
    pub noise_scale: f64,
    /// Assignment-probability floor at round 1.  Must lie in `(0, 1]`.
    pub floor_start: f64,
    /// Floor decay exponent: the floor at round `t` is
    /// `floor_start * t^{-floor_decay}`.  Must lie in `[0, 1)`.
    pub floor_decay: f64,
    /// Rounds of deterministic round-robin exploration per arm before the
    /// adaptive policy takes over.
    pub initial: usize,
    /// Data-generating-process label (e.g. `"nosignal"`, `"highSNR"`).
    pub dgp: String,
    /// Exploration policy run by the simulator.
    pub exploration: ExplorationPolicy,
}

impl ExperimentConfig {
    /// Conventional configuration for a `K`-arm run: `initial = 5`,
    /// `floor_start = 1/K`, unit-scale uniform noise, Thompson sampling.
    pub fn for_truth(k: usize, t: usize, floor_decay: f64, dgp: impl Into<String>) -> Self {
        Self {
            t,
            k,
            noise: NoiseModel::Uniform,
            noise_scale: 1.0,
            floor_start: 1.0 / k.max(1) as f64,
            floor_decay,
            initial: 5,
            dgp: dgp.into(),
            exploration: ExplorationPolicy::ThompsonSampling,
        }
    }

    /// Validate the record.  Called by the simulator before any work; callers
    /// constructing configs from sweep definitions should call it themselves
    /// so a bad entry fails at construction time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.k < 2 {
            return Err(ConfigError::TooFewArms(self.k));
        }
        if self.initial < 1 {
            return Err(ConfigError::ZeroInitial);
        }
        if self.t < self.initial * self.k {
            return Err(ConfigError::HorizonTooShort {
                t: self.t,
                k: self.k,
                initial: self.initial,
            });
        }
        if !(self.floor_start > 0.0 && self.floor_start <= 1.0) {
            return Err(ConfigError::FloorStartOutOfRange(self.floor_start));
        }
        if !(self.floor_decay >= 0.0 && self.floor_decay < 1.0) {
            return Err(ConfigError::FloorDecayOutOfRange(self.floor_decay));
        }
        if !(self.noise_scale > 0.0) {
            return Err(ConfigError::NonPositiveNoiseScale(self.noise_scale));
        }
        Ok(())
    }
}
