//! One-replicate evaluation pipeline.
//!
//! Ties the components together in the order the data flows:
//! simulate → AIPW scores → weights → statistics → table rows.  Each
//! replicate is fully independent of every other: it owns its RNG stream,
//! reads no prior state, and emits a self-describing row set, so an outer
//! sweep can fan replicates out across worker processes and concatenate the
//! tables at the end.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use crate::artifact::WDecorrArtifact;
use crate::config::{ConfigError, ExperimentConfig};
use crate::estimators::{beta_bernoulli_stats, gamma_exponential_stats, wdecorr_stats};
use crate::inference::{aw_contrasts, aw_scores, aw_stats, leave_one_out_means, ArmStats};
use crate::simulator::{draw_potential_outcomes, run_experiment, History};
use crate::table::{rows_from_contrasts, rows_from_stats, Row};
use crate::weights::WeightScheme;

/// Two-sided significance level of the posterior baselines' intervals.
const BASELINE_ALPHA: f64 = 0.1;

/// Everything one replicate produced: per-method arm statistics and
/// contrasts, plus the history they were computed from.
#[derive(Debug, Clone)]
pub struct ReplicateOutcome {
    /// `(method, per-arm statistics)`, in evaluation order.
    pub stats: Vec<(String, Vec<ArmStats>)>,
    /// `(method, contrast statistics)`, in evaluation order.
    pub contrasts: Vec<(String, Vec<ArmStats>)>,
    /// The recorded experiment history.
    pub history: History,
    cfg: ExperimentConfig,
}

impl ReplicateOutcome {
    /// Flatten every method's statistics and contrasts into long-format rows.
    pub fn rows(&self) -> Vec<Row> {
        let mut out = Vec::new();
        for (method, stats) in &self.stats {
            out.extend(rows_from_stats(method, stats, &self.cfg));
        }
        for (method, contrasts) in &self.contrasts {
            out.extend(rows_from_contrasts(method, contrasts, &self.cfg));
        }
        out
    }
}

/// Run one full replicate: simulate the adaptive experiment, evaluate every
/// weighting scheme and baseline estimator against `truth`.
///
/// `artifact` is the optional precomputed W-decorrelation weighting for this
/// run's key; `None` simply omits those methods (the caller has already
/// logged the miss via [`WDecorrArtifact::load_optional`]).
pub fn run_replicate(
    truth: &[f64],
    cfg: &ExperimentConfig,
    seed: u64,
    artifact: Option<&WDecorrArtifact>,
) -> Result<ReplicateOutcome, ConfigError> {
    cfg.validate()?;
    debug!(t = cfg.t, k = cfg.k, dgp = %cfg.dgp, seed, "running replicate");

    let mut rng = StdRng::seed_from_u64(seed);
    let ys = draw_potential_outcomes(truth, cfg, &mut rng);
    let history = run_experiment(&ys, cfg, seed.wrapping_add(1))?;

    let muhat = leave_one_out_means(&history.rewards, &history.arms, cfg.k);
    let scores = aw_scores(&history.rewards, &history.arms, &history.probs, &muhat);

    let mut stats: Vec<(String, Vec<ArmStats>)> = Vec::new();
    let mut contrasts: Vec<(String, Vec<ArmStats>)> = Vec::new();

    for scheme in WeightScheme::ALL {
        let w = scheme.compute(&history.probs, cfg.floor_start, cfg.floor_decay);
        stats.push((scheme.name().to_string(), aw_stats(&scores, &w, truth)));
        contrasts.push((scheme.name().to_string(), aw_contrasts(&scores, &w, truth)));
    }

    stats.push((
        "beta_bernoulli".to_string(),
        beta_bernoulli_stats(
            &history.rewards,
            &history.arms,
            cfg.k,
            cfg.floor_start,
            cfg.floor_decay,
            truth,
            BASELINE_ALPHA,
        ),
    ));
    stats.push((
        "gamma_exponential".to_string(),
        gamma_exponential_stats(
            &history.rewards,
            &history.arms,
            cfg.k,
            cfg.floor_start,
            cfg.floor_decay,
            truth,
            BASELINE_ALPHA,
        ),
    ));

    if let Some(art) = artifact {
        for (percentile, w_lambda) in art.percentiles.iter().zip(art.w_lambdas.iter()) {
            stats.push((
                format!("W-decorrelation_{percentile}"),
                wdecorr_stats(&history.arms, &history.rewards, cfg.k, w_lambda, truth),
            ));
        }
    }

    Ok(ReplicateOutcome {
        stats,
        contrasts,
        history,
        cfg: cfg.clone(),
    })
}

/// Compute every weight scheme's matrix for a recorded probability history.
///
/// Exposed for diagnostics (the weight matrices themselves are sometimes
/// worth inspecting alongside the statistics table).
pub fn weight_matrices(
    probs: &Array2<f64>,
    cfg: &ExperimentConfig,
) -> Vec<(&'static str, Array2<f64>)> {
    WeightScheme::ALL
        .iter()
        .map(|s| (s.name(), s.compute(probs, cfg.floor_start, cfg.floor_decay)))
        .collect()
}
