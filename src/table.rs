//! Long-format result rows.
//!
//! One row per `(statistic, policy, method)` per run, tagged with the full
//! run configuration so independent sweep workers can merge their tables by
//! simple concatenation.  Persistence is the caller's concern; rows are
//! plain serde-serializable records.

use serde::Serialize;

use crate::config::ExperimentConfig;
use crate::inference::ArmStats;

/// One cell of the long-format statistics table.
#[derive(Debug, Clone, Serialize)]
pub struct Row {
    /// Statistic label (`estimate`, `stderr`, `bias`, `coverage`, `t-stat`,
    /// `mse`, `CI_width`, `truth`, `abserr`).
    pub statistic: &'static str,
    /// Arm index (`"2"`) or contrast label (`"(0,2)"`).
    pub policy: String,
    pub value: f64,
    /// Estimator label (`uniform`, `two_point`, `beta_bernoulli`, …).
    pub method: String,
    #[serde(rename = "T")]
    pub t: usize,
    #[serde(rename = "K")]
    pub k: usize,
    pub noise_func: &'static str,
    pub noise_scale: f64,
    pub floor_start: f64,
    pub floor_decay: f64,
    pub initial: usize,
    pub dgp: String,
}

fn push_rows(
    out: &mut Vec<Row>,
    method: &str,
    policy: String,
    stats: &ArmStats,
    cfg: &ExperimentConfig,
) {
    for (statistic, value) in stats.named_values() {
        out.push(Row {
            statistic,
            policy: policy.clone(),
            value,
            method: method.to_string(),
            t: cfg.t,
            k: cfg.k,
            noise_func: cfg.noise.label(),
            noise_scale: cfg.noise_scale,
            floor_start: cfg.floor_start,
            floor_decay: cfg.floor_decay,
            initial: cfg.initial,
            dgp: cfg.dgp.clone(),
        });
    }
}

/// Flatten per-arm statistics into rows; `policy` is the arm index.
pub fn rows_from_stats(method: &str, stats: &[ArmStats], cfg: &ExperimentConfig) -> Vec<Row> {
    let mut out = Vec::with_capacity(stats.len() * crate::inference::STATISTICS.len());
    for (arm, s) in stats.iter().enumerate() {
        push_rows(&mut out, method, arm.to_string(), s, cfg);
    }
    out
}

/// Flatten contrast statistics into rows; `policy` is the ordered pair
/// `(0,k)` for `k = 1..K-1`.
pub fn rows_from_contrasts(method: &str, contrasts: &[ArmStats], cfg: &ExperimentConfig) -> Vec<Row> {
    let mut out = Vec::with_capacity(contrasts.len() * crate::inference::STATISTICS.len());
    for (idx, s) in contrasts.iter().enumerate() {
        push_rows(&mut out, method, format!("(0,{})", idx + 1), s, cfg);
    }
    out
}
