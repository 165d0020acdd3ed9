//! `aweval`: adaptively-weighted evaluation for adaptive experiments.
//!
//! Data collected by an adaptive experiment (a multi-armed bandit run under
//! a sequential allocation policy) is not i.i.d.: the assignment probability
//! of each arm depends on everything observed so far.  Plug-in estimates of
//! arm values built from such data are biased, and their naive confidence
//! intervals under-cover.  This crate evaluates the estimators that fix
//! this — adaptively-weighted AIPW — against baselines, producing point
//! estimates, standard errors, coverage, and MSE for individual arms and
//! pairwise contrasts.
//!
//! The approach follows Hadad, Hirshberg, Zhan, Wager & Athey,
//! *Confidence Intervals for Policy Evaluation in Adaptive Experiments*
//! (arXiv:1911.02768).  The key pieces:
//!
//! - **Simulation** ([`run_experiment`], [`ThompsonPolicy`]): a T-round
//!   bandit loop under Thompson-sampling-like exploration with a decaying
//!   assignment-probability floor, recording the full probability vector at
//!   every round.
//! - **Weighting** ([`WeightScheme`], [`stick_breaking`],
//!   [`twopoint_stable_var_ratio`]): variance-stabilizing evaluation weights
//!   computed from propensities alone.  The two-point scheme converts a
//!   closed-form variance-ratio sequence into weights via a stick-breaking
//!   recursion, bounding the total mass any single round can claim.
//! - **Estimation** ([`aw_scores`], [`aw_stats`], [`aw_contrasts`]):
//!   augmented inverse-propensity scoring and weighted aggregation into the
//!   statistics tuple `(estimate, stderr, bias, coverage, t-stat, mse,
//!   CI width, truth)`.
//! - **Baselines** ([`beta_bernoulli_stats`], [`gamma_exponential_stats`],
//!   [`wdecorr_stats`]): closed-form posterior estimators and the
//!   W-decorrelation estimator driven by a precomputed artifact
//!   ([`WDecorrArtifact`]).
//! - **Harness** ([`run_replicate`]): one replicate end to end, flattened
//!   into a long-format [`Row`] table.
//!
//! Replicates are fully independent — own RNG stream, no shared state — so
//! sweeps parallelize across processes by concatenating row sets.
//!
//! **Non-goals:** this is not a general bandit-allocation library (only
//! floored Thompson-style exploration is built in; other rules plug in via
//! [`AllocationPolicy`]), and it does not orchestrate sweeps or persist
//! tables to disk.

#![forbid(unsafe_code)]

mod config;
pub use config::*;

mod policy;
pub use policy::*;

mod simulator;
pub use simulator::*;

mod weights;
pub use weights::*;

mod inference;
pub use inference::*;

mod estimators;
pub use estimators::*;

mod artifact;
pub use artifact::*;

mod table;
pub use table::*;

mod harness;
pub use harness::*;
