//! Precomputed W-decorrelation weighting artifacts.
//!
//! The W-decorrelation estimator needs decorrelation matrices computed
//! offline for the exact `(dgp, noise, T, floor_decay)` combination of a
//! run.  The lookup either succeeds with the matrices or fails with
//! [`ArtifactError::NotFound`]; the caller decides what a miss means
//! (the harness skips that estimator and logs a warning).

use std::path::{Path, PathBuf};

use ndarray::Array2;
use serde::Deserialize;
use thiserror::Error;

use crate::config::NoiseModel;

/// Lookup key for a W-decorrelation artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactKey<'a> {
    pub dgp: &'a str,
    pub noise: NoiseModel,
    pub t: usize,
    pub floor_decay: f64,
}

impl ArtifactKey<'_> {
    /// Deterministic file stem; concurrent sweeps resolve the same key to
    /// the same file.
    pub fn file_name(&self) -> String {
        format!(
            "W_lambdas_{}-{}-{}-{}.json",
            self.dgp,
            self.noise.label(),
            self.t,
            self.floor_decay
        )
    }
}

/// Errors from artifact lookup.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// No artifact for this key.  Recoverable: the run proceeds without the
    /// W-decorrelation estimator.
    #[error("no W-decorrelation artifact at {path}")]
    NotFound { path: PathBuf },

    /// The file exists but does not parse or has the wrong shape.  Not
    /// recoverable: a truncated or mismatched artifact is a deployment bug.
    #[error("malformed W-decorrelation artifact {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

#[derive(Deserialize)]
struct RawArtifact {
    percentiles: Vec<f64>,
    w_lambdas: Vec<Vec<Vec<f64>>>,
}

/// A loaded W-decorrelation artifact: one `[T, K]` decorrelation matrix per
/// tuning percentile.
#[derive(Debug, Clone)]
pub struct WDecorrArtifact {
    pub percentiles: Vec<f64>,
    pub w_lambdas: Vec<Array2<f64>>,
}

impl WDecorrArtifact {
    /// Load the artifact for `key` from `dir`.
    ///
    /// A missing file is [`ArtifactError::NotFound`]; a file that parses but
    /// whose matrices are ragged, empty, or disagree with `percentiles` is
    /// [`ArtifactError::Malformed`].
    pub fn load(dir: &Path, key: &ArtifactKey<'_>) -> Result<Self, ArtifactError> {
        let path = dir.join(key.file_name());
        let bytes = std::fs::read(&path).map_err(|_| ArtifactError::NotFound { path: path.clone() })?;
        let raw: RawArtifact =
            serde_json::from_slice(&bytes).map_err(|e| ArtifactError::Malformed {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        Self::from_raw(raw, &path, key.t)
    }

    /// Load if present: `Ok(None)` on a miss (logged as a warning), error
    /// only on a malformed file.
    pub fn load_optional(
        dir: &Path,
        key: &ArtifactKey<'_>,
    ) -> Result<Option<Self>, ArtifactError> {
        match Self::load(dir, key) {
            Ok(a) => Ok(Some(a)),
            Err(ArtifactError::NotFound { path }) => {
                tracing::warn!(
                    path = %path.display(),
                    "W-decorrelation artifact missing; skipping that estimator"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn from_raw(raw: RawArtifact, path: &Path, t: usize) -> Result<Self, ArtifactError> {
        let malformed = |reason: String| ArtifactError::Malformed {
            path: path.to_path_buf(),
            reason,
        };
        if raw.w_lambdas.len() != raw.percentiles.len() {
            return Err(malformed(format!(
                "{} percentiles but {} weight matrices",
                raw.percentiles.len(),
                raw.w_lambdas.len()
            )));
        }
        let mut w_lambdas = Vec::with_capacity(raw.w_lambdas.len());
        for (i, mat) in raw.w_lambdas.into_iter().enumerate() {
            if mat.len() != t {
                return Err(malformed(format!(
                    "matrix {i} has {} rows, expected T={t}",
                    mat.len()
                )));
            }
            let k = mat.first().map(Vec::len).unwrap_or(0);
            if k == 0 || mat.iter().any(|row| row.len() != k) {
                return Err(malformed(format!("matrix {i} is ragged or empty")));
            }
            let flat: Vec<f64> = mat.into_iter().flatten().collect();
            let arr = Array2::from_shape_vec((t, k), flat)
                .map_err(|e| malformed(format!("matrix {i}: {e}")))?;
            w_lambdas.push(arr);
        }
        Ok(Self {
            percentiles: raw.percentiles,
            w_lambdas,
        })
    }
}
