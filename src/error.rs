//! Error types shared across the crate.
//!
//! Configuration problems are caught before any sampling starts and are
//! reported as [`ConfigError`]. Numeric failures of a model inside the prior
//! support surface as [`ModelError`] and abort the run. Chain persistence has
//! its own [`StoreError`]. [`Error`] wraps all of them.

use ndarray_stats::errors::QuantileError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("number of walkers must be positive")]
    NoWalkers,
    #[error("parameter vector must have at least one dimension")]
    NoDimensions,
    #[error("number of steps must be positive")]
    NoSteps,
    #[error("burn-in ({burn_in}) must be smaller than the number of steps ({n_steps})")]
    BurnInTooLong { burn_in: usize, n_steps: usize },
    #[error("thinning factor must be at least 1")]
    ZeroThin,
    #[error("initial jitter must be positive and finite, got {0}")]
    InvalidJitter(f64),
    #[error("prior bound for parameter {index} is invalid: ({lo}, {hi}]")]
    InvalidBound { index: usize, lo: f64, hi: f64 },
    #[error("expected {expected} values for {what}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("initial guess for parameter {index} ({value}) lies outside the prior support")]
    GuessOutsidePrior { index: usize, value: f64 },
    #[error("observation set is empty")]
    NoObservations,
    #[error("observation {index} has non-positive or non-finite uncertainty {sigma}")]
    InvalidSigma { index: usize, sigma: f64 },
    #[error("observation {index} has a non-finite value or covariate")]
    InvalidObservation { index: usize },
    #[error("stretch move needs at least {required} walkers for {n_dim} parameters, got {n_walkers}")]
    TooFewWalkers {
        n_walkers: usize,
        n_dim: usize,
        required: usize,
    },
    #[error("step scale for parameter {index} must be positive and finite, got {scale}")]
    InvalidStepScale { index: usize, scale: f64 },
    #[error("stretch scale must be greater than 1, got {0}")]
    InvalidStretchScale(f64),
    #[error("quantile must lie in [0, 1], got {0}")]
    InvalidQuantile(f64),
    #[error("model constant `{name}` must be positive and finite, got {value}")]
    InvalidConstant { name: &'static str, value: f64 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("{quantity} is undefined for theta = {theta:?}")]
    Domain {
        quantity: &'static str,
        theta: Vec<f64>,
    },
    #[error("model prediction is not finite ({value}) for theta = {theta:?}")]
    NonFinite { value: f64, theta: Vec<f64> },
    #[error("model takes {expected} parameters, got {got}")]
    WrongDimension { expected: usize, got: usize },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("chain store is read-only")]
    ReadOnly,
    #[error("chain store has been closed")]
    Closed,
    #[error("step has shape {got:?}, store expects {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
    #[error("chain store is empty")]
    Empty,
    #[error("malformed chain file: {0}")]
    Malformed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[cfg(feature = "csv")]
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("model evaluation failed: {0}")]
    Model(#[from] ModelError),
    #[error("chain store failure: {0}")]
    Store(#[from] StoreError),
    #[error("no samples left after discarding {burn_in} of {n_steps} steps")]
    NoSamples { burn_in: usize, n_steps: usize },
    #[error("samples of parameter {index} contain NaN")]
    NanSample { index: usize },
    #[error(transparent)]
    Quantile(#[from] QuantileError),
}

pub type Result<T> = std::result::Result<T, Error>;
