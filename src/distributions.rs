/*!
Prior, likelihood and posterior densities for fitting a [`Model`] to data.

The posterior is the product of a flat box prior and an independent Gaussian
likelihood per observation:

```text
log p(theta | data) = log prior(theta) + sum_i -0.5 * ((y_i - f(theta, x_i)) / sigma_i)^2
```

# Examples

```rust
use fdpr_mcmc::distributions::{BoxPrior, Observation, Posterior, Target};
use fdpr_mcmc::model::HubbleModel;

let prior = BoxPrior::new(&[(0.0, 1e-4), (0.0, 10.0)]).unwrap();
let data = vec![Observation::new(2.0, 73.0, 1.0)];
let posterior = Posterior::new(HubbleModel::default(), prior, data).unwrap();

assert_eq!(posterior.log_prior(&[2e-5, 1.1]), 0.0);
assert_eq!(posterior.log_prior(&[-1e-5, 1.1]), f64::NEG_INFINITY);
let lp = posterior.unnorm_log_prob(&[2e-5, 1.1]).unwrap();
assert!(lp.abs() < 1e-9);
```
*/

use crate::error::{ConfigError, ModelError};
use crate::model::Model;

/// A density the samplers can explore.
///
/// `unnorm_log_prob` may return `-inf` to reject a state. An `Err` is a
/// numeric failure that aborts sampling.
pub trait Target {
    /// Returns the log of the unnormalized density for state `theta`.
    fn unnorm_log_prob(&self, theta: &[f64]) -> Result<f64, ModelError>;
}

impl<D: Target + ?Sized> Target for &D {
    fn unnorm_log_prob(&self, theta: &[f64]) -> Result<f64, ModelError> {
        (**self).unnorm_log_prob(theta)
    }
}

/// Half-open interval `(lo, hi]` for one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub lo: f64,
    pub hi: f64,
}

impl Bound {
    pub fn contains(&self, x: f64) -> bool {
        x > self.lo && x <= self.hi
    }
}

/// Flat prior over a box of half-open intervals.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxPrior {
    bounds: Vec<Bound>,
}

impl BoxPrior {
    /// Builds a prior from `(lo, hi]` pairs. `hi` may be infinite, `lo` may be
    /// negative infinity, but `lo < hi` must hold and neither may be NaN.
    pub fn new(bounds: &[(f64, f64)]) -> Result<Self, ConfigError> {
        if bounds.is_empty() {
            return Err(ConfigError::NoDimensions);
        }
        let bounds = bounds
            .iter()
            .enumerate()
            .map(|(index, &(lo, hi))| {
                if lo.is_nan() || hi.is_nan() || lo >= hi {
                    Err(ConfigError::InvalidBound { index, lo, hi })
                } else {
                    Ok(Bound { lo, hi })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { bounds })
    }

    pub fn n_dim(&self) -> usize {
        self.bounds.len()
    }

    pub fn bounds(&self) -> &[Bound] {
        &self.bounds
    }

    pub fn contains(&self, theta: &[f64]) -> bool {
        theta.len() == self.bounds.len()
            && self.bounds.iter().zip(theta).all(|(b, &x)| b.contains(x))
    }

    /// `0` inside the box, `-inf` outside.
    pub fn log_prob(&self, theta: &[f64]) -> f64 {
        if self.contains(theta) {
            0.0
        } else {
            f64::NEG_INFINITY
        }
    }

    /// Index and value of the first coordinate outside its bound, if any.
    pub fn first_violation(&self, theta: &[f64]) -> Option<(usize, f64)> {
        self.bounds
            .iter()
            .zip(theta)
            .enumerate()
            .find(|(_, (b, x))| !b.contains(**x))
            .map(|(i, (_, &x))| (i, x))
    }
}

/// One measurement with its 1-sigma uncertainty, taken at covariate `x`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub x: f64,
    pub value: f64,
    pub sigma: f64,
}

impl Observation {
    pub fn new(x: f64, value: f64, sigma: f64) -> Self {
        Self { x, value, sigma }
    }

    /// Gaussian log-likelihood term `-0.5 * ((value - predicted) / sigma)^2`.
    pub fn log_likelihood(&self, predicted: f64) -> f64 {
        let r = (self.value - predicted) / self.sigma;
        -0.5 * r * r
    }
}

/**
Posterior density of a [`Model`] under a [`BoxPrior`] and independent Gaussian
observations.

Construction validates the whole setup: the prior's dimension must match the
model's, the observation set must be non-empty, and every uncertainty must be
positive.
*/
#[derive(Debug, Clone)]
pub struct Posterior<M> {
    pub model: M,
    pub prior: BoxPrior,
    pub observations: Vec<Observation>,
}

impl<M: Model> Posterior<M> {
    pub fn new(
        model: M,
        prior: BoxPrior,
        observations: Vec<Observation>,
    ) -> Result<Self, ConfigError> {
        if prior.n_dim() != model.n_params() {
            return Err(ConfigError::DimensionMismatch {
                what: "prior bounds",
                expected: model.n_params(),
                got: prior.n_dim(),
            });
        }
        if observations.is_empty() {
            return Err(ConfigError::NoObservations);
        }
        for (index, obs) in observations.iter().enumerate() {
            if !(obs.sigma.is_finite() && obs.sigma > 0.0) {
                return Err(ConfigError::InvalidSigma {
                    index,
                    sigma: obs.sigma,
                });
            }
            if !(obs.value.is_finite() && obs.x.is_finite()) {
                return Err(ConfigError::InvalidObservation { index });
            }
        }
        Ok(Self {
            model,
            prior,
            observations,
        })
    }

    pub fn n_dim(&self) -> usize {
        self.prior.n_dim()
    }

    pub fn log_prior(&self, theta: &[f64]) -> f64 {
        self.prior.log_prob(theta)
    }

    /// Sum of the Gaussian log-likelihood terms of all observations.
    pub fn log_likelihood(&self, theta: &[f64]) -> Result<f64, ModelError> {
        self.observations.iter().try_fold(0.0, |acc, obs| {
            let predicted = self.model.predict(theta, obs.x)?;
            Ok(acc + obs.log_likelihood(predicted))
        })
    }

    /// Log-posterior; the likelihood is skipped when the prior rejects `theta`.
    pub fn log_posterior(&self, theta: &[f64]) -> Result<f64, ModelError> {
        let lp = self.log_prior(theta);
        if !lp.is_finite() {
            return Ok(f64::NEG_INFINITY);
        }
        Ok(lp + self.log_likelihood(theta)?)
    }
}

impl<M: Model> Target for Posterior<M> {
    fn unnorm_log_prob(&self, theta: &[f64]) -> Result<f64, ModelError> {
        self.log_posterior(theta)
    }
}
