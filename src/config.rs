//! Run configuration for the posterior estimator.

use rand::{thread_rng, Rng};

use crate::distributions::BoxPrior;
use crate::error::ConfigError;

/**
Walker count, chain length, burn-in, thinning, and ensemble initialization.

Burn-in and thinning only affect summarization; the sampler always records
the full chain.

# Examples

```rust
use fdpr_mcmc::config::SamplerConfig;
use fdpr_mcmc::distributions::BoxPrior;

let prior = BoxPrior::new(&[(0.0, 1e-4), (0.0, 10.0)]).unwrap();
let config = SamplerConfig::new(vec![2.7e-5, 1.1], 32, 5_000)
    .with_burn_in(1_000)
    .with_thin(10)
    .set_seed(42);
assert!(config.validate(&prior).is_ok());
assert!(config.clone().with_burn_in(5_000).validate(&prior).is_err());
```
*/
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    /// Number of walkers in the ensemble.
    pub n_walkers: usize,
    /// Number of ensemble steps to run.
    pub n_steps: usize,
    /// Leading steps dropped before summarizing.
    pub burn_in: usize,
    /// Keep every `thin`-th step after burn-in.
    pub thin: usize,
    /// Center of the initial ensemble.
    pub initial_guess: Vec<f64>,
    /// Standard deviation of the Gaussian jitter around `initial_guess`.
    pub jitter: f64,
    /// Seed of the run's random number generator.
    pub seed: u64,
    /// Show a progress bar while sampling.
    pub progress: bool,
}

impl SamplerConfig {
    /// A configuration with no burn-in, no thinning, a jitter of `1e-6`, and a
    /// random seed.
    pub fn new(initial_guess: Vec<f64>, n_walkers: usize, n_steps: usize) -> Self {
        Self {
            n_walkers,
            n_steps,
            burn_in: 0,
            thin: 1,
            initial_guess,
            jitter: 1e-6,
            seed: thread_rng().gen::<u64>(),
            progress: false,
        }
    }

    pub fn with_burn_in(mut self, burn_in: usize) -> Self {
        self.burn_in = burn_in;
        self
    }

    pub fn with_thin(mut self, thin: usize) -> Self {
        self.thin = thin;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn n_dim(&self) -> usize {
        self.initial_guess.len()
    }

    /// Checks every field, and that the initial guess lies inside `prior`.
    pub fn validate(&self, prior: &BoxPrior) -> Result<(), ConfigError> {
        if self.n_walkers == 0 {
            return Err(ConfigError::NoWalkers);
        }
        if self.n_dim() == 0 {
            return Err(ConfigError::NoDimensions);
        }
        if self.n_steps == 0 {
            return Err(ConfigError::NoSteps);
        }
        if self.burn_in >= self.n_steps {
            return Err(ConfigError::BurnInTooLong {
                burn_in: self.burn_in,
                n_steps: self.n_steps,
            });
        }
        if self.thin == 0 {
            return Err(ConfigError::ZeroThin);
        }
        if !(self.jitter.is_finite() && self.jitter > 0.0) {
            return Err(ConfigError::InvalidJitter(self.jitter));
        }
        if prior.n_dim() != self.n_dim() {
            return Err(ConfigError::DimensionMismatch {
                what: "initial guess",
                expected: prior.n_dim(),
                got: self.n_dim(),
            });
        }
        if let Some((index, value)) = prior.first_violation(&self.initial_guess) {
            return Err(ConfigError::GuessOutsidePrior { index, value });
        }
        Ok(())
    }
}
