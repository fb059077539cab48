/*!
# Posterior estimator

[`PosteriorEstimator`] bundles a [`Posterior`], a [`SamplerConfig`], and an
[`EnsembleMove`] into one validated unit: it builds the jittered starting
ensemble, runs the sampler, and summarizes the chain.

All randomness of a fit derives from `config.seed`. The initial ensemble is
drawn from a generator seeded with `seed`, the sampler from one seeded with
`seed + 1`, so two fits with the same configuration agree bit for bit.

## Example Usage

```rust
use fdpr_mcmc::config::SamplerConfig;
use fdpr_mcmc::distributions::{BoxPrior, Observation, Posterior};
use fdpr_mcmc::estimator::PosteriorEstimator;
use fdpr_mcmc::model::HubbleModel;
use fdpr_mcmc::stretch::StretchMove;

let prior = BoxPrior::new(&[(0.0, 1e-4), (0.0, 10.0)]).unwrap();
let data = vec![Observation::new(2.0, 73.0, 1.0)];
let posterior = Posterior::new(HubbleModel::default(), prior, data).unwrap();
let config = SamplerConfig::new(vec![2.7e-5, 1.1], 16, 400)
    .with_burn_in(100)
    .set_seed(42);

let estimator = PosteriorEstimator::new(posterior, config, StretchMove::default()).unwrap();
let fit = estimator.fit().unwrap();
assert_eq!(fit.chain.shape(), &[400, 16, 2]);
assert!((fit.summary.derived - 73.0).abs() < 3.0);
```
*/

use ndarray::{Array1, Array2, Array3, Axis};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::config::SamplerConfig;
use crate::core::{init_jitter, EnsembleMove};
use crate::distributions::Posterior;
use crate::ensemble::EnsembleSampler;
use crate::error::{ConfigError, ModelError, Result};
use crate::io::{ChainStore, MemoryStore};
use crate::model::Model;
use crate::stats::{self, PosteriorSummary};

/// Outcome of [`PosteriorEstimator::fit`].
#[derive(Debug, Clone, PartialEq)]
pub struct Fit {
    /// Full chain `[step, walker, parameter]`, burn-in included.
    pub chain: Array3<f64>,
    pub summary: PosteriorSummary,
    /// Per-walker fraction of accepted proposals.
    pub acceptance_fraction: Array1<f64>,
}

/// A validated posterior, run configuration, and ensemble move.
#[derive(Debug, Clone)]
pub struct PosteriorEstimator<M, E> {
    pub posterior: Posterior<M>,
    pub config: SamplerConfig,
    pub mv: E,
}

impl<M, E> PosteriorEstimator<M, E>
where
    M: Model + Sync,
    E: EnsembleMove + Clone,
{
    /// Validates `config` against the prior and `mv` against the ensemble shape.
    pub fn new(posterior: Posterior<M>, config: SamplerConfig, mv: E) -> Result<Self> {
        config.validate(&posterior.prior)?;
        mv.validate(config.n_walkers, config.n_dim())?;
        Ok(Self {
            posterior,
            config,
            mv,
        })
    }

    /// Model prediction at covariate `x`.
    pub fn evaluate_model(&self, theta: &[f64], x: f64) -> std::result::Result<f64, ModelError> {
        self.posterior.model.predict(theta, x)
    }

    /// Model predictions at every covariate in `xs`.
    pub fn evaluate_model_batch(
        &self,
        theta: &[f64],
        xs: &Array1<f64>,
    ) -> std::result::Result<Array1<f64>, ModelError> {
        self.posterior.model.predict_batch(theta, xs)
    }

    pub fn log_prior(&self, theta: &[f64]) -> f64 {
        self.posterior.log_prior(theta)
    }

    pub fn log_likelihood(&self, theta: &[f64]) -> std::result::Result<f64, ModelError> {
        self.posterior.log_likelihood(theta)
    }

    pub fn log_posterior(&self, theta: &[f64]) -> std::result::Result<f64, ModelError> {
        self.posterior.log_posterior(theta)
    }

    /// The seeded, jittered starting ensemble `[walker, parameter]`.
    pub fn initial_positions(&self) -> Array2<f64> {
        let mut rng = SmallRng::seed_from_u64(self.config.seed);
        init_jitter(
            &self.config.initial_guess,
            self.config.jitter,
            self.config.n_walkers,
            &mut rng,
        )
    }

    /// Checks starting positions against the posterior's dimension and the move.
    fn check_positions(&self, positions: &Array2<f64>) -> Result<()> {
        let (n_walkers, n_dim) = positions.dim();
        if n_dim != self.posterior.n_dim() {
            return Err(ConfigError::DimensionMismatch {
                what: "initial positions",
                expected: self.posterior.n_dim(),
                got: n_dim,
            }
            .into());
        }
        self.mv.validate(n_walkers, n_dim)?;
        Ok(())
    }

    fn sampler(&self, initial_positions: Array2<f64>) -> Result<EnsembleSampler<&Posterior<M>, E>> {
        self.check_positions(&initial_positions)?;
        Ok(
            EnsembleSampler::new(&self.posterior, self.mv.clone(), initial_positions)?
                .set_seed(self.config.seed.wrapping_add(1)),
        )
    }

    /// Runs `n_steps` steps into `store`, with a progress bar when configured.
    fn drive<S: ChainStore + ?Sized>(
        &self,
        initial_positions: Array2<f64>,
        n_steps: usize,
        store: &mut S,
    ) -> Result<Array1<f64>> {
        let mut sampler = self.sampler(initial_positions)?;
        if self.config.progress {
            sampler.run_into_progress(n_steps, store)?;
        } else {
            sampler.run_into(n_steps, store)?;
        }
        Ok(sampler.acceptance_fraction())
    }

    /**
    Runs `n_steps` steps from explicit starting positions and returns the full
    chain, burn-in included.

    The number of walkers is taken from `initial_positions`; its columns must
    match the posterior's parameters.
    */
    pub fn run_sampler(&self, initial_positions: Array2<f64>, n_steps: usize) -> Result<Array3<f64>> {
        let (n_walkers, n_dim) = initial_positions.dim();
        let mut store = MemoryStore::new(n_walkers, n_dim);
        self.drive(initial_positions, n_steps, &mut store)?;
        Ok(store.get_chain()?)
    }

    /// Runs the configured number of steps from [`Self::initial_positions`].
    pub fn run(&self) -> Result<Array3<f64>> {
        self.run_sampler(self.initial_positions(), self.config.n_steps)
    }

    /**
    Runs the configured number of steps, streaming every step into `store`.

    When the store already holds steps, sampling resumes from its last
    positions instead of the jittered guess; those must have the configured
    walker count and the posterior's dimension. Returns the acceptance
    fraction of this run.
    */
    pub fn run_into<S: ChainStore + ?Sized>(&self, store: &mut S) -> Result<Array1<f64>> {
        let start = if store.iteration() > 0 {
            let last = store.last_positions()?;
            if last.nrows() != self.config.n_walkers {
                return Err(ConfigError::DimensionMismatch {
                    what: "stored walkers",
                    expected: self.config.n_walkers,
                    got: last.nrows(),
                }
                .into());
            }
            last
        } else {
            self.initial_positions()
        };
        self.drive(start, self.config.n_steps, store)
    }

    /// Summarizes `chain` with the configured burn-in and thinning; the
    /// derived quantity is the model's, evaluated at the median.
    pub fn summarize(&self, chain: &Array3<f64>) -> Result<PosteriorSummary> {
        let n_dim = chain.len_of(Axis(2));
        if n_dim != self.posterior.n_dim() {
            return Err(ConfigError::DimensionMismatch {
                what: "chain parameters",
                expected: self.posterior.n_dim(),
                got: n_dim,
            }
            .into());
        }
        stats::summarize(chain, self.config.burn_in, self.config.thin, |theta| {
            self.posterior.model.derived(theta)
        })
    }

    /// Samples the posterior and summarizes the result.
    pub fn fit(&self) -> Result<Fit> {
        let mut store = MemoryStore::new(self.config.n_walkers, self.config.n_dim());
        let acceptance_fraction =
            self.drive(self.initial_positions(), self.config.n_steps, &mut store)?;
        let chain = store.get_chain()?;
        let summary = self.summarize(&chain)?;
        Ok(Fit {
            chain,
            summary,
            acceptance_fraction,
        })
    }
}
