/*!
# Ensemble sampler

[`EnsembleSampler`] owns a walker ensemble, a target density, and an
[`EnsembleMove`], and records one `[walker, parameter]` slice per step. A
global seed makes every run reproducible: the same seed, move, and starting
positions produce a bit-identical chain regardless of how many threads
evaluate the target.

## Example Usage

```rust
use fdpr_mcmc::core::init_jitter;
use fdpr_mcmc::distributions::{BoxPrior, Observation, Posterior};
use fdpr_mcmc::ensemble::EnsembleSampler;
use fdpr_mcmc::model::HubbleModel;
use fdpr_mcmc::stretch::StretchMove;
use rand::rngs::SmallRng;
use rand::SeedableRng;

let prior = BoxPrior::new(&[(0.0, 1e-4), (0.0, 10.0)]).unwrap();
let data = vec![Observation::new(2.0, 73.0, 1.0)];
let posterior = Posterior::new(HubbleModel::default(), prior, data).unwrap();

let mut rng = SmallRng::seed_from_u64(42);
let start = init_jitter(&[2.7e-5, 1.1], 1e-6, 8, &mut rng);
let mut sampler = EnsembleSampler::new(posterior, StretchMove::default(), start)
    .unwrap()
    .set_seed(42);

let chain = sampler.run(100).unwrap();
assert_eq!(chain.shape(), &[100, 8, 2]);
```
*/

use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{Array1, Array2, Array3};
use rand::prelude::*;

use crate::core::{EnsembleMove, Walkers};
use crate::distributions::Target;
use crate::error::{ConfigError, Result};
use crate::io::{ChainStore, MemoryStore};

/**
Drives an [`EnsembleMove`] over a [`Target`] for a fixed number of steps.

# Type Parameters
- `D`: the target density. Must implement [`Target`] and be `Sync` so a
  half-ensemble can be evaluated in parallel.
- `M`: the ensemble move.
*/
pub struct EnsembleSampler<D, M> {
    /// The density being sampled.
    pub target: D,
    /// The proposal strategy.
    pub mv: M,
    /// Current walker positions and log-densities.
    pub walkers: Walkers,
    /// Global random seed.
    pub seed: u64,
    rng: SmallRng,
    n_accepted: Vec<usize>,
    iteration: usize,
}

impl<D, M> EnsembleSampler<D, M>
where
    D: Target + Sync,
    M: EnsembleMove,
{
    const UPDATE_INTERVAL: Duration = Duration::from_millis(500);

    /**
    Builds a sampler starting from `initial_positions` (`[walker, parameter]`).

    Fails if the move cannot operate on an ensemble of this shape, or if the
    target cannot be evaluated at a starting position. Starting positions
    outside the target's support are allowed.
    */
    pub fn new(target: D, mv: M, initial_positions: Array2<f64>) -> Result<Self> {
        let (n_walkers, n_dim) = initial_positions.dim();
        if n_walkers == 0 {
            return Err(ConfigError::NoWalkers.into());
        }
        if n_dim == 0 {
            return Err(ConfigError::NoDimensions.into());
        }
        mv.validate(n_walkers, n_dim)?;
        let walkers = Walkers::new(initial_positions, &target)?;
        let seed = thread_rng().gen::<u64>();

        Ok(Self {
            target,
            mv,
            walkers,
            seed,
            rng: SmallRng::seed_from_u64(seed),
            n_accepted: vec![0; n_walkers],
            iteration: 0,
        })
    }

    /// Re-seeds the sampler's random number generator.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    pub fn n_walkers(&self) -> usize {
        self.walkers.n_walkers()
    }

    pub fn n_dim(&self) -> usize {
        self.walkers.n_dim()
    }

    /// Number of steps taken so far.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Advances the ensemble by one step and returns the number of walkers
    /// that moved.
    pub fn step(&mut self) -> Result<usize> {
        let accepted = self
            .mv
            .propose_and_accept(&mut self.walkers, &self.target, &mut self.rng)?;
        let mut moved = 0;
        for (count, acc) in self.n_accepted.iter_mut().zip(accepted) {
            if acc {
                *count += 1;
                moved += 1;
            }
        }
        self.iteration += 1;
        Ok(moved)
    }

    /// Runs `n_steps` steps and returns the chain `[step, walker, parameter]`.
    pub fn run(&mut self, n_steps: usize) -> Result<Array3<f64>> {
        let mut store = MemoryStore::new(self.n_walkers(), self.n_dim());
        self.run_into(n_steps, &mut store)?;
        Ok(store.get_chain()?)
    }

    /// Runs `n_steps` steps, appending every step's positions to `store`.
    pub fn run_into<S: ChainStore + ?Sized>(
        &mut self,
        n_steps: usize,
        store: &mut S,
    ) -> Result<()> {
        for _ in 0..n_steps {
            self.step()?;
            store.append(self.walkers.positions.view())?;
        }
        Ok(())
    }

    /// Like [`EnsembleSampler::run`], with a progress bar showing the running
    /// acceptance rate.
    pub fn run_progress(&mut self, n_steps: usize) -> Result<Array3<f64>> {
        let mut store = MemoryStore::new(self.n_walkers(), self.n_dim());
        self.run_into_progress(n_steps, &mut store)?;
        Ok(store.get_chain()?)
    }

    /**
    Like [`EnsembleSampler::run_into`], with a progress bar.

    The bar is updated approximately every 500 milliseconds.
    */
    pub fn run_into_progress<S: ChainStore + ?Sized>(
        &mut self,
        n_steps: usize,
        store: &mut S,
    ) -> Result<()> {
        let pb = ProgressBar::new(n_steps as u64);
        pb.set_prefix("Ensemble");
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{prefix} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );

        let mut moved = 0usize;
        let mut last_update = Instant::now();
        for step_idx in 0..n_steps {
            moved += self.step()?;
            store.append(self.walkers.positions.view())?;

            if last_update.elapsed() >= Self::UPDATE_INTERVAL || step_idx + 1 == n_steps {
                let accept_rate = moved as f64 / ((step_idx + 1) * self.n_walkers()) as f64;
                pb.set_position(step_idx as u64 + 1);
                pb.set_message(format!("AcceptRate={:.3}", accept_rate));
                last_update = Instant::now();
            }
        }
        pb.finish_with_message("Done!");
        Ok(())
    }

    /// Fraction of steps in which each walker moved.
    pub fn acceptance_fraction(&self) -> Array1<f64> {
        let steps = self.iteration.max(1) as f64;
        self.n_accepted.iter().map(|&n| n as f64 / steps).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::init_jitter;
    use crate::error::{Error, ModelError};
    use crate::metropolis_hastings::GaussianWalk;
    use crate::stretch::StretchMove;
    use ndarray::Axis;

    #[derive(Clone)]
    struct Gauss1D {
        mean: f64,
        std: f64,
    }

    impl Target for Gauss1D {
        fn unnorm_log_prob(&self, theta: &[f64]) -> std::result::Result<f64, ModelError> {
            let r = (theta[0] - self.mean) / self.std;
            Ok(-0.5 * r * r)
        }
    }

    /// Fails once the walker wanders past `limit`.
    struct Cliff {
        limit: f64,
    }

    impl Target for Cliff {
        fn unnorm_log_prob(&self, theta: &[f64]) -> std::result::Result<f64, ModelError> {
            if theta[0] > self.limit {
                Err(ModelError::NonFinite {
                    value: f64::INFINITY,
                    theta: theta.to_vec(),
                })
            } else {
                Ok(theta[0])
            }
        }
    }

    fn start(n_walkers: usize, seed: u64) -> Array2<f64> {
        let mut rng = SmallRng::seed_from_u64(seed);
        init_jitter(&[0.0], 0.1, n_walkers, &mut rng)
    }

    #[test]
    fn same_seed_gives_identical_chains() {
        let target = Gauss1D {
            mean: 1.0,
            std: 2.0,
        };
        let run = |seed| {
            EnsembleSampler::new(target.clone(), StretchMove::default(), start(8, 1))
                .unwrap()
                .set_seed(seed)
                .run(200)
                .unwrap()
        };
        assert_eq!(run(7), run(7));
        assert_ne!(run(7), run(8));
    }

    #[test]
    fn chain_has_one_slice_per_step() {
        let target = Gauss1D {
            mean: 0.0,
            std: 1.0,
        };
        let mut sampler = EnsembleSampler::new(target, StretchMove::default(), start(6, 2))
            .unwrap()
            .set_seed(3);
        let chain = sampler.run(50).unwrap();
        assert_eq!(chain.shape(), &[50, 6, 1]);
        assert_eq!(sampler.iteration(), 50);
        assert_eq!(
            chain.index_axis(Axis(0), 49).to_owned(),
            sampler.walkers.positions
        );
        let acc = sampler.acceptance_fraction();
        assert!(acc.iter().all(|&a| (0.0..=1.0).contains(&a)));
        assert!(acc.mean().unwrap() > 0.2);
    }

    #[test]
    fn progress_run_matches_plain_run() {
        let target = Gauss1D {
            mean: 0.0,
            std: 1.0,
        };
        let plain = EnsembleSampler::new(target.clone(), StretchMove::default(), start(4, 9))
            .unwrap()
            .set_seed(11)
            .run(30)
            .unwrap();
        let with_bar = EnsembleSampler::new(target, StretchMove::default(), start(4, 9))
            .unwrap()
            .set_seed(11)
            .run_progress(30)
            .unwrap();
        assert_eq!(plain, with_bar);
    }

    #[test]
    fn resuming_continues_from_the_stored_positions() {
        let target = Gauss1D {
            mean: 0.0,
            std: 1.0,
        };
        let mut store = MemoryStore::new(4, 1);
        let walk = GaussianWalk::new(vec![0.5]).unwrap();
        let mut first = EnsembleSampler::new(target.clone(), walk.clone(), start(4, 5))
            .unwrap()
            .set_seed(1);
        first.run_into(20, &mut store).unwrap();

        let resumed_from = store.last_positions().unwrap();
        assert_eq!(resumed_from, first.walkers.positions);
        let mut second = EnsembleSampler::new(target, walk, resumed_from)
            .unwrap()
            .set_seed(2);
        second.run_into(10, &mut store).unwrap();
        assert_eq!(store.iteration(), 30);
    }

    #[test]
    fn too_few_walkers_fail_at_setup() {
        let target = Gauss1D {
            mean: 0.0,
            std: 1.0,
        };
        let result = EnsembleSampler::new(target, StretchMove::default(), Array2::zeros((1, 1)));
        assert!(matches!(
            result,
            Err(Error::Config(ConfigError::TooFewWalkers { .. }))
        ));
    }

    #[test]
    fn target_failures_abort_the_run() {
        let mut sampler = EnsembleSampler::new(
            Cliff { limit: 5.0 },
            StretchMove::default(),
            start(8, 4),
        )
        .unwrap()
        .set_seed(4);
        // The density grows with x, so walkers drift into the failing region.
        let result = sampler.run(10_000);
        assert!(matches!(result, Err(Error::Model(_))));
    }

    #[test]
    fn read_only_store_stops_the_run() {
        let target = Gauss1D {
            mean: 0.0,
            std: 1.0,
        };
        let mut store = MemoryStore::from_chain(&Array3::zeros((1, 4, 1)), true);
        let mut sampler =
            EnsembleSampler::new(target, StretchMove::default(), start(4, 6)).unwrap();
        assert!(matches!(
            sampler.run_into(5, &mut store),
            Err(Error::Store(_))
        ));
    }
}
