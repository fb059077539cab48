//! Walker ensemble, the pluggable move interface, and ensemble initialization.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::SmallRng;
use rand::Rng;
use rand_distr::StandardNormal;
use rayon::prelude::*;

use crate::distributions::Target;
use crate::error::{ConfigError, ModelError};

/// Positions of all walkers (`[walker, parameter]`) and their cached log-densities.
#[derive(Debug, Clone, PartialEq)]
pub struct Walkers {
    pub positions: Array2<f64>,
    pub log_probs: Array1<f64>,
}

impl Walkers {
    /// Wraps `positions` and evaluates the target at every walker.
    pub fn new<D: Target + Sync>(positions: Array2<f64>, target: &D) -> Result<Self, ModelError> {
        let log_probs = evaluate_batch(target, positions.view())?;
        Ok(Self {
            positions,
            log_probs,
        })
    }

    pub fn n_walkers(&self) -> usize {
        self.positions.nrows()
    }

    pub fn n_dim(&self) -> usize {
        self.positions.ncols()
    }

    pub fn position(&self, walker: usize) -> ArrayView1<'_, f64> {
        self.positions.row(walker)
    }

    /// Replaces walker `k`'s position and cached log-density.
    pub fn accept(&mut self, k: usize, position: ArrayView1<f64>, log_prob: f64) {
        self.positions.row_mut(k).assign(&position);
        self.log_probs[k] = log_prob;
    }
}

/**
A sampling strategy that advances a whole walker ensemble by one step.

Implementations draw every random number from the supplied `rng` in a fixed
order, so a run is reproducible from its seed. Target evaluations may happen
in parallel.
*/
pub trait EnsembleMove {
    /// Checks that the move can operate on an ensemble of this shape.
    fn validate(&self, _n_walkers: usize, _n_dim: usize) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Proposes new positions, accepts or rejects them in place, and reports
    /// which walkers moved.
    fn propose_and_accept<D: Target + Sync>(
        &self,
        walkers: &mut Walkers,
        target: &D,
        rng: &mut SmallRng,
    ) -> Result<Vec<bool>, ModelError>;
}

/// Evaluates the target at each row of `positions`, fanning out over rayon.
///
/// The output order matches the row order regardless of scheduling.
pub fn evaluate_batch<D: Target + Sync>(
    target: &D,
    positions: ArrayView2<f64>,
) -> Result<Array1<f64>, ModelError> {
    let rows: Vec<Vec<f64>> = positions.axis_iter(Axis(0)).map(|r| r.to_vec()).collect();
    let lps = rows
        .par_iter()
        .map(|theta| target.unnorm_log_prob(theta))
        .collect::<Result<Vec<f64>, ModelError>>()?;
    Ok(Array1::from(lps))
}

/**
Initial ensemble: `n_walkers` copies of `guess`, each coordinate perturbed by
`jitter * N(0, 1)`.

Positions pushed outside the prior are kept as they are; the target rejects
them and the ensemble moves pull them back in.

# Examples

```rust
use fdpr_mcmc::core::init_jitter;
use rand::rngs::SmallRng;
use rand::SeedableRng;

let mut rng = SmallRng::seed_from_u64(42);
let pos = init_jitter(&[2.7e-5, 1.1], 1e-6, 32, &mut rng);
assert_eq!(pos.shape(), &[32, 2]);
```
*/
pub fn init_jitter(guess: &[f64], jitter: f64, n_walkers: usize, rng: &mut SmallRng) -> Array2<f64> {
    Array2::from_shape_fn((n_walkers, guess.len()), |(_, d)| {
        let eps: f64 = rng.sample(StandardNormal);
        guess[d] + jitter * eps
    })
}
