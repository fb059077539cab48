/*!
# Random-walk Metropolis–Hastings for walker ensembles

[`GaussianWalk`] treats every walker as an independent Metropolis–Hastings
chain. Each walker proposes

```text
x' = x + s ⊙ ε,   ε ~ N(0, I)
```

with one step scale `s_d` per parameter, and accepts with probability
`min(1, p(x') / p(x))`. It is a drop-in alternative to the
[`StretchMove`](crate::stretch::StretchMove) behind the same
[`EnsembleMove`] interface.

## Example Usage

```rust
use fdpr_mcmc::core::EnsembleMove;
use fdpr_mcmc::metropolis_hastings::GaussianWalk;

let walk = GaussianWalk::new(vec![1e-6, 0.5]).unwrap();
assert!(walk.validate(8, 2).is_ok());
assert!(walk.validate(8, 3).is_err());
```
*/

use ndarray::Array2;
use rand::rngs::SmallRng;
use rand::Rng;
use rand_distr::StandardNormal;

use crate::core::{evaluate_batch, EnsembleMove, Walkers};
use crate::distributions::Target;
use crate::error::{ConfigError, ModelError};

/// Independent Gaussian random-walk proposals with per-parameter scales.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianWalk {
    pub scales: Vec<f64>,
}

impl GaussianWalk {
    pub fn new(scales: Vec<f64>) -> Result<Self, ConfigError> {
        let walk = Self { scales };
        walk.check_scales()?;
        Ok(walk)
    }

    fn check_scales(&self) -> Result<(), ConfigError> {
        if self.scales.is_empty() {
            return Err(ConfigError::NoDimensions);
        }
        for (index, &scale) in self.scales.iter().enumerate() {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(ConfigError::InvalidStepScale { index, scale });
            }
        }
        Ok(())
    }

    /// Log-density of the proposal `to` given `from`, up to a constant.
    ///
    /// Symmetric in its arguments, so the Hastings correction vanishes.
    pub fn log_prob(&self, from: &[f64], to: &[f64]) -> f64 {
        from.iter()
            .zip(to)
            .zip(&self.scales)
            .map(|((&f, &t), &s)| {
                let r = (t - f) / s;
                -0.5 * r * r
            })
            .sum()
    }
}

impl EnsembleMove for GaussianWalk {
    fn validate(&self, _n_walkers: usize, n_dim: usize) -> Result<(), ConfigError> {
        self.check_scales()?;
        if self.scales.len() != n_dim {
            return Err(ConfigError::DimensionMismatch {
                what: "step scales",
                expected: n_dim,
                got: self.scales.len(),
            });
        }
        Ok(())
    }

    fn propose_and_accept<D: Target + Sync>(
        &self,
        walkers: &mut Walkers,
        target: &D,
        rng: &mut SmallRng,
    ) -> Result<Vec<bool>, ModelError> {
        let n_walkers = walkers.n_walkers();
        let n_dim = walkers.n_dim();

        let mut proposals = Array2::<f64>::zeros((n_walkers, n_dim));
        for k in 0..n_walkers {
            for d in 0..n_dim {
                let eps: f64 = rng.sample(StandardNormal);
                proposals[[k, d]] = walkers.positions[[k, d]] + self.scales[d] * eps;
            }
        }

        let new_lps = evaluate_batch(target, proposals.view())?;

        let mut accepted = vec![false; n_walkers];
        for k in 0..n_walkers {
            let log_accept_ratio = new_lps[k] - walkers.log_probs[k];
            let u: f64 = rng.gen();
            if log_accept_ratio > u.ln() {
                walkers.accept(k, proposals.row(k), new_lps[k]);
                accepted[k] = true;
            }
        }
        Ok(accepted)
    }
}
