/*!
Affine-invariant stretch move (Goodman & Weare, 2010).

The ensemble is split at random into two halves. Every walker `x_k` of the
active half picks a partner `x_j` from the other half and proposes

```text
y = x_j + z * (x_k - x_j),   z ~ g(z) ∝ 1/sqrt(z) on [1/a, a]
```

accepting with probability `min(1, z^(d-1) p(y) / p(x_k))`. The two halves
are updated in turn, so each proposal only depends on walkers that stay fixed
during its half-step. All log-densities of a half are evaluated in one batch.
*/

use ndarray::Array2;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::{evaluate_batch, EnsembleMove, Walkers};
use crate::distributions::Target;
use crate::error::{ConfigError, ModelError};

/// The stretch move with scale parameter `a`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchMove {
    pub a: f64,
}

impl Default for StretchMove {
    fn default() -> Self {
        Self { a: 2.0 }
    }
}

impl StretchMove {
    pub fn new(a: f64) -> Result<Self, ConfigError> {
        if !(a.is_finite() && a > 1.0) {
            return Err(ConfigError::InvalidStretchScale(a));
        }
        Ok(Self { a })
    }

    /// Draws `z` from `g(z) ∝ 1/sqrt(z)` on `[1/a, a]` by inversion.
    fn draw_z(&self, rng: &mut SmallRng) -> f64 {
        let u: f64 = rng.gen();
        ((self.a - 1.0) * u + 1.0).powi(2) / self.a
    }
}

impl EnsembleMove for StretchMove {
    fn validate(&self, n_walkers: usize, n_dim: usize) -> Result<(), ConfigError> {
        if !(self.a.is_finite() && self.a > 1.0) {
            return Err(ConfigError::InvalidStretchScale(self.a));
        }
        let required = 2 * n_dim;
        if n_walkers < required {
            return Err(ConfigError::TooFewWalkers {
                n_walkers,
                n_dim,
                required,
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

        let mut split: Vec<usize> = (0..n_walkers).map(|i| i % 2).collect();
        split.shuffle(rng);

        let mut accepted = vec![false; n_walkers];
        for half in 0..2 {
            let active: Vec<usize> = (0..n_walkers).filter(|&i| split[i] == half).collect();
            let partners: Vec<usize> = (0..n_walkers).filter(|&i| split[i] != half).collect();

            let mut proposals = Array2::<f64>::zeros((active.len(), n_dim));
            let mut log_z = Vec::with_capacity(active.len());
            for (row, &k) in active.iter().enumerate() {
                let z = self.draw_z(rng);
                let j = partners[rng.gen_range(0..partners.len())];
                let (xk, xj) = (walkers.position(k), walkers.position(j));
                for d in 0..n_dim {
                    proposals[[row, d]] = xj[d] - (xj[d] - xk[d]) * z;
                }
                log_z.push(z.ln());
            }

            let new_lps = evaluate_batch(target, proposals.view())?;

            for (row, &k) in active.iter().enumerate() {
                let ln_ratio =
                    (n_dim as f64 - 1.0) * log_z[row] + new_lps[row] - walkers.log_probs[k];
                let u: f64 = rng.gen();
                // NaN (both states rejected by the target) never accepts.
                if ln_ratio > u.ln() {
                    walkers.accept(k, proposals.row(row), new_lps[row]);
                    accepted[k] = true;
                }
            }
        }
        Ok(accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::init_jitter;
    use ndarray::Axis;
    use rand::SeedableRng;

    /// Axis-aligned Gaussian with very different scales per coordinate.
    struct Anisotropic;

    impl Target for Anisotropic {
        fn unnorm_log_prob(&self, theta: &[f64]) -> Result<f64, ModelError> {
            let a = (theta[0] - 2e-5) / 1e-6;
            let b = (theta[1] - 5.0) / 2.0;
            Ok(-0.5 * (a * a + b * b))
        }
    }

    #[test]
    fn draws_stay_inside_the_stretch_interval() {
        let mv = StretchMove::default();
        let mut rng = SmallRng::seed_from_u64(3);
        for _ in 0..10_000 {
            let z = mv.draw_z(&mut rng);
            assert!((0.5..=2.0).contains(&z), "z={z}");
        }
    }

    #[test]
    fn rejects_small_ensembles_and_bad_scales() {
        assert_eq!(
            StretchMove::default().validate(3, 2),
            Err(ConfigError::TooFewWalkers {
                n_walkers: 3,
                n_dim: 2,
                required: 4
            })
        );
        assert!(StretchMove::default().validate(4, 2).is_ok());
        assert_eq!(
            StretchMove::new(1.0),
            Err(ConfigError::InvalidStretchScale(1.0))
        );
    }

    #[test]
    fn ensemble_recovers_anisotropic_gaussian() {
        let mut rng = SmallRng::seed_from_u64(42);
        let start = init_jitter(&[2.5e-5, 4.0], 1e-7, 32, &mut rng);
        let mut walkers = Walkers::new(start, &Anisotropic).unwrap();
        let mv = StretchMove::default();

        let mut sums = [0.0, 0.0];
        let mut count = 0.0;
        let mut n_accepted = 0usize;
        for step in 0..3_000 {
            let acc = mv
                .propose_and_accept(&mut walkers, &Anisotropic, &mut rng)
                .unwrap();
            n_accepted += acc.iter().filter(|&&a| a).count();
            if step >= 1_000 {
                let mean = walkers.positions.mean_axis(Axis(0)).unwrap();
                sums[0] += mean[0];
                sums[1] += mean[1];
                count += 1.0;
            }
        }
        assert!((sums[0] / count - 2e-5).abs() < 2e-7);
        assert!((sums[1] / count - 5.0).abs() < 0.4);

        let rate = n_accepted as f64 / (3_000.0 * 32.0);
        assert!(rate > 0.2 && rate < 0.9, "acceptance rate {rate}");
    }

    #[test]
    fn walkers_rejected_by_the_target_are_pulled_back() {
        struct Box01;
        impl Target for Box01 {
            fn unnorm_log_prob(&self, theta: &[f64]) -> Result<f64, ModelError> {
                if theta.iter().all(|&x| x > 0.0 && x <= 1.0) {
                    Ok(0.0)
                } else {
                    Ok(f64::NEG_INFINITY)
                }
            }
        }
        let mut rng = SmallRng::seed_from_u64(5);
        let mut start = init_jitter(&[0.5], 0.1, 8, &mut rng);
        start[[0, 0]] = -0.5;
        let mut walkers = Walkers::new(start, &Box01).unwrap();
        assert_eq!(walkers.log_probs[0], f64::NEG_INFINITY);
        for _ in 0..200 {
            StretchMove::default()
                .propose_and_accept(&mut walkers, &Box01, &mut rng)
                .unwrap();
        }
        assert!(walkers.log_probs.iter().all(|lp| *lp == 0.0));
    }
}
