/*!
Closed-form FDPR (frequency-dependent photon redshift damping) model.

The damping coefficient of a photon of energy `E` follows a Planck-like
saturation curve normalized to a reference energy `E_ref`:

```text
alpha(E) = alpha0 * (1 - exp(-E / E_c)) / (1 - exp(-E_ref / E_c))
```

Two observables are built on top of it:

- the effective local Hubble constant `H0_eff = H_true + c * alpha(E)`,
- the BAO volume distance `D_V(z) = (c / H0) * ln(1 + z + alpha * z^2)`.

All physical constants live in [`FdprConstants`] and are passed explicitly.

# Examples

```rust
use fdpr_mcmc::model::{HubbleModel, Model};

let model = HubbleModel::default();
// At the reference energy alpha(E_ref) == alpha0, so H0_eff = 67 + 3e5 * 2e-5.
let h0 = model.derived(&[2e-5, 1.1]).unwrap();
assert!((h0 - 73.0).abs() < 1e-9);
```
*/

use ndarray::Array1;
use num_traits::Float;

use crate::error::{ConfigError, ModelError};

/// Physical constants of the FDPR model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FdprConstants {
    /// Speed of light in km/s.
    pub speed_of_light: f64,
    /// CMB-based Hubble constant in km/s/Mpc.
    pub h_true: f64,
    /// Reference (optical) photon energy in eV.
    pub e_ref: f64,
    /// Hubble distance c/H0 in Mpc.
    pub hubble_distance: f64,
}

impl Default for FdprConstants {
    fn default() -> Self {
        Self {
            speed_of_light: 3e5,
            h_true: 67.0,
            e_ref: 2.0,
            hubble_distance: 4477.61,
        }
    }
}

impl FdprConstants {
    /// Checks that every constant is positive and finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let named = [
            ("speed_of_light", self.speed_of_light),
            ("h_true", self.h_true),
            ("e_ref", self.e_ref),
            ("hubble_distance", self.hubble_distance),
        ];
        for (name, value) in named {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::InvalidConstant { name, value });
            }
        }
        Ok(())
    }
}

/// Energy-dependent damping coefficient `alpha(E)`.
///
/// Returns `None` when `e_c` is not positive or when the normalizing
/// denominator `1 - exp(-e_ref / e_c)` vanishes.
pub fn damping_coefficient<T: Float>(energy: T, alpha0: T, e_ref: T, e_c: T) -> Option<T> {
    if !(e_c > T::zero()) {
        return None;
    }
    let numerator = T::one() - (-energy / e_c).exp();
    let denominator = T::one() - (-e_ref / e_c).exp();
    if denominator == T::zero() || !denominator.is_finite() {
        return None;
    }
    Some(alpha0 * (numerator / denominator))
}

/// BAO volume-averaged distance `D_V(z)` in the units of `hubble_distance`.
///
/// Returns `None` when the logarithm's argument is not positive.
pub fn bao_distance<T: Float>(z: T, alpha: T, hubble_distance: T) -> Option<T> {
    let arg = T::one() + z + alpha * z * z;
    if !(arg > T::zero()) {
        return None;
    }
    Some(hubble_distance * arg.ln())
}

/// A parametric model the posterior estimator can fit.
///
/// `predict` maps a parameter vector and an observation covariate (photon
/// energy, redshift, ...) to the predicted measurement. `derived` is the
/// physical quantity reported alongside the posterior median.
pub trait Model {
    /// Number of free parameters.
    fn n_params(&self) -> usize;

    /// Human-readable parameter labels, in parameter order.
    fn param_names(&self) -> Vec<&'static str>;

    /// Predicted measurement at covariate `x`.
    fn predict(&self, theta: &[f64], x: f64) -> Result<f64, ModelError>;

    /// Derived quantity reported for a parameter vector.
    fn derived(&self, theta: &[f64]) -> Result<f64, ModelError>;

    /// Evaluates [`Model::predict`] for every covariate in `xs`.
    fn predict_batch(&self, theta: &[f64], xs: &Array1<f64>) -> Result<Array1<f64>, ModelError> {
        xs.iter()
            .map(|&x| self.predict(theta, x))
            .collect::<Result<Vec<_>, _>>()
            .map(Array1::from)
    }
}

fn check_dim(theta: &[f64], expected: usize) -> Result<(), ModelError> {
    if theta.len() == expected {
        Ok(())
    } else {
        Err(ModelError::WrongDimension {
            expected,
            got: theta.len(),
        })
    }
}

fn finite(value: f64, theta: &[f64]) -> Result<f64, ModelError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ModelError::NonFinite {
            value,
            theta: theta.to_vec(),
        })
    }
}

/**
Effective Hubble constant as a function of photon energy.

Parameters are `theta = [alpha0, E_c]` with `alpha0` in Mpc^-1 and `E_c` in eV.
An observation's covariate is the photon energy (eV) at which H0 was measured.
*/
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HubbleModel {
    pub constants: FdprConstants,
}

impl HubbleModel {
    pub fn new(constants: FdprConstants) -> Result<Self, ConfigError> {
        constants.validate()?;
        Ok(Self { constants })
    }

    /// `H0_eff` at photon energy `energy`, or `None` outside the formula's domain.
    pub fn h0_eff(&self, alpha0: f64, e_c: f64, energy: f64) -> Option<f64> {
        let c = &self.constants;
        damping_coefficient(energy, alpha0, c.e_ref, e_c).map(|a| c.h_true + c.speed_of_light * a)
    }
}

impl Model for HubbleModel {
    fn n_params(&self) -> usize {
        2
    }

    fn param_names(&self) -> Vec<&'static str> {
        vec!["alpha0 [Mpc^-1]", "E_c [eV]"]
    }

    fn predict(&self, theta: &[f64], x: f64) -> Result<f64, ModelError> {
        check_dim(theta, 2)?;
        let value = self
            .h0_eff(theta[0], theta[1], x)
            .ok_or_else(|| ModelError::Domain {
                quantity: "damping coefficient alpha(E)",
                theta: theta.to_vec(),
            })?;
        finite(value, theta)
    }

    fn derived(&self, theta: &[f64]) -> Result<f64, ModelError> {
        self.predict(theta, self.constants.e_ref)
    }
}

/**
BAO volume distance with a single energy-independent damping coefficient.

Parameters are `theta = [alpha]` in Mpc^-1; an observation's covariate is the
redshift `z`.
*/
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BaoDistanceModel {
    pub constants: FdprConstants,
}

impl BaoDistanceModel {
    pub fn new(constants: FdprConstants) -> Result<Self, ConfigError> {
        constants.validate()?;
        Ok(Self { constants })
    }

    /// `D_V(z)` in Mpc, or `None` outside the formula's domain.
    pub fn distance(&self, z: f64, alpha: f64) -> Option<f64> {
        bao_distance(z, alpha, self.constants.hubble_distance)
    }
}

impl Model for BaoDistanceModel {
    fn n_params(&self) -> usize {
        1
    }

    fn param_names(&self) -> Vec<&'static str> {
        vec!["alpha [Mpc^-1]"]
    }

    fn predict(&self, theta: &[f64], x: f64) -> Result<f64, ModelError> {
        check_dim(theta, 1)?;
        let value = self
            .distance(x, theta[0])
            .ok_or_else(|| ModelError::Domain {
                quantity: "BAO distance D_V(z)",
                theta: theta.to_vec(),
            })?;
        finite(value, theta)
    }

    /// Local Hubble constant implied by `alpha`: `H_true + c * alpha`.
    fn derived(&self, theta: &[f64]) -> Result<f64, ModelError> {
        check_dim(theta, 1)?;
        let c = &self.constants;
        finite(c.h_true + c.speed_of_light * theta[0], theta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr1;

    #[test]
    fn damping_at_reference_energy_is_alpha0() {
        for e_c in [1e-3, 0.5, 1.1, 7.0, 1e3] {
            let a = damping_coefficient(2.0, 2.7e-5, 2.0, e_c).unwrap();
            assert_eq!(a, 2.7e-5, "alpha(E_ref) differs from alpha0 for E_c={e_c}");
        }
    }

    #[test]
    fn damping_saturates_with_energy() {
        let low = damping_coefficient(0.5, 1e-5, 2.0, 1.0).unwrap();
        let high = damping_coefficient(20.0, 1e-5, 2.0, 1.0).unwrap();
        assert!(low < 1e-5 && high > 1e-5);
        let limit = 1e-5 / (1.0 - (-2.0f64).exp());
        assert_abs_diff_eq!(high, limit, epsilon = 1e-12);
    }

    #[test]
    fn damping_rejects_degenerate_scales() {
        assert!(damping_coefficient(2.0, 1e-5, 2.0, 0.0).is_none());
        assert!(damping_coefficient(2.0, 1e-5, 2.0, -1.0).is_none());
        // exp(-2e-20) rounds to 1, so the normalization vanishes.
        assert!(damping_coefficient(2.0, 1e-5, 2.0, 1e20).is_none());
    }

    #[test]
    fn damping_is_generic_over_float() {
        let a = damping_coefficient(2.0f32, 3e-5, 2.0, 1.1).unwrap();
        assert_eq!(a, 3e-5f32);
    }

    #[test]
    fn h0_eff_without_damping_is_h_true() {
        let model = HubbleModel::default();
        assert_eq!(model.derived(&[0.0, 4.0]).unwrap(), 67.0);
        assert_abs_diff_eq!(model.derived(&[2e-5, 4.0]).unwrap(), 73.0, epsilon = 1e-9);
    }

    #[test]
    fn hubble_model_reports_domain_errors() {
        let model = HubbleModel::default();
        let err = model.predict(&[1e-5, 1e20], 2.0).unwrap_err();
        assert!(matches!(err, ModelError::Domain { .. }));
    }

    #[test]
    fn invalid_constants_are_rejected() {
        let constants = FdprConstants {
            e_ref: 0.0,
            ..FdprConstants::default()
        };
        assert_eq!(
            HubbleModel::new(constants),
            Err(ConfigError::InvalidConstant {
                name: "e_ref",
                value: 0.0
            })
        );
    }

    #[test]
    fn bao_distance_batch_matches_published_values() {
        let model = BaoDistanceModel::default();
        let z = arr1(&[0.15, 0.38, 0.51, 0.61, 1.48]);
        let predicted = model.predict_batch(&[2e-5], &z).unwrap();
        let expected = arr1(&[625.8, 1442.2, 1845.3, 2132.4, 4066.9]);
        assert_abs_diff_eq!(predicted, expected, epsilon = 1.0);
    }

    #[test]
    fn bao_distance_rejects_non_positive_log_argument() {
        let model = BaoDistanceModel::default();
        assert!(matches!(
            model.predict(&[-10.0], 1.0),
            Err(ModelError::Domain { .. })
        ));
    }

    #[test]
    fn parameter_vectors_of_the_wrong_length_are_errors() {
        let hubble = HubbleModel::default();
        assert_eq!(
            hubble.predict(&[2e-5], 2.0),
            Err(ModelError::WrongDimension {
                expected: 2,
                got: 1
            })
        );
        assert!(matches!(
            hubble.derived(&[2e-5, 1.1, 0.0]),
            Err(ModelError::WrongDimension { got: 3, .. })
        ));

        let bao = BaoDistanceModel::default();
        assert!(matches!(
            bao.predict(&[], 0.38),
            Err(ModelError::WrongDimension { expected: 1, got: 0 })
        ));
        assert!(matches!(
            bao.derived(&[2e-5, 1.1]),
            Err(ModelError::WrongDimension { expected: 1, got: 2 })
        ));
    }
}
