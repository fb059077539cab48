/*!
BAO volume-distance data sets and their comparison with the FDPR prediction.

Two tabulated data sets ship with the crate:

- [`LOW_Z`]: five volume distances out to `z = 1.48`, quoted without
  uncertainties.
- [`HIGH_Z`]: three distances with 1-sigma uncertainties, used to validate
  the model.

# Examples

```rust
use fdpr_mcmc::bao::{chi_square, compare, HIGH_Z};
use fdpr_mcmc::model::BaoDistanceModel;

let rows = compare(&HIGH_Z, &BaoDistanceModel::default(), 2e-5).unwrap();
assert_eq!(rows.len(), 3);
assert!(chi_square(&rows) > 0.0);
```
*/

use crate::distributions::Observation;
use crate::error::{ConfigError, ModelError};
use crate::model::{BaoDistanceModel, Model};

/// One measured volume distance `D_V(z)` in Mpc.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaoPoint {
    pub z: f64,
    pub d_v: f64,
    /// 1-sigma uncertainty in Mpc, when quoted.
    pub sigma: Option<f64>,
}

impl BaoPoint {
    pub const fn new(z: f64, d_v: f64, sigma: Option<f64>) -> Self {
        Self { z, d_v, sigma }
    }

    /// The point as a likelihood term. Points without an uncertainty cannot be
    /// fitted.
    pub fn to_observation(&self, index: usize) -> Result<Observation, ConfigError> {
        match self.sigma {
            Some(sigma) => Ok(Observation::new(self.z, self.d_v, sigma)),
            None => Err(ConfigError::InvalidSigma {
                index,
                sigma: f64::NAN,
            }),
        }
    }
}

pub const LOW_Z: [BaoPoint; 5] = [
    BaoPoint::new(0.15, 664.0, None),
    BaoPoint::new(0.38, 1476.0, None),
    BaoPoint::new(0.51, 2005.0, None),
    BaoPoint::new(0.61, 2240.0, None),
    BaoPoint::new(1.48, 3840.0, None),
];

pub const HIGH_Z: [BaoPoint; 3] = [
    BaoPoint::new(0.38, 1476.0, Some(20.0)),
    BaoPoint::new(0.51, 2005.0, Some(35.0)),
    BaoPoint::new(0.61, 2240.0, Some(60.0)),
];

/// Published FDPR predictions for the [`HIGH_Z`] redshifts, in Mpc.
pub const HIGH_Z_TABULATED: [f64; 3] = [1469.0, 1998.0, 2258.0];

/// Converts points into observations, failing on the first point without an
/// uncertainty.
pub fn observations(points: &[BaoPoint]) -> Result<Vec<Observation>, ConfigError> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| p.to_observation(i))
        .collect()
}

/// Observed against predicted distance at one redshift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComparisonRow {
    pub z: f64,
    pub observed: f64,
    pub predicted: f64,
    /// `observed - predicted`.
    pub residual: f64,
    /// `residual / sigma`, when the point has an uncertainty.
    pub pull: Option<f64>,
}

/// Evaluates `model` at every point for damping coefficient `alpha`.
pub fn compare(
    points: &[BaoPoint],
    model: &BaoDistanceModel,
    alpha: f64,
) -> Result<Vec<ComparisonRow>, ModelError> {
    points
        .iter()
        .map(|p| {
            let predicted = model.predict(&[alpha], p.z)?;
            let residual = p.d_v - predicted;
            Ok(ComparisonRow {
                z: p.z,
                observed: p.d_v,
                predicted,
                residual,
                pull: p.sigma.map(|s| residual / s),
            })
        })
        .collect()
}

/// Rows built from externally tabulated predictions instead of the model.
pub fn compare_tabulated(points: &[BaoPoint], predicted: &[f64]) -> Vec<ComparisonRow> {
    points
        .iter()
        .zip(predicted)
        .map(|(p, &predicted)| {
            let residual = p.d_v - predicted;
            ComparisonRow {
                z: p.z,
                observed: p.d_v,
                predicted,
                residual,
                pull: p.sigma.map(|s| residual / s),
            }
        })
        .collect()
}

/// Sum of squared pulls over the rows that have one.
pub fn chi_square(rows: &[ComparisonRow]) -> f64 {
    rows.iter().filter_map(|r| r.pull).map(|p| p * p).sum()
}
