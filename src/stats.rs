//! Posterior summaries computed from a stored chain.

use ndarray::{s, Array1, Array2, Array3, ArrayView1, Axis};
use ndarray_stats::interpolate::Linear;
use ndarray_stats::{Quantile1dExt, QuantileExt};
use noisy_float::types::{n64, N64};

use crate::error::{ConfigError, Error, ModelError, Result};

/// Lower and upper quantiles of the reported 68 % credible interval.
pub const CREDIBLE_INTERVAL: (f64, f64) = (0.16, 0.84);

/**
Drops the first `burn_in` steps, keeps every `thin`-th remaining step, and
stacks the walkers into a `[sample, parameter]` array (step-major).

Fails with [`Error::NoSamples`] when nothing survives the burn-in.

# Examples

```rust
use fdpr_mcmc::stats::flatten;
use ndarray::Array3;

let chain = Array3::<f64>::zeros((100, 8, 2));
assert_eq!(flatten(&chain, 20, 10).unwrap().shape(), &[64, 2]);
assert_eq!(flatten(&chain, 99, 1).unwrap().shape(), &[8, 2]);
assert!(flatten(&chain, 100, 1).is_err());
```
*/
pub fn flatten(chain: &Array3<f64>, burn_in: usize, thin: usize) -> Result<Array2<f64>> {
    if thin == 0 {
        return Err(ConfigError::ZeroThin.into());
    }
    let (n_steps, n_walkers, n_dim) = chain.dim();
    if burn_in >= n_steps || n_walkers == 0 {
        return Err(Error::NoSamples { burn_in, n_steps });
    }
    let kept = chain.slice(s![burn_in..;thin, .., ..]);
    let n_kept = kept.len_of(Axis(0));
    Ok(Array2::from_shape_fn(
        (n_kept * n_walkers, n_dim),
        |(i, d)| kept[[i / n_walkers, i % n_walkers, d]],
    ))
}

/// Copies `samples` into noisy floats so they can be ordered.
fn to_noisy(samples: ArrayView1<f64>) -> Option<Array1<N64>> {
    samples.iter().map(|&x| N64::try_new(x)).collect()
}

/**
Quantile `q` of `samples` with linear interpolation between order statistics
(numpy's default).

# Examples

```rust
use fdpr_mcmc::stats::quantile;
use ndarray::arr1;

let x = arr1(&[5.0, 1.0, 4.0, 2.0, 3.0]);
assert_eq!(quantile(x.view(), 0.5).unwrap(), 3.0);
assert!((quantile(x.view(), 0.16).unwrap() - 1.64).abs() < 1e-12);
```
*/
pub fn quantile(samples: ArrayView1<f64>, q: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&q) {
        return Err(ConfigError::InvalidQuantile(q).into());
    }
    let mut noisy = to_noisy(samples).ok_or(Error::NanSample { index: 0 })?;
    Ok(noisy.quantile_mut(n64(q), &Linear)?.raw())
}

/// Median of `samples`.
pub fn median(samples: ArrayView1<f64>) -> Result<f64> {
    quantile(samples, 0.5)
}

/// Marginal summary of one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSummary {
    pub median: f64,
    /// 16th percentile.
    pub lower: f64,
    /// 84th percentile.
    pub upper: f64,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl ParamSummary {
    fn from_samples(index: usize, samples: ArrayView1<f64>) -> Result<Self> {
        let mut noisy = to_noisy(samples).ok_or(Error::NanSample { index })?;
        let mut at = |q: f64| noisy.quantile_mut(n64(q), &Linear).map(N64::raw);
        Ok(Self {
            median: at(0.5)?,
            lower: at(CREDIBLE_INTERVAL.0)?,
            upper: at(CREDIBLE_INTERVAL.1)?,
            mean: samples.mean().unwrap_or(f64::NAN),
            std: samples.std(0.0),
            min: *samples.min_skipnan(),
            max: *samples.max_skipnan(),
        })
    }

    /// Distance from the median down to the 16th percentile.
    pub fn minus(&self) -> f64 {
        self.median - self.lower
    }

    /// Distance from the median up to the 84th percentile.
    pub fn plus(&self) -> f64 {
        self.upper - self.median
    }
}

/// Summary of a flattened posterior sample set.
#[derive(Debug, Clone, PartialEq)]
pub struct PosteriorSummary {
    pub n_samples: usize,
    pub params: Vec<ParamSummary>,
    /// Per-parameter median vector.
    pub median: Array1<f64>,
    /// Derived quantity evaluated at `median`.
    pub derived: f64,
}

/// Per-parameter marginals of a `[sample, parameter]` array.
pub fn describe(flat: &Array2<f64>) -> Result<Vec<ParamSummary>> {
    flat.axis_iter(Axis(1))
        .enumerate()
        .map(|(index, samples)| ParamSummary::from_samples(index, samples))
        .collect()
}

/**
Flattens `chain` (see [`flatten`]), computes per-parameter medians and
credible intervals, and evaluates `derive` at the median vector.
*/
pub fn summarize<F>(
    chain: &Array3<f64>,
    burn_in: usize,
    thin: usize,
    derive: F,
) -> Result<PosteriorSummary>
where
    F: Fn(&[f64]) -> std::result::Result<f64, ModelError>,
{
    let flat = flatten(chain, burn_in, thin)?;
    let params = describe(&flat)?;
    let median: Array1<f64> = params.iter().map(|p| p.median).collect();
    let derived = derive(&median.to_vec())?;
    Ok(PosteriorSummary {
        n_samples: flat.nrows(),
        params,
        median,
        derived,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, Array3};

    /// chain[step, walker, 0] = step * 10 + walker, chain[.., .., 1] = -that.
    fn indexed_chain(n_steps: usize, n_walkers: usize) -> Array3<f64> {
        Array3::from_shape_fn((n_steps, n_walkers, 2), |(s, w, d)| {
            let v = (s * 10 + w) as f64;
            if d == 0 {
                v
            } else {
                -v
            }
        })
    }

    #[test]
    fn flatten_discards_burn_in_and_thins_by_step() {
        let chain = indexed_chain(10, 3);
        let flat = flatten(&chain, 4, 3).unwrap();
        // Steps 4 and 7 survive, three walkers each.
        assert_eq!(
            flat.column(0).to_vec(),
            vec![40.0, 41.0, 42.0, 70.0, 71.0, 72.0]
        );
        assert_eq!(flat.column(1)[4], -71.0);
    }

    #[test]
    fn last_step_yields_one_sample_per_walker() {
        let chain = indexed_chain(10, 5);
        let flat = flatten(&chain, 9, 1).unwrap();
        assert_eq!(flat.nrows(), 5);
        let flat = flatten(&chain, 9, 4).unwrap();
        assert_eq!(flat.nrows(), 5);
    }

    #[test]
    fn no_samples_is_an_error() {
        let chain = indexed_chain(10, 5);
        for burn_in in [10, 11, 1_000] {
            assert!(matches!(
                flatten(&chain, burn_in, 1),
                Err(Error::NoSamples { n_steps: 10, .. })
            ));
        }
        assert!(matches!(
            flatten(&chain, 0, 0),
            Err(Error::Config(ConfigError::ZeroThin))
        ));
    }

    #[test]
    fn quantiles_interpolate_linearly() {
        let x = arr1(&[3.0, 1.0, 5.0, 2.0, 4.0]);
        assert_eq!(quantile(x.view(), 0.0).unwrap(), 1.0);
        assert_eq!(quantile(x.view(), 1.0).unwrap(), 5.0);
        assert_eq!(quantile(x.view(), 0.5).unwrap(), 3.0);
        assert_abs_diff_eq!(quantile(x.view(), 0.16).unwrap(), 1.64, epsilon = 1e-12);
        assert_abs_diff_eq!(quantile(x.view(), 0.84).unwrap(), 4.36, epsilon = 1e-12);
        assert_eq!(median(arr1(&[4.0, 1.0, 3.0, 2.0]).view()).unwrap(), 2.5);
        assert_eq!(median(arr1(&[7.0]).view()).unwrap(), 7.0);
    }

    #[test]
    fn degenerate_quantile_inputs_are_errors() {
        let empty = Array1::<f64>::zeros(0);
        assert!(matches!(
            quantile(empty.view(), 0.5),
            Err(Error::Quantile(_))
        ));
        let x = arr1(&[1.0, f64::NAN]);
        assert!(matches!(
            median(x.view()),
            Err(Error::NanSample { .. })
        ));
        assert!(matches!(
            quantile(arr1(&[1.0]).view(), 1.5),
            Err(Error::Config(ConfigError::InvalidQuantile(_)))
        ));
    }

    #[test]
    fn summary_reports_medians_and_derived_value() {
        let chain = indexed_chain(10, 3);
        let summary = summarize(&chain, 0, 1, |theta| Ok(theta[0] - theta[1])).unwrap();
        assert_eq!(summary.n_samples, 30);
        let col: Array1<f64> = chain.slice(s![.., .., 0]).iter().copied().collect();
        let m = median(col.view()).unwrap();
        assert_eq!(summary.median, arr1(&[m, -m]));
        assert_eq!(summary.derived, 2.0 * m);
        assert_eq!(summary.params[0].min, 0.0);
        assert_eq!(summary.params[0].max, 92.0);
        assert!(summary.params[0].minus() > 0.0 && summary.params[0].plus() > 0.0);
    }

    #[test]
    fn derived_quantity_errors_propagate() {
        let chain = indexed_chain(4, 2);
        let result = summarize(&chain, 0, 1, |theta| {
            Err(ModelError::Domain {
                quantity: "test",
                theta: theta.to_vec(),
            })
        });
        assert!(matches!(result, Err(Error::Model(_))));
    }
}
