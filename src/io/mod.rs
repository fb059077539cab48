/*!
Chain persistence.

A [`ChainStore`] receives the ensemble positions after every step and hands
the full `[step, walker, parameter]` chain back on request. [`MemoryStore`]
keeps everything in memory; [`csv::CsvStore`] (feature `csv`) writes one CSV
row per walker and step so long runs can be inspected or resumed later.
*/

use ndarray::{Array2, Array3, ArrayView2, Axis};

use crate::error::StoreError;

#[cfg(feature = "csv")]
pub mod csv;

/// An append-only store for ensemble chains.
pub trait ChainStore {
    /// Appends one step of walker positions with shape `[walker, parameter]`.
    fn append(&mut self, step: ArrayView2<f64>) -> Result<(), StoreError>;

    /// Returns the whole chain with shape `[step, walker, parameter]`.
    fn get_chain(&mut self) -> Result<Array3<f64>, StoreError>;

    /// Number of steps stored so far.
    fn iteration(&self) -> usize;

    fn is_read_only(&self) -> bool;

    /// Flushes pending data; further appends fail with [`StoreError::Closed`].
    fn close(&mut self) -> Result<(), StoreError>;

    /// Walker positions of the most recent step, used to resume sampling.
    fn last_positions(&mut self) -> Result<Array2<f64>, StoreError> {
        let chain = self.get_chain()?;
        let n_steps = chain.len_of(Axis(0));
        if n_steps == 0 {
            return Err(StoreError::Empty);
        }
        Ok(chain.index_axis(Axis(0), n_steps - 1).to_owned())
    }
}

/// Checks a step against the store's walker count and dimension. A zero in
/// `shape` is unknown and adopts the step's extent.
pub(crate) fn check_shape(
    shape: &mut (usize, usize),
    step: &ArrayView2<f64>,
) -> Result<(), StoreError> {
    let got = (step.nrows(), step.ncols());
    if shape.0 == 0 {
        shape.0 = got.0;
    }
    if shape.1 == 0 {
        shape.1 = got.1;
    }
    if got != *shape {
        return Err(StoreError::ShapeMismatch {
            expected: *shape,
            got,
        });
    }
    Ok(())
}

/**
In-memory chain store.

# Examples

```rust
use fdpr_mcmc::io::{ChainStore, MemoryStore};
use ndarray::arr2;

let mut store = MemoryStore::new(2, 1);
store.append(arr2(&[[1.0], [2.0]]).view()).unwrap();
store.append(arr2(&[[3.0], [4.0]]).view()).unwrap();
let chain = store.get_chain().unwrap();
assert_eq!(chain.shape(), &[2, 2, 1]);
assert_eq!(chain[[1, 0, 0]], 3.0);
```
*/
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Vec<f64>,
    shape: (usize, usize),
    iteration: usize,
    read_only: bool,
    closed: bool,
}

impl MemoryStore {
    pub fn new(n_walkers: usize, n_dim: usize) -> Self {
        Self {
            shape: (n_walkers, n_dim),
            ..Self::default()
        }
    }

    /// Opens an existing chain, optionally refusing further appends.
    pub fn from_chain(chain: &Array3<f64>, read_only: bool) -> Self {
        let (n_steps, n_walkers, n_dim) = chain.dim();
        Self {
            data: chain.iter().copied().collect(),
            shape: (n_walkers, n_dim),
            iteration: n_steps,
            read_only,
            closed: false,
        }
    }
}

impl ChainStore for MemoryStore {
    fn append(&mut self, step: ArrayView2<f64>) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        if self.closed {
            return Err(StoreError::Closed);
        }
        check_shape(&mut self.shape, &step)?;
        self.data.extend(step.iter().copied());
        self.iteration += 1;
        Ok(())
    }

    fn get_chain(&mut self) -> Result<Array3<f64>, StoreError> {
        let (n_walkers, n_dim) = self.shape;
        Array3::from_shape_vec((self.iteration, n_walkers, n_dim), self.data.clone())
            .map_err(|e| StoreError::Malformed(e.to_string()))
    }

    fn iteration(&self) -> usize {
        self.iteration
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr2, arr3};

    #[test]
    fn memory_store_grows_step_by_step() {
        let mut store = MemoryStore::new(2, 2);
        assert_eq!(store.get_chain().unwrap().shape(), &[0, 2, 2]);
        store.append(arr2(&[[1.0, 2.0], [3.0, 4.0]]).view()).unwrap();
        store.append(arr2(&[[5.0, 6.0], [7.0, 8.0]]).view()).unwrap();
        assert_eq!(store.iteration(), 2);
        assert_eq!(
            store.get_chain().unwrap(),
            arr3(&[[[1.0, 2.0], [3.0, 4.0]], [[5.0, 6.0], [7.0, 8.0]]])
        );
        assert_eq!(
            store.last_positions().unwrap(),
            arr2(&[[5.0, 6.0], [7.0, 8.0]])
        );
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let mut store = MemoryStore::new(2, 2);
        let err = store.append(arr2(&[[1.0, 2.0, 3.0]]).view()).unwrap_err();
        assert!(matches!(
            err,
            StoreError::ShapeMismatch {
                expected: (2, 2),
                got: (1, 3)
            }
        ));
    }

    #[test]
    fn read_only_and_closed_stores_refuse_appends() {
        let chain = arr3(&[[[1.0], [2.0]]]);
        let mut ro = MemoryStore::from_chain(&chain, true);
        assert!(ro.is_read_only());
        assert!(matches!(
            ro.append(arr2(&[[0.0], [0.0]]).view()),
            Err(StoreError::ReadOnly)
        ));
        assert_eq!(ro.get_chain().unwrap(), chain);

        let mut rw = MemoryStore::from_chain(&chain, false);
        rw.close().unwrap();
        assert!(matches!(
            rw.append(arr2(&[[0.0], [0.0]]).view()),
            Err(StoreError::Closed)
        ));
    }

    #[test]
    fn empty_store_has_no_last_positions() {
        let mut store = MemoryStore::new(4, 2);
        assert!(matches!(store.last_positions(), Err(StoreError::Empty)));
    }
}
