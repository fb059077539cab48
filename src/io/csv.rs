/*!
# CSV chain store

Chains are stored as one row per step and walker:

```text
step,walker,dim_0,dim_1,...
0,0,2.7e-5,1.1
0,1,...
```

Values are written with Rust's shortest round-trip float formatting, so a
chain read back is bit-identical to the one written. Enable via the `csv`
feature.
*/

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use ::csv::{Reader, Writer, WriterBuilder};
use ndarray::{Array3, ArrayView2, Axis};

use super::{check_shape, ChainStore};
use crate::error::StoreError;

/**
A [`ChainStore`] backed by a CSV file.

# Examples

```rust
use fdpr_mcmc::io::csv::CsvStore;
use fdpr_mcmc::io::ChainStore;
use ndarray::arr2;

let path = std::env::temp_dir().join("fdpr_doc_chain.csv");
let mut store = CsvStore::create(&path, 2, 1)?;
store.append(arr2(&[[0.5], [1.5]]).view())?;
store.close()?;

let mut reopened = CsvStore::open(&path, true)?;
assert_eq!(reopened.iteration(), 1);
assert_eq!(reopened.get_chain()?[[0, 1, 0]], 1.5);
# Ok::<(), fdpr_mcmc::error::StoreError>(())
```
*/
pub struct CsvStore {
    path: PathBuf,
    writer: Option<Writer<File>>,
    shape: (usize, usize),
    iteration: usize,
    read_only: bool,
    closed: bool,
}

impl CsvStore {
    /// Creates (or truncates) `path` and writes the header.
    pub fn create<P: AsRef<Path>>(
        path: P,
        n_walkers: usize,
        n_dim: usize,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let mut wtr = Writer::from_writer(File::create(&path)?);

        let mut header: Vec<String> = vec!["step".to_string(), "walker".to_string()];
        header.extend((0..n_dim).map(|i| format!("dim_{}", i)));
        wtr.write_record(&header)?;
        wtr.flush()?;

        Ok(Self {
            path,
            writer: Some(wtr),
            shape: (n_walkers, n_dim),
            iteration: 0,
            read_only: false,
            closed: false,
        })
    }

    /// Opens an existing chain file, recovering its shape from the contents.
    pub fn open<P: AsRef<Path>>(path: P, read_only: bool) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let (shape, iteration) = scan(&path)?;

        let writer = if read_only {
            None
        } else {
            let file = OpenOptions::new().append(true).open(&path)?;
            Some(WriterBuilder::new().has_headers(false).from_writer(file))
        };

        Ok(Self {
            path,
            writer,
            shape,
            iteration,
            read_only,
            closed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Reads the header and row indices to find `(n_walkers, n_dim)` and the
/// number of complete steps.
fn scan(path: &Path) -> Result<((usize, usize), usize), StoreError> {
    let mut rdr = Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();
    if headers.len() < 2 || &headers[0] != "step" || &headers[1] != "walker" {
        return Err(StoreError::Malformed(format!(
            "unexpected header {:?}",
            headers.iter().collect::<Vec<_>>()
        )));
    }
    let n_dim = headers.len() - 2;

    let mut n_rows = 0usize;
    let mut max_walker = None;
    for record in rdr.records() {
        let record = record?;
        let walker: usize = parse_field(&record, 1)?;
        max_walker = Some(max_walker.map_or(walker, |m: usize| m.max(walker)));
        n_rows += 1;
    }
    let n_walkers = max_walker.map_or(0, |m| m + 1);
    if n_walkers > 0 && n_rows % n_walkers != 0 {
        return Err(StoreError::Malformed(format!(
            "{n_rows} rows do not form complete steps of {n_walkers} walkers"
        )));
    }
    let iteration = if n_walkers == 0 { 0 } else { n_rows / n_walkers };
    Ok(((n_walkers, n_dim), iteration))
}

fn parse_field<T: std::str::FromStr>(
    record: &::csv::StringRecord,
    i: usize,
) -> Result<T, StoreError> {
    record
        .get(i)
        .and_then(|s| s.trim().parse().ok())
        .ok_or_else(|| {
            StoreError::Malformed(format!(
                "cannot parse column {i} of row {:?}",
                record.iter().collect::<Vec<_>>()
            ))
        })
}

impl ChainStore for CsvStore {
    fn append(&mut self, step: ArrayView2<f64>) -> Result<(), StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        if self.closed {
            return Err(StoreError::Closed);
        }
        check_shape(&mut self.shape, &step)?;
        let wtr = self.writer.as_mut().ok_or(StoreError::Closed)?;

        for (walker_idx, position) in step.axis_iter(Axis(0)).enumerate() {
            let mut row = vec![self.iteration.to_string(), walker_idx.to_string()];
            row.extend(position.iter().map(|v| v.to_string()));
            wtr.write_record(&row)?;
        }
        wtr.flush()?;
        self.iteration += 1;
        Ok(())
    }

    fn get_chain(&mut self) -> Result<Array3<f64>, StoreError> {
        if let Some(wtr) = self.writer.as_mut() {
            wtr.flush()?;
        }
        let (n_walkers, n_dim) = self.shape;
        let mut chain = Array3::<f64>::zeros((self.iteration, n_walkers, n_dim));

        let mut rdr = Reader::from_path(&self.path)?;
        let mut n_rows = 0usize;
        for record in rdr.records() {
            let record = record?;
            if record.len() != n_dim + 2 {
                return Err(StoreError::Malformed(format!(
                    "row has {} columns, expected {}",
                    record.len(),
                    n_dim + 2
                )));
            }
            let step: usize = parse_field(&record, 0)?;
            let walker: usize = parse_field(&record, 1)?;
            if step >= self.iteration || walker >= n_walkers {
                return Err(StoreError::Malformed(format!(
                    "row index (step {step}, walker {walker}) outside chain of {} steps",
                    self.iteration
                )));
            }
            for d in 0..n_dim {
                chain[[step, walker, d]] = parse_field(&record, d + 2)?;
            }
            n_rows += 1;
        }
        if n_rows != self.iteration * n_walkers {
            return Err(StoreError::Malformed(format!(
                "expected {} rows, found {n_rows}",
                self.iteration * n_walkers
            )));
        }
        Ok(chain)
    }

    fn iteration(&self) -> usize {
        self.iteration
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn close(&mut self) -> Result<(), StoreError> {
        if let Some(mut wtr) = self.writer.take() {
            wtr.flush()?;
        }
        self.closed = true;
        Ok(())
    }
}
