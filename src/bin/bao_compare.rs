//! Prints the FDPR BAO distance predictions next to the observed low-z and
//! high-z data sets.

use fdpr_mcmc::bao::{chi_square, compare, compare_tabulated, HIGH_Z, HIGH_Z_TABULATED, LOW_Z};
use fdpr_mcmc::model::{BaoDistanceModel, FdprConstants};
use std::error::Error;

/// Baseline damping for optical photons, in Mpc^-1.
const ALPHA: f64 = 2e-5;

fn main() -> Result<(), Box<dyn Error>> {
    let model = BaoDistanceModel::new(FdprConstants::default())?;

    println!("BAO Numerical Comparison:");
    println!("Redshift z   Observed D_V (Mpc)   Predicted D_V (Mpc)");
    for row in compare(&LOW_Z, &model, ALPHA)? {
        println!(
            "{:0.2}           {:8.1}              {:8.1}",
            row.z, row.observed, row.predicted
        );
    }

    println!();
    println!("High-z BAO validation (tabulated FDPR predictions):");
    println!("Redshift z   Observed D_V (Mpc)   Predicted D_V (Mpc)   Pull");
    let rows = compare_tabulated(&HIGH_Z, &HIGH_Z_TABULATED);
    for row in &rows {
        println!(
            "{:0.3}          {:8.1}              {:8.1}          {:+.2}",
            row.z,
            row.observed,
            row.predicted,
            row.pull.unwrap_or(f64::NAN)
        );
    }
    println!("chi^2 = {:.3} for {} points", chi_square(&rows), rows.len());

    Ok(())
}
