//! Reads a stored (alpha0, E_c) chain and prints the 16/50/84 percentiles of
//! each parameter.
//!
//! Usage: `summarize_chain [path]` (default `fdpr_chain.csv`).

use fdpr_mcmc::error::ConfigError;
use fdpr_mcmc::io::csv::CsvStore;
use fdpr_mcmc::io::ChainStore;
use fdpr_mcmc::model::{HubbleModel, Model};
use fdpr_mcmc::stats;
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "fdpr_chain.csv".to_string());

    let mut store = CsvStore::open(&path, true)?;
    let chain = store.get_chain()?;
    let (n_steps, n_walkers, n_dim) = chain.dim();
    let burn_in = 800.min(n_steps / 2);

    let model = HubbleModel::default();
    if n_dim != model.n_params() {
        return Err(ConfigError::DimensionMismatch {
            what: "chain parameters",
            expected: model.n_params(),
            got: n_dim,
        }
        .into());
    }
    let summary = stats::summarize(&chain, burn_in, 1, |theta| model.derived(theta))?;

    println!(
        "{}: {} steps x {} walkers, burn-in {}, {} samples",
        path, n_steps, n_walkers, burn_in, summary.n_samples
    );
    for (name, p) in model.param_names().iter().zip(&summary.params) {
        println!(
            "{:<16} = {:.2e} (-{:.2e} / +{:.2e})",
            name,
            p.median,
            p.minus(),
            p.plus()
        );
    }
    println!("H0_eff at median = {:.2} km/s/Mpc", summary.derived);

    Ok(())
}
