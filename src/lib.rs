pub mod bao;
pub mod config;
pub mod core;
pub mod distributions;
pub mod ensemble;
pub mod error;
pub mod estimator;
pub mod io;
pub mod metropolis_hastings;
pub mod model;
pub mod stats;
pub mod stretch;
