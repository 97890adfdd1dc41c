// src/engine/sweep.rs

use rayon::prelude::*;
use tracing::info;

use crate::engine::config::SimulationConfig;
use crate::engine::error::Result;
use crate::engine::prepare_inputs::prepare_inputs;
use crate::engine::signal::Signal;
use crate::engine::simulate::{run_validated, SimulationResult};

/// Run every config over the same bars in parallel.
///
/// Inputs are checked once and every config before any pass starts, so one
/// bad config fails the whole sweep. Results come back in `configs` order.
pub fn run_sweep(
    prices: &[f64],
    signals: &[Signal],
    configs: &[SimulationConfig],
) -> Result<Vec<SimulationResult>> {
    let n = prepare_inputs(prices, signals)?;
    for cfg in configs {
        cfg.validate()?;
    }

    info!(bars = n, configs = configs.len(), "starting sweep");
    configs
        .par_iter()
        .map(|cfg| run_validated(prices, signals, cfg, n))
        .collect()
}
