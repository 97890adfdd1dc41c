// src/lib.rs

//! Leveraged long/short backtester with martingale‐style averaging.
//!
//! Feed it closing prices and one signal per bar; it opens, averages and
//! closes a single position at a time against a shared balance and returns
//! the aggregate result. Build with the `python` feature for the extension
//! module.

pub mod engine;

pub use engine::*;

#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::wrap_pyfunction;

#[cfg(feature = "python")]
#[pymodule]
fn martingale_backtester(_py: Python<'_>, m: &PyModule) -> PyResult<()> {
    use engine::bindings;

    m.add_function(wrap_pyfunction!(bindings::run_simulation, m)?)?;
    m.add_function(wrap_pyfunction!(bindings::calculate_average_price, m)?)?;
    m.add_function(wrap_pyfunction!(bindings::calculate_position_volume, m)?)?;
    m.add_function(wrap_pyfunction!(bindings::calculate_commission, m)?)?;
    m.add_function(wrap_pyfunction!(bindings::calculate_liquidation_price, m)?)?;
    m.add_function(wrap_pyfunction!(bindings::calculate_pnl, m)?)?;
    m.add_function(wrap_pyfunction!(bindings::check_sufficient_funds, m)?)?;
    Ok(())
}
