// src/engine/mod.rs

pub mod account;
pub mod config;
pub mod error;
pub mod events;
pub mod exposure;
pub mod metrics;
pub mod position;
pub mod prepare_inputs;
pub mod signal;
pub mod simulate;
pub mod sweep;

#[cfg(feature = "python")]
pub mod bindings;

pub use crate::engine::{
    account::OpenExposure,
    config::{MarginMode, SimulationConfig, TargetRules},
    error::{BacktestError, Result},
    events::{CloseReason, ClosedTrade, Event},
    exposure::EquitySnapshot,
    metrics::{compute_summary_metrics, SummaryMetrics},
    position::{Leg, Position, Settlement},
    signal::{Side, Signal},
    simulate::{run_simulation, SimulationResult},
    sweep::run_sweep,
};
