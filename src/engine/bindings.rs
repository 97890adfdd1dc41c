// src/engine/bindings.rs

use ndarray::ArrayView1;
use numpy::PyArray1;
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use crate::engine::{
    account::{self, OpenExposure},
    config::{MarginMode, SimulationConfig},
    error::BacktestError,
    events::{ClosedTrade, Event},
    metrics::{compute_summary_metrics, SideMetrics},
    signal::{Side, Signal},
    simulate::run_simulation as run,
};

impl From<BacktestError> for PyErr {
    fn from(err: BacktestError) -> PyErr {
        if err.is_invalid_state() {
            PyRuntimeError::new_err(err.to_string())
        } else {
            PyValueError::new_err(err.to_string())
        }
    }
}

fn side_from_flag(is_long: bool) -> Side {
    if is_long { Side::Long } else { Side::Short }
}

fn event_to_dict<'py>(py: Python<'py>, event: &Event) -> PyResult<&'py PyDict> {
    let d = PyDict::new(py);
    d.set_item("type",  event.kind())?;
    d.set_item("side",  event.side().as_str())?;
    d.set_item("price", event.price())?;
    d.set_item("bar",   event.bar())?;
    match event {
        Event::Open { volume, .. } => {
            d.set_item("volume", *volume)?;
        }
        Event::Avg { new_volume, avg_count, .. } => {
            d.set_item("new_volume", *new_volume)?;
            d.set_item("avg_count",  *avg_count)?;
        }
        Event::Close { profit, commission, reason, .. } => {
            d.set_item("profit",     *profit)?;
            d.set_item("commission", *commission)?;
            d.set_item("reason",     reason.as_str())?;
        }
    }
    Ok(d)
}

fn trade_to_dict<'py>(py: Python<'py>, t: &ClosedTrade) -> PyResult<&'py PyDict> {
    let d = PyDict::new(py);
    d.set_item("side",        t.side.as_str())?;
    d.set_item("entry_bar",   t.entry_bar)?;
    d.set_item("exit_bar",    t.exit_bar)?;
    d.set_item("entry_price", t.entry_price)?;
    d.set_item("avg_price",   t.avg_price)?;
    d.set_item("exit_price",  t.exit_price)?;
    d.set_item("volume",      t.volume)?;
    d.set_item("avg_count",   t.avg_count)?;
    d.set_item("profit",      t.profit)?;
    d.set_item("commission",  t.commission)?;
    d.set_item("reason",      t.reason.as_str())?;
    Ok(d)
}

fn side_metrics_to_dict<'py>(py: Python<'py>, sm: &SideMetrics) -> PyResult<&'py PyDict> {
    let tm = &sm.trade_metrics;
    let d = PyDict::new(py);
    d.set_item("total_pnl",            sm.total_pnl)?;
    d.set_item("number_of_trades",     tm.number_of_trades)?;
    d.set_item("win_rate",             tm.win_rate)?;
    d.set_item("loss_rate",            tm.loss_rate)?;
    d.set_item("average_trade_return", tm.average_trade_return)?;
    d.set_item("average_trade_pnl",    tm.average_trade_pnl)?;
    d.set_item("profit_factor",        tm.profit_factor)?;
    d.set_item("expectancy",           tm.expectancy)?;
    d.set_item("average_duration",     tm.average_duration)?;
    Ok(d)
}

#[pyfunction]
#[pyo3(signature=(
    prices, signals,
    initial_balance=1000.0, risk_per_trade=1.0, leverage=10.0, commission_rate=0.1,
    margin_type="Cross",
    use_sl=false, use_tp=false, sl_percent=1.0, tp_percent=2.0,
    use_averaging=true, avg_distance_percent=5.0, martingale_multiplier=2.0, max_avg_count=3,
    min_notional=1.0, record_events=false
))]
#[allow(clippy::too_many_arguments)]
pub fn run_simulation(
    py: Python<'_>,
    prices:                &PyArray1<f64>,
    signals:               Vec<Option<String>>,
    initial_balance:       f64,
    risk_per_trade:        f64,
    leverage:              f64,
    commission_rate:       f64,
    margin_type:           &str,
    use_sl:                bool,
    use_tp:                bool,
    sl_percent:            f64,
    tp_percent:            f64,
    use_averaging:         bool,
    avg_distance_percent:  f64,
    martingale_multiplier: f64,
    max_avg_count:         u32,
    min_notional:          f64,
    record_events:         bool,
) -> PyResult<PyObject> {
    // 1) Pull into Rust
    let view: ArrayView1<f64> = unsafe { prices.as_array() };
    let prices  = view.to_vec();
    let signals = Signal::from_tags(&signals)?;

    let config = SimulationConfig {
        initial_balance,
        risk_per_trade_pct:     risk_per_trade,
        leverage,
        commission_rate_pct:    commission_rate,
        margin_mode:            MarginMode::from_label(margin_type),
        use_stop_loss:          use_sl,
        use_take_profit:        use_tp,
        stop_loss_pct:          sl_percent,
        take_profit_pct:        tp_percent,
        use_averaging,
        averaging_distance_pct: avg_distance_percent,
        martingale_multiplier,
        max_averaging_count:    max_avg_count,
        min_notional,
        record_events,
    };

    // 2) Simulate without holding the GIL
    let result  = py.allow_threads(|| run(&prices, &signals, &config))?;
    let summary = compute_summary_metrics(config.initial_balance, &result);

    // 3) Marshal Python output
    let out = PyDict::new(py);
    out.set_item("final_balance",    result.final_balance)?;
    out.set_item("total_profit",     result.total_profit)?;
    out.set_item("total_commission", result.total_commission)?;
    out.set_item("wins",             result.wins)?;
    out.set_item("losses",           result.losses)?;
    out.set_item("trades",           result.trades)?;
    out.set_item("open_side",        result.open_side.map(Side::as_str))?;

    match &result.events {
        Some(events) => {
            let py_events = PyList::empty(py);
            for event in events {
                py_events.append(event_to_dict(py, event)?)?;
            }
            out.set_item("events", py_events)?;
        }
        None => out.set_item("events", py.None())?,
    }

    let py_trades = PyList::empty(py);
    for trade in &result.closed_trades {
        py_trades.append(trade_to_dict(py, trade)?)?;
    }
    out.set_item("trades_closed", py_trades)?;

    let py_equity = PyList::new(py, result.equity_curve.iter().map(|s| s.total_equity));
    out.set_item("equity_curve", py_equity)?;

    let pm = PyDict::new(py);
    pm.set_item("total_return",  summary.total_return)?;
    pm.set_item("max_drawdown",  summary.time_metrics.max_drawdown)?;
    pm.set_item("sharpe_ratio",  summary.time_metrics.sharpe_ratio)?;
    pm.set_item("overall", side_metrics_to_dict(py, &summary.overall)?)?;
    pm.set_item("long",    side_metrics_to_dict(py, &summary.longs)?)?;
    pm.set_item("short",   side_metrics_to_dict(py, &summary.shorts)?)?;
    out.set_item("metrics", pm)?;

    Ok(out.into())
}

#[pyfunction]
pub fn calculate_average_price(prices: Vec<Option<f64>>, volumes: Vec<f64>) -> Option<f64> {
    account::average_price(&prices, &volumes)
}

#[pyfunction]
pub fn calculate_position_volume(entry_price: f64, current_balance: f64, risk_per_trade: f64, leverage: f64) -> PyResult<f64> {
    Ok(account::position_volume(entry_price, current_balance, risk_per_trade, leverage)?)
}

#[pyfunction]
pub fn calculate_commission(trade_vol: f64, price: f64, commission_rate: f64) -> PyResult<f64> {
    Ok(account::commission(trade_vol, price, commission_rate)?)
}

#[pyfunction]
#[allow(clippy::too_many_arguments)]
pub fn check_sufficient_funds(
    trade_vol:             f64,
    price:                 f64,
    current_balance:       f64,
    long_total_volume:     f64,
    short_total_volume:    f64,
    long_position_active:  bool,
    long_entry_price:      f64,
    short_position_active: bool,
    short_entry_price:     f64,
    leverage:              f64,
) -> PyResult<bool> {
    if leverage <= 0.0 {
        return Err(BacktestError::InvalidArgument("leverage must be > 0").into());
    }
    let long  = OpenExposure::when_active(long_position_active, long_total_volume, long_entry_price);
    let short = OpenExposure::when_active(short_position_active, short_total_volume, short_entry_price);
    Ok(account::sufficient_funds(trade_vol, price, current_balance, long, short, leverage))
}

#[pyfunction]
#[pyo3(signature=(entry_price, is_long, leverage, margin_type="Cross"))]
pub fn calculate_liquidation_price(entry_price: f64, is_long: bool, leverage: f64, margin_type: &str) -> PyResult<f64> {
    let mode = MarginMode::from_label(margin_type);
    Ok(account::liquidation_price(entry_price, side_from_flag(is_long), leverage, mode)?)
}

#[pyfunction]
pub fn calculate_pnl(entry_price: f64, exit_price: f64, trade_vol: f64, is_long: bool, commission_rate: f64) -> PyResult<f64> {
    Ok(account::realized_pnl(entry_price, exit_price, trade_vol, side_from_flag(is_long), commission_rate)?)
}
