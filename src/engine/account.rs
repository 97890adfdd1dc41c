// src/engine/account.rs

//! Stateless account arithmetic: sizing, fees, liquidation and margin.
//!
//! Percentages are passed as percent (1.0 == 1 %), never as fractions.

use crate::engine::config::MarginMode;
use crate::engine::error::{BacktestError, Result};
use crate::engine::signal::Side;

/// Volume and opening price of a live position, as seen by the margin check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenExposure {
    pub volume:      f64,
    pub entry_price: f64,
}

impl OpenExposure {
    /// Exposure of a side described by flat fields; `None` when it is not active.
    pub fn when_active(active: bool, volume: f64, entry_price: f64) -> Option<Self> {
        active.then_some(OpenExposure { volume, entry_price })
    }
}

/// Volume‐weighted mean over the pairs that carry a price.
///
/// `None` when no pair has a price or the priced volume is not positive.
pub fn average_price(prices: &[Option<f64>], volumes: &[f64]) -> Option<f64> {
    weighted_average(prices.iter().copied().zip(volumes.iter().copied()))
}

pub(crate) fn weighted_average<I>(legs: I) -> Option<f64>
where
    I: IntoIterator<Item = (Option<f64>, f64)>,
{
    let (value, volume) = legs
        .into_iter()
        .filter_map(|(price, volume)| price.map(|p| (p * volume, volume)))
        .fold((0.0, 0.0), |(tv, tq), (v, q)| (tv + v, tq + q));

    if volume > 0.0 {
        Some(value / volume)
    } else {
        None
    }
}

/// Units to buy: risk budget, capped by what the leverage allows.
pub fn position_volume(entry_price: f64, balance: f64, risk_pct: f64, leverage: f64) -> Result<f64> {
    if entry_price <= 0.0 {
        return Err(BacktestError::InvalidArgument("entry_price must be > 0"));
    }
    if balance < 0.0 || risk_pct < 0.0 || leverage <= 0.0 {
        return Err(BacktestError::InvalidArgument(
            "balance and risk must be non-negative and leverage > 0",
        ));
    }

    let risk_volume = balance * (risk_pct / 100.0) / entry_price;
    let max_volume  = balance * leverage / entry_price;
    Ok(risk_volume.min(max_volume))
}

pub fn commission(volume: f64, price: f64, rate_pct: f64) -> Result<f64> {
    if volume < 0.0 || price < 0.0 || rate_pct < 0.0 {
        return Err(BacktestError::InvalidArgument(
            "volume, price and commission rate must be non-negative",
        ));
    }
    Ok(volume * price * (rate_pct / 100.0))
}

pub fn liquidation_price(entry_price: f64, side: Side, leverage: f64, margin_mode: MarginMode) -> Result<f64> {
    if entry_price <= 0.0 || leverage <= 0.0 {
        return Err(BacktestError::InvalidArgument("entry_price and leverage must be > 0"));
    }

    let distance = margin_mode.liquidation_factor() / leverage;
    Ok(match side {
        Side::Long  => entry_price * (1.0 - distance),
        Side::Short => entry_price * (1.0 + distance),
    })
}

/// Can the free margin carry `trade_volume` more units at `price`?
///
/// Used margin counts only the sides passed in, i.e. the active ones.
/// `leverage` must be positive; the config guarantees it.
pub fn sufficient_funds(
    trade_volume: f64,
    price: f64,
    balance: f64,
    long: Option<OpenExposure>,
    short: Option<OpenExposure>,
    leverage: f64,
) -> bool {
    let required_margin = trade_volume * price / leverage;

    let used_notional: f64 = [long, short]
        .iter()
        .flatten()
        .map(|e| e.volume * e.entry_price)
        .sum();
    let free_margin = balance - used_notional / leverage;

    required_margin <= free_margin
}

/// Directional P&L net of the exit commission.
pub fn realized_pnl(
    entry_price: f64,
    exit_price: f64,
    volume: f64,
    side: Side,
    commission_rate_pct: f64,
) -> Result<f64> {
    if volume < 0.0 {
        return Err(BacktestError::InvalidArgument("volume must be non-negative"));
    }
    let gross = (exit_price - entry_price) * volume * side.direction();
    let fee   = commission(volume, exit_price, commission_rate_pct)?;
    Ok(gross - fee)
}
