// src/engine/exposure.rs

use serde::Serialize;

use crate::engine::position::Position;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquitySnapshot {
    pub bar:            usize,
    pub balance:        f64,  // realized: initial balance + settled profits
    pub long_exposure:  f64,  // open long units
    pub short_exposure: f64,  // open short units
    pub floating_pnl:   f64,  // mark‐to‐close against the average price
    pub total_equity:   f64,  // balance + floating_pnl
}

/// Unrealized P&L of one position marked at `price`; zero while flat.
pub fn floating_pnl(position: &Position, price: f64) -> f64 {
    match position.avg_price() {
        Some(avg) if position.is_active() => {
            (price - avg) * position.total_volume() * position.side().direction()
        }
        _ => 0.0,
    }
}

/// Snapshot of the book at the close of `bar`, after that bar's settlements.
pub fn snapshot(bar: usize, price: f64, balance: f64, long: &Position, short: &Position) -> EquitySnapshot {
    let floating = floating_pnl(long, price) + floating_pnl(short, price);
    EquitySnapshot {
        bar,
        balance,
        long_exposure:  long.total_volume(),
        short_exposure: short.total_volume(),
        floating_pnl:   floating,
        total_equity:   balance + floating,
    }
}
