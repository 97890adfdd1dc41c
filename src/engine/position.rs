// src/engine/position.rs

use crate::engine::account::{self, OpenExposure};
use crate::engine::config::TargetRules;
use crate::engine::error::{BacktestError, Result};
use crate::engine::signal::Side;

/// One contribution to the cost basis: the open, or an averaging fill.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Leg {
    pub price:  Option<f64>,  // None never comes from the engine, only from callers
    pub volume: f64,
}

/// What a close hands back to the account.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Settlement {
    pub profit:     f64,  // net of commission
    pub commission: f64,
    pub volume:     f64,  // total volume that was closed
    pub avg_price:  f64,  // cost basis it was closed against
}

/// Ledger for one side of the book.
///
/// Active exactly while it holds legs. Every leg is appended by `open` or
/// `add_average`, and `close` empties the ledger again so the same instance
/// can be reopened from scratch.
#[derive(Clone, Debug)]
pub struct Position {
    side:              Side,
    legs:              Vec<Leg>,
    avg_count:         u32,
    total_volume:      f64,
    stop_loss_price:   Option<f64>,
    take_profit_price: Option<f64>,
}

impl Position {
    pub fn new(side: Side) -> Self {
        Position {
            side,
            legs:              Vec::new(),
            avg_count:         0,
            total_volume:      0.0,
            stop_loss_price:   None,
            take_profit_price: None,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn is_active(&self) -> bool {
        !self.legs.is_empty()
    }

    pub fn legs(&self) -> &[Leg] {
        &self.legs
    }

    pub fn avg_count(&self) -> u32 {
        self.avg_count
    }

    pub fn total_volume(&self) -> f64 {
        self.total_volume
    }

    pub fn stop_loss_price(&self) -> Option<f64> {
        self.stop_loss_price
    }

    pub fn take_profit_price(&self) -> Option<f64> {
        self.take_profit_price
    }

    /// Price of the opening leg.
    pub fn entry_price(&self) -> Option<f64> {
        self.legs.first().and_then(|leg| leg.price)
    }

    pub fn avg_price(&self) -> Option<f64> {
        account::weighted_average(self.legs.iter().map(|leg| (leg.price, leg.volume)))
    }

    /// Margin footprint for `account::sufficient_funds`; None while flat.
    pub fn exposure(&self) -> Option<OpenExposure> {
        if !self.is_active() {
            return None;
        }
        Some(OpenExposure {
            volume:      self.total_volume,
            entry_price: self.entry_price().unwrap_or(0.0),
        })
    }

    pub fn open(&mut self, price: f64, volume: f64, rules: TargetRules) -> Result<()> {
        if self.is_active() {
            return Err(BacktestError::PositionAlreadyActive(self.side));
        }
        if price <= 0.0 || volume <= 0.0 {
            return Err(BacktestError::InvalidArgument("entry price and volume must be > 0"));
        }

        self.legs.push(Leg { price: Some(price), volume });
        self.avg_count    = 0;
        self.total_volume = volume;
        self.place_targets(price, rules);
        Ok(())
    }

    /// Recompute stop and target from the current average price.
    pub fn update_targets(&mut self, rules: TargetRules) {
        if let Some(avg) = self.avg_price() {
            self.place_targets(avg, rules);
        }
    }

    fn place_targets(&mut self, basis: f64, rules: TargetRules) {
        let dir = self.side.direction();
        self.stop_loss_price = rules
            .use_stop_loss
            .then(|| basis * (1.0 - dir * rules.stop_loss_pct / 100.0));
        self.take_profit_price = rules
            .use_take_profit
            .then(|| basis * (1.0 + dir * rules.take_profit_pct / 100.0));
    }

    /// Price at which the next averaging leg would be added.
    pub fn next_avg_price(&self, distance_pct: f64) -> Option<f64> {
        let avg = self.avg_price()?;
        Some(avg * (1.0 - self.side.direction() * distance_pct / 100.0))
    }

    /// Only adverse moves trigger averaging.
    pub fn should_average(&self, price: f64, distance_pct: f64) -> bool {
        self.next_avg_price(distance_pct)
            .map_or(false, |level| self.side.reached_stop(price, level))
    }

    /// Append a leg of `total_volume × multiplier`; returns that leg's volume.
    ///
    /// Margin must be checked before and targets refreshed after, by the caller.
    pub fn add_average(&mut self, price: f64, multiplier: f64) -> Result<f64> {
        if !self.is_active() {
            return Err(BacktestError::PositionNotActive(self.side));
        }
        if multiplier <= 0.0 {
            return Err(BacktestError::InvalidArgument("martingale multiplier must be > 0"));
        }

        let new_volume = self.total_volume * multiplier;
        self.legs.push(Leg { price: Some(price), volume: new_volume });
        self.avg_count    += 1;
        self.total_volume += new_volume;
        Ok(new_volume)
    }

    pub fn close(&mut self, exit_price: f64, commission_rate_pct: f64) -> Result<Settlement> {
        if !self.is_active() {
            return Err(BacktestError::PositionNotActive(self.side));
        }
        let avg_price = self
            .avg_price()
            .ok_or(BacktestError::InvalidArgument("position has no priced legs"))?;

        let volume     = self.total_volume;
        let profit     = account::realized_pnl(avg_price, exit_price, volume, self.side, commission_rate_pct)?;
        let commission = account::commission(volume, exit_price, commission_rate_pct)?;

        self.legs.clear();
        self.avg_count         = 0;
        self.total_volume      = 0.0;
        self.stop_loss_price   = None;
        self.take_profit_price = None;

        Ok(Settlement { profit, commission, volume, avg_price })
    }
}
