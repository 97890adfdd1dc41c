// src/engine/simulate.rs

use serde::Serialize;
use tracing::{debug, info};

use crate::engine::account;
use crate::engine::config::SimulationConfig;
use crate::engine::error::Result;
use crate::engine::events::{CloseReason, ClosedTrade, Event};
use crate::engine::exposure::{self, EquitySnapshot};
use crate::engine::position::Position;
use crate::engine::prepare_inputs::prepare_inputs;
use crate::engine::signal::{Side, Signal};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub final_balance:    f64,
    pub total_profit:     f64,             // net of commission
    pub total_commission: f64,
    pub wins:             usize,
    pub losses:           usize,
    pub trades:           usize,           // positions opened
    pub events:           Option<Vec<Event>>,  // Some only with record_events
    pub closed_trades:    Vec<ClosedTrade>,
    pub equity_curve:     Vec<EquitySnapshot>,
    pub open_side:        Option<Side>,    // still holding at the last bar
}

/// Run one pass over the bars.
///
/// Inputs and config are validated up front, so an `Err` means nothing ran.
pub fn run_simulation(prices: &[f64], signals: &[Signal], config: &SimulationConfig) -> Result<SimulationResult> {
    let n = prepare_inputs(prices, signals)?;
    config.validate()?;
    run_validated(prices, signals, config, n)
}

pub(crate) fn run_validated(
    prices: &[f64],
    signals: &[Signal],
    config: &SimulationConfig,
    n: usize,
) -> Result<SimulationResult> {
    info!(
        bars = n,
        initial_balance = config.initial_balance,
        leverage = config.leverage,
        "starting simulation"
    );

    let mut sim = Simulator::new(config, n);
    for (bar, (&price, &signal)) in prices.iter().zip(signals).enumerate() {
        sim.step(bar, price, signal)?;
    }
    let result = sim.finish();

    info!(
        trades = result.trades,
        wins = result.wins,
        losses = result.losses,
        final_balance = result.final_balance,
        "simulation finished"
    );
    Ok(result)
}

/// Both sides of the book plus the shared account for one pass.
struct Simulator<'a> {
    config:           &'a SimulationConfig,
    long:             Position,
    short:            Position,
    entry_bars:       [usize; 2],  // bar each side was last opened on
    balance:          f64,
    total_profit:     f64,
    total_commission: f64,
    wins:             usize,
    losses:           usize,
    trades:           usize,
    events:           Option<Vec<Event>>,
    closed_trades:    Vec<ClosedTrade>,
    equity_curve:     Vec<EquitySnapshot>,
}

impl<'a> Simulator<'a> {
    fn new(config: &'a SimulationConfig, bars: usize) -> Self {
        Simulator {
            config,
            long:             Position::new(Side::Long),
            short:            Position::new(Side::Short),
            entry_bars:       [0; 2],
            balance:          config.initial_balance,
            total_profit:     0.0,
            total_commission: 0.0,
            wins:             0,
            losses:           0,
            trades:           0,
            events:           config.record_events.then(Vec::new),
            closed_trades:    Vec::new(),
            equity_curve:     Vec::with_capacity(bars),
        }
    }

    fn position(&self, side: Side) -> &Position {
        match side {
            Side::Long  => &self.long,
            Side::Short => &self.short,
        }
    }

    fn position_mut(&mut self, side: Side) -> &mut Position {
        match side {
            Side::Long  => &mut self.long,
            Side::Short => &mut self.short,
        }
    }

    fn record(&mut self, event: Event) {
        if let Some(events) = self.events.as_mut() {
            events.push(event);
        }
    }

    fn funds_allow(&self, volume: f64, price: f64) -> bool {
        account::sufficient_funds(
            volume,
            price,
            self.balance,
            self.long.exposure(),
            self.short.exposure(),
            self.config.leverage,
        )
    }

    /// Open checks, averaging long then short, closes long then short.
    fn step(&mut self, bar: usize, price: f64, signal: Signal) -> Result<()> {
        if let Some(side) = signal.side() {
            self.try_open(side, bar, price)?;
        }

        self.try_average(Side::Long, bar, price)?;
        self.try_average(Side::Short, bar, price)?;

        self.try_close(Side::Long, bar, price)?;
        self.try_close(Side::Short, bar, price)?;

        self.equity_curve
            .push(exposure::snapshot(bar, price, self.balance, &self.long, &self.short));
        Ok(())
    }

    fn try_open(&mut self, side: Side, bar: usize, price: f64) -> Result<()> {
        // one side at a time
        if self.long.is_active() || self.short.is_active() {
            return Ok(());
        }

        // a blown account sizes nothing
        if self.balance <= 0.0 {
            debug!(bar, %side, price, balance = self.balance, "open rejected: no balance");
            return Ok(());
        }

        let cfg    = self.config;
        let volume = account::position_volume(price, self.balance, cfg.risk_per_trade_pct, cfg.leverage)?;
        if volume <= 0.0 || volume * price < cfg.min_notional || !self.funds_allow(volume, price) {
            debug!(bar, %side, price, volume, balance = self.balance, "open rejected");
            return Ok(());
        }

        self.position_mut(side).open(price, volume, cfg.target_rules())?;
        self.entry_bars[side as usize] = bar;
        self.trades += 1;
        debug!(bar, %side, price, volume, "opened");
        self.record(Event::Open { side, price, bar, volume });
        Ok(())
    }

    fn try_average(&mut self, side: Side, bar: usize, price: f64) -> Result<()> {
        let cfg = self.config;
        let pos = self.position(side);
        if !cfg.use_averaging
            || !pos.is_active()
            || pos.avg_count() >= cfg.max_averaging_count
            || !pos.should_average(price, cfg.averaging_distance_pct)
        {
            return Ok(());
        }

        // margin first, mutate after
        let candidate = pos.total_volume() * cfg.martingale_multiplier;
        if !self.funds_allow(candidate, price) {
            debug!(bar, %side, price, candidate, "averaging rejected: insufficient funds");
            return Ok(());
        }

        let pos = self.position_mut(side);
        let new_volume = pos.add_average(price, cfg.martingale_multiplier)?;
        pos.update_targets(cfg.target_rules());
        let avg_count = pos.avg_count();

        debug!(bar, %side, price, new_volume, avg_count, "averaged");
        self.record(Event::Avg { side, price, bar, new_volume, avg_count });
        Ok(())
    }

    fn close_reason(&self, side: Side, price: f64) -> Result<Option<CloseReason>> {
        let cfg = self.config;
        let pos = self.position(side);
        let Some(avg) = pos.avg_price() else {
            return Ok(None);
        };

        let reason = if cfg.use_take_profit
            && pos.take_profit_price().map_or(false, |tp| side.reached_target(price, tp))
        {
            Some(CloseReason::TakeProfit)
        } else if cfg.use_stop_loss
            && pos.stop_loss_price().map_or(false, |sl| side.reached_stop(price, sl))
        {
            Some(CloseReason::StopLoss)
        } else if !cfg.use_stop_loss {
            let liq = account::liquidation_price(avg, side, cfg.leverage, cfg.margin_mode)?;
            side.reached_stop(price, liq).then_some(CloseReason::Liquidation)
        } else {
            None
        };
        Ok(reason)
    }

    fn try_close(&mut self, side: Side, bar: usize, price: f64) -> Result<()> {
        if !self.position(side).is_active() {
            return Ok(());
        }
        let Some(reason) = self.close_reason(side, price)? else {
            return Ok(());
        };

        let cfg         = self.config;
        let pos         = self.position_mut(side);
        let entry_price = pos.entry_price().unwrap_or(price);
        let avg_count   = pos.avg_count();
        let settled     = pos.close(price, cfg.commission_rate_pct)?;

        self.balance          += settled.profit;
        self.total_profit     += settled.profit;
        self.total_commission += settled.commission;

        let trade = ClosedTrade {
            side,
            entry_bar:  self.entry_bars[side as usize],
            exit_bar:   bar,
            entry_price,
            avg_price:  settled.avg_price,
            exit_price: price,
            volume:     settled.volume,
            avg_count,
            profit:     settled.profit,
            commission: settled.commission,
            reason,
        };
        if trade.is_win() {
            self.wins += 1;
        } else {
            self.losses += 1;
        }

        debug!(
            bar,
            %side,
            price,
            reason = reason.as_str(),
            profit = settled.profit,
            balance = self.balance,
            "closed"
        );
        self.closed_trades.push(trade);
        self.record(Event::Close {
            side,
            price,
            bar,
            profit: settled.profit,
            commission: settled.commission,
            reason,
        });
        Ok(())
    }

    fn finish(self) -> SimulationResult {
        let open_side = if self.long.is_active() {
            Some(Side::Long)
        } else if self.short.is_active() {
            Some(Side::Short)
        } else {
            None
        };

        SimulationResult {
            final_balance:    self.balance,
            total_profit:     self.total_profit,
            total_commission: self.total_commission,
            wins:             self.wins,
            losses:           self.losses,
            trades:           self.trades,
            events:           self.events,
            closed_trades:    self.closed_trades,
            equity_curve:     self.equity_curve,
            open_side,
        }
    }
}
