// src/engine/events.rs

use serde::{Deserialize, Serialize};

use crate::engine::signal::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    #[serde(rename = "TP")]
    TakeProfit,
    #[serde(rename = "SL")]
    StopLoss,
    #[serde(rename = "LIQ")]
    Liquidation,
}

impl CloseReason {
    pub fn as_str(self) -> &'static str {
        match self {
            CloseReason::TakeProfit  => "TP",
            CloseReason::StopLoss    => "SL",
            CloseReason::Liquidation => "LIQ",
        }
    }
}

/// One mutating action of the simulation, serialized as `{"type": "open" | "avg" | "close", ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Event {
    Open {
        side:   Side,
        price:  f64,
        bar:    usize,
        volume: f64,
    },
    Avg {
        side:       Side,
        price:      f64,
        bar:        usize,
        new_volume: f64,  // volume of the added leg
        avg_count:  u32,
    },
    Close {
        side:       Side,
        price:      f64,
        bar:        usize,
        profit:     f64,
        commission: f64,
        reason:     CloseReason,
    },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::Open { .. }  => "open",
            Event::Avg { .. }   => "avg",
            Event::Close { .. } => "close",
        }
    }

    pub fn side(&self) -> Side {
        match self {
            Event::Open { side, .. } | Event::Avg { side, .. } | Event::Close { side, .. } => *side,
        }
    }

    pub fn bar(&self) -> usize {
        match self {
            Event::Open { bar, .. } | Event::Avg { bar, .. } | Event::Close { bar, .. } => *bar,
        }
    }

    pub fn price(&self) -> f64 {
        match self {
            Event::Open { price, .. } | Event::Avg { price, .. } | Event::Close { price, .. } => *price,
        }
    }
}

/// A round trip reconstructed by the simulation at close time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClosedTrade {
    pub side:        Side,
    pub entry_bar:   usize,
    pub exit_bar:    usize,
    pub entry_price: f64,   // opening leg
    pub avg_price:   f64,   // cost basis at exit
    pub exit_price:  f64,
    pub volume:      f64,
    pub avg_count:   u32,   // averaging legs added before the close
    pub profit:      f64,   // net of commission
    pub commission:  f64,
    pub reason:      CloseReason,
}

impl ClosedTrade {
    pub fn is_win(&self) -> bool {
        self.profit >= 0.0
    }

    /// Duration in bars.
    pub fn bars_held(&self) -> usize {
        self.exit_bar.saturating_sub(self.entry_bar)
    }

    /// Net P&L over the notional at the cost basis.
    pub fn return_on_notional(&self) -> f64 {
        let notional = self.avg_price * self.volume;
        if notional != 0.0 { self.profit / notional } else { 0.0 }
    }
}
