// src/engine/config.rs

use serde::{Deserialize, Serialize};

use crate::engine::error::{BacktestError, Result};

/// Margin pool the positions draw from; only changes the liquidation distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginMode {
    #[default]
    Cross,
    Isolated,
}

impl MarginMode {
    /// Case‐insensitive: `isolated`, `iso…` and the Russian `из…` select
    /// isolated, everything else falls back to cross.
    pub fn from_label(label: &str) -> MarginMode {
        let label = label.trim().to_lowercase();
        if label.starts_with("iso") || label.starts_with("из") {
            MarginMode::Isolated
        } else {
            MarginMode::Cross
        }
    }

    /// Fraction of the margin lost before the position is liquidated.
    pub fn liquidation_factor(self) -> f64 {
        match self {
            MarginMode::Isolated => 0.9,
            MarginMode::Cross => 0.8,
        }
    }
}

/// Stop/target settings a position needs to place its exit levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetRules {
    pub use_stop_loss:   bool,
    pub use_take_profit: bool,
    pub stop_loss_pct:   f64,
    pub take_profit_pct: f64,
}

impl TargetRules {
    pub fn disabled() -> Self {
        TargetRules {
            use_stop_loss:   false,
            use_take_profit: false,
            stop_loss_pct:   0.0,
            take_profit_pct: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub initial_balance:        f64,        // account currency
    pub risk_per_trade_pct:     f64,        // % of balance committed per open
    pub leverage:               f64,
    pub commission_rate_pct:    f64,        // % of exit notional
    pub margin_mode:            MarginMode,
    pub use_stop_loss:          bool,
    pub use_take_profit:        bool,
    pub stop_loss_pct:          f64,        // distance from average price
    pub take_profit_pct:        f64,        // distance from average price
    pub use_averaging:          bool,
    pub averaging_distance_pct: f64,        // adverse move that triggers a new leg
    pub martingale_multiplier:  f64,        // new leg = total volume × multiplier
    pub max_averaging_count:    u32,
    pub min_notional:           f64,        // smallest volume × price we open
    pub record_events:          bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            initial_balance:        1000.0,
            risk_per_trade_pct:     1.0,
            leverage:               10.0,
            commission_rate_pct:    0.1,
            margin_mode:            MarginMode::Cross,
            use_stop_loss:          false,
            use_take_profit:        false,
            stop_loss_pct:          1.0,
            take_profit_pct:        2.0,
            use_averaging:          true,
            averaging_distance_pct: 5.0,
            martingale_multiplier:  2.0,
            max_averaging_count:    3,
            min_notional:           1.0,
            record_events:          false,
        }
    }
}

impl SimulationConfig {
    pub fn target_rules(&self) -> TargetRules {
        TargetRules {
            use_stop_loss:   self.use_stop_loss,
            use_take_profit: self.use_take_profit,
            stop_loss_pct:   self.stop_loss_pct,
            take_profit_pct: self.take_profit_pct,
        }
    }

    /// Reject values the account arithmetic cannot work with.
    pub fn validate(&self) -> Result<()> {
        let non_negative = [
            ("initial_balance", self.initial_balance),
            ("risk_per_trade_pct", self.risk_per_trade_pct),
            ("commission_rate_pct", self.commission_rate_pct),
            ("stop_loss_pct", self.stop_loss_pct),
            ("take_profit_pct", self.take_profit_pct),
            ("averaging_distance_pct", self.averaging_distance_pct),
            ("min_notional", self.min_notional),
        ];
        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(BacktestError::InvalidConfig { field, value });
            }
        }

        let positive = [
            ("leverage", self.leverage),
            ("martingale_multiplier", self.martingale_multiplier),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(BacktestError::InvalidConfig { field, value });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Isolated", MarginMode::Isolated ; "capitalised isolated")]
    #[test_case("ISO", MarginMode::Isolated ; "short iso")]
    #[test_case("Изолированная", MarginMode::Isolated ; "russian alias")]
    #[test_case("cross", MarginMode::Cross ; "cross")]
    #[test_case("Кросс", MarginMode::Cross ; "russian cross")]
    #[test_case("whatever", MarginMode::Cross ; "unknown falls back to cross")]
    fn margin_mode_labels(label: &str, expected: MarginMode) {
        assert_eq!(MarginMode::from_label(label), expected);
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(SimulationConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_zero_leverage() {
        let cfg = SimulationConfig { leverage: 0.0, ..Default::default() };
        assert_eq!(
            cfg.validate(),
            Err(BacktestError::InvalidConfig { field: "leverage", value: 0.0 })
        );
    }

    #[test]
    fn rejects_negative_risk() {
        let cfg = SimulationConfig { risk_per_trade_pct: -1.0, ..Default::default() };
        assert!(matches!(
            cfg.validate(),
            Err(BacktestError::InvalidConfig { field: "risk_per_trade_pct", .. })
        ));
    }

    #[test]
    fn partial_config_deserializes_with_defaults() {
        let cfg: SimulationConfig =
            serde_json::from_str(r#"{"leverage": 5.0, "margin_mode": "isolated"}"#).unwrap();
        assert_eq!(cfg.leverage, 5.0);
        assert_eq!(cfg.margin_mode, MarginMode::Isolated);
        assert_eq!(cfg.initial_balance, 1000.0);
        assert_eq!(cfg.max_averaging_count, 3);
    }
}
