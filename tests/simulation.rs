use martingale_backtester::{
    account, run_simulation, BacktestError, CloseReason, Event, MarginMode, Position, Side,
    Signal, SimulationConfig, TargetRules,
};
use proptest::prelude::*;

fn signals(tags: &[Option<&str>]) -> Vec<Signal> {
    Signal::from_tags(tags).unwrap()
}

#[test]
fn long_open_average_and_take_profit() {
    let cfg = SimulationConfig {
        initial_balance:        1000.0,
        risk_per_trade_pct:     1.0,
        leverage:               10.0,
        commission_rate_pct:    0.1,
        use_stop_loss:          false,
        use_take_profit:        true,
        take_profit_pct:        3.0,
        use_averaging:          true,
        averaging_distance_pct: 5.0,
        martingale_multiplier:  2.0,
        max_averaging_count:    1,
        record_events:          true,
        ..Default::default()
    };
    let res = run_simulation(
        &[100.0, 95.0, 100.0],
        &signals(&[Some("long"), None, None]),
        &cfg,
    )
    .unwrap();

    assert_eq!(res.trades, 1);
    assert_eq!(res.wins, 1);
    assert!(res.final_balance > 1000.0);
    assert!(res.total_profit > 0.0);

    let events = res.events.expect("events were requested");
    let count = |kind: &str| events.iter().filter(|e| e.kind() == kind).count();
    assert_eq!(count("open"), 1);
    assert!(count("avg") >= 1);
    assert_eq!(count("close"), 1);

    let close = serde_json::to_value(events.last().unwrap()).unwrap();
    assert_eq!(close["type"], "close");
    assert!(close.get("profit").is_some());
    assert_eq!(close["reason"], "TP");
}

#[test]
fn event_bars_are_chronological() {
    let cfg = SimulationConfig {
        use_take_profit: true,
        take_profit_pct: 2.0,
        record_events:   true,
        ..Default::default()
    };
    let prices = [100.0, 94.0, 97.0, 99.0, 101.0, 104.0, 100.0, 98.0];
    let tags = [
        Some("long"), None, None, None, Some("short"), None, Some("short"), None,
    ];
    let res = run_simulation(&prices, &signals(&tags), &cfg).unwrap();

    let bars: Vec<usize> = res.events.unwrap().iter().map(Event::bar).collect();
    assert!(bars.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn tiny_account_never_trades() {
    let cfg = SimulationConfig {
        initial_balance:    1.0,
        risk_per_trade_pct: 1.0,
        leverage:           1.0,
        ..Default::default()
    };
    let res = run_simulation(&[100.0], &signals(&[Some("long")]), &cfg).unwrap();
    assert_eq!(res.trades, 0);
    assert_eq!(res.final_balance, 1.0);
    assert_eq!(res.total_commission, 0.0);
}

#[test]
fn short_liquidation_under_isolated_margin() {
    let cfg = SimulationConfig {
        margin_mode:   MarginMode::Isolated,
        use_averaging: false,
        ..Default::default()
    };
    // isolated, 10x: short liquidates at 109
    let res = run_simulation(
        &[100.0, 105.0, 110.0],
        &signals(&[Some("short"), None, None]),
        &cfg,
    )
    .unwrap();
    assert_eq!(res.closed_trades.len(), 1);
    assert_eq!(res.closed_trades[0].reason, CloseReason::Liquidation);
    assert_eq!(res.closed_trades[0].exit_bar, 2);
    assert_eq!(res.losses, 1);
}

#[test]
fn reopens_after_a_close() {
    let cfg = SimulationConfig {
        use_take_profit: true,
        take_profit_pct: 1.0,
        use_averaging:   false,
        ..Default::default()
    };
    let res = run_simulation(
        &[100.0, 102.0, 100.0, 98.0],
        &signals(&[Some("long"), None, Some("short"), None]),
        &cfg,
    )
    .unwrap();
    assert_eq!(res.trades, 2);
    assert_eq!(res.wins, 2);
    assert_eq!(res.closed_trades[1].side, Side::Short);
    assert_eq!(res.closed_trades[1].entry_bar, 2);
}

#[test]
fn mismatched_lengths_fail_fast() {
    let err = run_simulation(&[100.0, 101.0, 102.0], &signals(&[Some("long")]), &SimulationConfig::default())
        .unwrap_err();
    assert_eq!(err, BacktestError::LengthMismatch { prices: 3, signals: 1 });
}

#[test]
fn spec_arithmetic_examples() {
    assert!((account::position_volume(100.0, 1000.0, 1.0, 10.0).unwrap() - 0.1).abs() < 1e-12);
    assert!((account::commission(0.1, 100.0, 0.1).unwrap() - 0.01).abs() < 1e-12);
    assert!(account::liquidation_price(100.0, Side::Long, 10.0, MarginMode::Isolated).unwrap() < 100.0);
    assert!(account::liquidation_price(100.0, Side::Short, 10.0, MarginMode::Isolated).unwrap() > 100.0);
    assert!((account::realized_pnl(100.0, 110.0, 1.0, Side::Long, 0.1).unwrap() - 9.89).abs() < 1e-9);
}

#[test]
fn sized_open_then_martingale_leg() {
    let volume = account::position_volume(100.0, 1000.0, 1.0, 10.0).unwrap();
    let mut p = Position::new(Side::Long);
    p.open(100.0, volume, TargetRules::disabled()).unwrap();

    let leg = p.add_average(95.0, 2.0).unwrap();
    assert!((leg - 0.2).abs() < 1e-12);
    assert!((p.total_volume() - 0.3).abs() < 1e-12);
    let expected = (100.0 * 0.1 + 95.0 * 0.2) / 0.3;
    assert!((p.avg_price().unwrap() - expected).abs() < 1e-9);
}

proptest! {
    #[test]
    fn volume_is_conserved_across_averaging(
        entry in 1.0f64..1000.0,
        volume in 0.001f64..10.0,
        steps in prop::collection::vec((0.5f64..1.0, 0.1f64..3.0), 0..6),
    ) {
        let mut p = Position::new(Side::Long);
        p.open(entry, volume, TargetRules::disabled()).unwrap();
        for (drop, mult) in steps {
            let price = p.avg_price().unwrap() * drop;
            p.add_average(price, mult).unwrap();
        }

        let summed: f64 = p.legs().iter().map(|l| l.volume).sum();
        prop_assert!((p.total_volume() - summed).abs() <= 1e-9 * summed);
        prop_assert_eq!(p.legs().len() as u32, p.avg_count() + 1);

        let avg = p.avg_price().unwrap();
        let lo = p.legs().iter().filter_map(|l| l.price).fold(f64::INFINITY, f64::min);
        let hi = p.legs().iter().filter_map(|l| l.price).fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(avg >= lo * (1.0 - 1e-12) && avg <= hi * (1.0 + 1e-12));
    }

    #[test]
    fn balance_equals_initial_plus_realized(
        moves in prop::collection::vec(-0.04f64..0.04, 1..60),
        tags in prop::collection::vec(0u8..3, 60),
    ) {
        let mut prices = vec![100.0];
        for m in &moves {
            let last = *prices.last().unwrap();
            prices.push(last * (1.0 + m));
        }
        let sigs: Vec<Signal> = tags[..prices.len()]
            .iter()
            .map(|t| match t { 0 => Signal::Long, 1 => Signal::Short, _ => Signal::Hold })
            .collect();

        let cfg = SimulationConfig {
            use_take_profit: true,
            use_stop_loss:   true,
            take_profit_pct: 2.0,
            stop_loss_pct:   8.0,
            ..Default::default()
        };
        let res = run_simulation(&prices, &sigs, &cfg).unwrap();

        prop_assert!((res.final_balance - (cfg.initial_balance + res.total_profit)).abs() < 1e-9);
        prop_assert_eq!(res.wins + res.losses, res.closed_trades.len());
        prop_assert!(res.trades >= res.closed_trades.len());
        prop_assert!(res.trades - res.closed_trades.len() <= 1);
    }
}
