use serde::Serialize;

use crate::engine::events::ClosedTrade;
use crate::engine::exposure::EquitySnapshot;
use crate::engine::signal::Side;
use crate::engine::simulate::SimulationResult;

/// Per‐trade metrics (returns normalized by the notional at the cost basis)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SideTradeMetrics {
    pub number_of_trades:     usize,
    pub win_rate:             f64,
    pub loss_rate:            f64,
    pub average_trade_return: f64,
    pub average_trade_pnl:    f64,
    pub profit_factor:        f64,
    pub expectancy:           f64,
    pub average_duration:     f64,  // bars
    pub trade_returns:        Vec<f64>,
    pub trade_pnls:           Vec<f64>,
    pub durations:            Vec<f64>,
}

/// Bar‐by‐bar metrics over the equity curve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesMetrics {
    pub returns:           Vec<f64>, // R_t per bar
    pub mean_return:       f64,
    pub volatility:        f64,
    pub sharpe_ratio:      f64,
    pub cumulative_return: f64,
    pub max_drawdown:      f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SideMetrics {
    pub total_pnl:     f64,
    pub trade_metrics: SideTradeMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub total_return: f64,
    pub overall:      SideMetrics,
    pub longs:        SideMetrics,
    pub shorts:       SideMetrics,
    pub time_metrics: TimeSeriesMetrics,
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() { 0.0 } else { xs.iter().sum::<f64>() / xs.len() as f64 }
}

fn compute_trade_metrics(trades: &[&ClosedTrade]) -> SideTradeMetrics {
    let n = trades.len();
    let trade_pnls:    Vec<f64> = trades.iter().map(|t| t.profit).collect();
    let trade_returns: Vec<f64> = trades.iter().map(|t| t.return_on_notional()).collect();
    let durations:     Vec<f64> = trades.iter().map(|t| t.bars_held() as f64).collect();

    // a flat close counts as a win, matching the simulation's tally
    let wins   = trades.iter().filter(|t| t.is_win()).count();
    let losses = n - wins;
    let sum_wins:   f64 = trade_pnls.iter().filter(|&&p| p > 0.0).sum();
    let sum_losses: f64 = trade_pnls.iter().filter(|&&p| p < 0.0).map(|p| -p).sum();

    let avg_ret = mean(&trade_returns);

    SideTradeMetrics {
        number_of_trades:     n,
        win_rate:             if n > 0 { wins as f64 / n as f64 } else { 0.0 },
        loss_rate:            if n > 0 { losses as f64 / n as f64 } else { 0.0 },
        average_trade_return: avg_ret,
        average_trade_pnl:    mean(&trade_pnls),
        profit_factor:        if sum_losses > 0.0 { sum_wins / sum_losses } else { f64::INFINITY },
        expectancy:           avg_ret,
        average_duration:     mean(&durations),
        trade_returns,
        trade_pnls,
        durations,
    }
}

fn compute_time_metrics(initial_balance: f64, equity: &[EquitySnapshot]) -> TimeSeriesMetrics {
    // the curve starts from the untouched account
    let curve: Vec<f64> = std::iter::once(initial_balance)
        .chain(equity.iter().map(|s| s.total_equity))
        .collect();

    let returns: Vec<f64> = curve
        .windows(2)
        .map(|w| if w[0] != 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect();

    let m = returns.len() as f64;
    let mean_return = if m > 0.0 { returns.iter().sum::<f64>() / m } else { 0.0 };
    let volatility = if m > 1.0 {
        (returns.iter().map(|&x| (x - mean_return).powi(2)).sum::<f64>() / (m - 1.0)).sqrt()
    } else {
        0.0
    };
    let sharpe_ratio = if volatility != 0.0 { mean_return / volatility } else { 0.0 };

    let last = curve[curve.len() - 1];
    let cumulative_return = if initial_balance != 0.0 { last / initial_balance - 1.0 } else { 0.0 };

    let mut peak   = curve[0];
    let mut max_dd = 0.0_f64;
    for &eq in &curve {
        peak = peak.max(eq);
        let dd = if peak != 0.0 { (peak - eq) / peak } else { 0.0 };
        max_dd = max_dd.max(dd);
    }

    TimeSeriesMetrics {
        returns,
        mean_return,
        volatility,
        sharpe_ratio,
        cumulative_return,
        max_drawdown: max_dd,
    }
}

fn side_metrics(trades: &[&ClosedTrade]) -> SideMetrics {
    let trade_metrics = compute_trade_metrics(trades);
    SideMetrics {
        total_pnl: trade_metrics.trade_pnls.iter().sum(),
        trade_metrics,
    }
}

/// Per‐trade metrics for overall, longs and shorts, plus the equity‐curve metrics.
pub fn compute_summary_metrics(initial_balance: f64, result: &SimulationResult) -> SummaryMetrics {
    let all:    Vec<&ClosedTrade> = result.closed_trades.iter().collect();
    let longs:  Vec<&ClosedTrade> = all.iter().copied().filter(|t| t.side == Side::Long).collect();
    let shorts: Vec<&ClosedTrade> = all.iter().copied().filter(|t| t.side == Side::Short).collect();

    let time_metrics = compute_time_metrics(initial_balance, &result.equity_curve);

    SummaryMetrics {
        total_return: time_metrics.cumulative_return,
        overall:      side_metrics(&all),
        longs:        side_metrics(&longs),
        shorts:       side_metrics(&shorts),
        time_metrics,
    }
}
