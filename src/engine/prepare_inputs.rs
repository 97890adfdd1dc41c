// src/engine/prepare_inputs.rs

use crate::engine::error::{BacktestError, Result};
use crate::engine::signal::Signal;

/// Check the bar series before any state is touched; returns the bar count.
pub fn prepare_inputs(prices: &[f64], signals: &[Signal]) -> Result<usize> {
    if prices.len() != signals.len() {
        return Err(BacktestError::LengthMismatch {
            prices:  prices.len(),
            signals: signals.len(),
        });
    }
    if let Some((bar, &price)) = prices
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_finite() || **p <= 0.0)
    {
        return Err(BacktestError::InvalidPrice { bar, price });
    }
    Ok(prices.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_series() {
        let n = prepare_inputs(&[100.0, 101.0], &[Signal::Long, Signal::Hold]).unwrap();
        assert_eq!(n, 2);
        assert_eq!(prepare_inputs(&[], &[]).unwrap(), 0);
    }

    #[test]
    fn rejects_length_mismatch() {
        assert_eq!(
            prepare_inputs(&[100.0, 101.0], &[Signal::Long]),
            Err(BacktestError::LengthMismatch { prices: 2, signals: 1 })
        );
    }

    #[test]
    fn rejects_non_positive_or_nan_prices() {
        assert_eq!(
            prepare_inputs(&[100.0, 0.0], &[Signal::Hold; 2]),
            Err(BacktestError::InvalidPrice { bar: 1, price: 0.0 })
        );
        assert!(matches!(
            prepare_inputs(&[f64::NAN], &[Signal::Hold]),
            Err(BacktestError::InvalidPrice { bar: 0, .. })
        ));
    }
}
