//! Indicator Engine
//!
//! Derives SMA, Bollinger-style bands, RSI and momentum from a trailing
//! price history. Pure functions, no state.

use serde::{Deserialize, Serialize};

/// Window for SMA and bands
pub const SMA_PERIOD: usize = 20;
/// Number of deltas RSI averages over
pub const RSI_PERIOD: usize = 14;
/// Momentum compares the last price with the one this many samples back (inclusive)
pub const MOMENTUM_LOOKBACK: usize = 10;
/// Band width in standard deviations
pub const BAND_STD_DEVS: f64 = 2.0;

/// Indicator values for one instrument.
///
/// Fields are `None` while the history is too short for them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSnapshot {
    pub sma20: Option<f64>,
    pub upper_band: Option<f64>,
    pub lower_band: Option<f64>,
    pub rsi: Option<f64>,
    pub momentum: Option<f64>,
}

impl IndicatorSnapshot {
    /// True once the full set (SMA, bands, RSI) is available
    pub fn is_complete(&self) -> bool {
        self.sma20.is_some() && self.rsi.is_some()
    }
}

/// Compute the snapshot for a history ordered oldest first.
///
/// Below 20 samples only momentum (needs 10) may be present.
pub fn compute(history: &[f64]) -> IndicatorSnapshot {
    let momentum = momentum(history);

    if history.len() < SMA_PERIOD {
        return IndicatorSnapshot {
            momentum,
            ..Default::default()
        };
    }

    let recent = &history[history.len() - SMA_PERIOD..];
    let (mean, std_dev) = mean_and_std_dev(recent);

    IndicatorSnapshot {
        sma20: Some(mean),
        upper_band: Some(mean + std_dev * BAND_STD_DEVS),
        lower_band: Some(mean - std_dev * BAND_STD_DEVS),
        rsi: Some(rsi(history, RSI_PERIOD)),
        momentum,
    }
}

/// Arithmetic mean and population standard deviation
fn mean_and_std_dev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// RSI over the last `period` deltas using simple averages.
///
/// Returns 50 with fewer than `period + 1` prices and 100 when there were no losses.
pub fn rsi(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return 50.0;
    }

    let mut gains = 0.0;
    let mut losses = 0.0;
    for window in prices[prices.len() - period - 1..].windows(2) {
        let change = window[1] - window[0];
        if change > 0.0 {
            gains += change;
        } else {
            losses -= change;
        }
    }

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}

/// Last price minus the price `MOMENTUM_LOOKBACK` samples from the end
pub fn momentum(prices: &[f64]) -> Option<f64> {
    if prices.len() < MOMENTUM_LOOKBACK {
        return None;
    }
    let last = prices[prices.len() - 1];
    let earlier = prices[prices.len() - MOMENTUM_LOOKBACK];
    Some(last - earlier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp(len: usize) -> Vec<f64> {
        (0..len).map(|i| 1.0 + i as f64 * 0.001).collect()
    }

    #[test]
    fn test_short_history_has_no_sma_or_bands() {
        for len in 1..SMA_PERIOD {
            let snap = compute(&ramp(len));
            assert!(snap.sma20.is_none(), "len {}", len);
            assert!(snap.upper_band.is_none());
            assert!(snap.lower_band.is_none());
            assert!(snap.rsi.is_none());
        }
    }

    #[test]
    fn test_momentum_needs_ten_samples() {
        assert!(compute(&ramp(9)).momentum.is_none());

        let snap = compute(&ramp(10));
        assert_relative_eq!(snap.momentum.unwrap(), 0.009, epsilon = 1e-12);
        assert!(snap.sma20.is_none());
    }

    #[test]
    fn test_sma_uses_last_twenty_only() {
        // 30 samples: first 10 are huge outliers that must be ignored
        let mut history = vec![100.0; 10];
        history.extend((0..20).map(|i| i as f64));

        let snap = compute(&history);
        assert_relative_eq!(snap.sma20.unwrap(), 9.5, epsilon = 1e-12);
    }

    #[test]
    fn test_bands_are_two_population_std_devs() {
        let history: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 1.0 } else { 3.0 }).collect();
        let snap = compute(&history);

        // mean 2, population std dev 1
        assert_relative_eq!(snap.sma20.unwrap(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(snap.upper_band.unwrap(), 4.0, epsilon = 1e-12);
        assert_relative_eq!(snap.lower_band.unwrap(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_flat_history_has_zero_width_bands() {
        let snap = compute(&[1.085; 25]);
        assert!(snap.is_complete());
        assert_relative_eq!(snap.sma20.unwrap(), 1.085, epsilon = 1e-12);
        assert_relative_eq!(snap.upper_band.unwrap(), snap.lower_band.unwrap(), epsilon = 1e-12);
    }

    #[test]
    fn test_rsi_neutral_when_insufficient() {
        assert_eq!(rsi(&ramp(14), RSI_PERIOD), 50.0);
        assert_eq!(rsi(&[], RSI_PERIOD), 50.0);
    }

    #[test]
    fn test_rsi_hundred_without_losses() {
        let mut prices = ramp(15);
        // a flat step is a non-negative delta, not a loss
        prices[10] = prices[9];
        assert_eq!(rsi(&prices, RSI_PERIOD), 100.0);
    }

    #[test]
    fn test_rsi_zero_without_gains() {
        let prices: Vec<f64> = ramp(20).into_iter().rev().collect();
        assert_relative_eq!(rsi(&prices, RSI_PERIOD), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rsi_balanced_moves() {
        // alternating +1/-1 gives equal average gain and loss
        let prices: Vec<f64> = (0..15).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
        assert_relative_eq!(rsi(&prices, RSI_PERIOD), 50.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rsi_only_looks_at_last_period() {
        // a large early loss outside the window is ignored
        let mut prices = vec![50.0, 1.0];
        prices.extend(ramp(15));
        assert_eq!(rsi(&prices, RSI_PERIOD), 100.0);
    }

    #[test]
    fn test_rsi_bounded() {
        let prices: Vec<f64> = (0..60).map(|i| 1.0 + ((i * 7919) % 13) as f64 * 0.01).collect();
        for end in 1..prices.len() {
            let value = rsi(&prices[..end], RSI_PERIOD);
            assert!((0.0..=100.0).contains(&value));
        }
    }
}
