//! Market Simulator
//!
//! Owns per-instrument price, bounded history and indicators, and moves
//! every price one random-walk step per cycle.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

use super::indicators::{self, IndicatorSnapshot};

/// Redraws allowed before a step is skipped
const MAX_DRAW_ATTEMPTS: usize = 5;

/// Current price lookup by symbol
pub trait Quotes {
    fn quote(&self, symbol: &str) -> Option<f64>;
}

impl Quotes for HashMap<String, f64> {
    fn quote(&self, symbol: &str) -> Option<f64> {
        self.get(symbol).copied()
    }
}

/// A simulated currency pair
#[derive(Debug, Clone)]
pub struct Instrument {
    pub symbol: String,
    pub price: f64,
    history: VecDeque<f64>,
    pub indicators: IndicatorSnapshot,
}

impl Instrument {
    fn new(symbol: &str, price: f64, capacity: usize) -> Self {
        Self {
            symbol: symbol.to_string(),
            price,
            history: VecDeque::with_capacity(capacity + 1),
            indicators: IndicatorSnapshot::default(),
        }
    }

    /// Past prices, oldest first
    pub fn history(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        self.history.iter().copied()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}

/// Random-walk price generator for a fixed set of instruments
#[derive(Debug)]
pub struct MarketSimulator {
    instruments: Vec<Instrument>,
    volatility: f64,
    history_capacity: usize,
    rng: StdRng,
}

impl MarketSimulator {
    /// `volatility` is the full width of the uniform per-step change
    /// (0.0003 gives moves within ±0.015%).
    pub fn new(volatility: f64, history_capacity: usize) -> Self {
        Self::with_rng(volatility, history_capacity, StdRng::from_entropy())
    }

    /// Deterministic simulator for tests and replays
    pub fn with_seed(volatility: f64, history_capacity: usize, seed: u64) -> Self {
        Self::with_rng(volatility, history_capacity, StdRng::seed_from_u64(seed))
    }

    fn with_rng(volatility: f64, history_capacity: usize, rng: StdRng) -> Self {
        Self {
            instruments: Vec::new(),
            volatility,
            history_capacity: history_capacity.max(1),
            rng,
        }
    }

    /// Seed one instrument per symbol at its base price with empty history.
    ///
    /// Replaces any previously initialized instruments. Non-positive or
    /// non-finite base prices are skipped.
    pub fn initialize<S: AsRef<str>>(&mut self, base_prices: &[(S, f64)]) {
        self.instruments.clear();
        for (symbol, price) in base_prices {
            let symbol = symbol.as_ref();
            if !price.is_finite() || *price <= 0.0 {
                warn!("Skipping {}: invalid base price {}", symbol, price);
                continue;
            }
            self.instruments
                .push(Instrument::new(symbol, *price, self.history_capacity));
        }
    }

    /// Advance every instrument by one step and refresh its indicators
    pub fn advance_cycle(&mut self) {
        for i in 0..self.instruments.len() {
            let current = self.instruments[i].price;
            let next = self.next_price(current);

            let inst = &mut self.instruments[i];
            inst.price = next;
            inst.history.push_back(next);
            while inst.history.len() > self.history_capacity {
                inst.history.pop_front();
            }
            inst.indicators = indicators::compute(inst.history.make_contiguous());

            debug!("{} -> {:.5}", inst.symbol, inst.price);
        }
    }

    /// Draw a multiplicative step, retrying draws that leave the valid range
    fn next_price(&mut self, current: f64) -> f64 {
        for _ in 0..MAX_DRAW_ATTEMPTS {
            let change = (self.rng.gen::<f64>() - 0.5) * self.volatility;
            let candidate = current * (1.0 + change);
            if candidate.is_finite() && candidate > 0.0 {
                return candidate;
            }
        }
        warn!("No valid price step from {}, holding price", current);
        current
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn instrument(&self, symbol: &str) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.symbol == symbol)
    }
}

impl Quotes for MarketSimulator {
    fn quote(&self, symbol: &str) -> Option<f64> {
        self.instrument(symbol).map(|i| i.price)
    }
}
