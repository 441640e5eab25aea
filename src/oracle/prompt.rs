//! Prompt construction for the advisory model

use crate::trading_core::Instrument;

/// Account state included in the prompt
#[derive(Debug, Clone, Copy)]
pub struct PromptContext {
    pub balance: f64,
    pub open_trades: usize,
    pub max_open_trades: usize,
    pub risk_percent: f64,
}

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", decimals, v),
        None => "n/a".to_string(),
    }
}

/// One line per instrument: price and every indicator field
pub fn market_summary(instruments: &[Instrument]) -> String {
    instruments
        .iter()
        .map(|inst| {
            let ind = &inst.indicators;
            format!(
                "{}: Price={:.5}, SMA20={}, UpperBand={}, LowerBand={}, RSI={}, Momentum={}",
                inst.symbol,
                inst.price,
                fmt_opt(ind.sma20, 5),
                fmt_opt(ind.upper_band, 5),
                fmt_opt(ind.lower_band, 5),
                fmt_opt(ind.rsi, 2),
                fmt_opt(ind.momentum, 5),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Full guidance request sent to the model
pub fn build_prompt(instruments: &[Instrument], ctx: &PromptContext) -> String {
    format!(
        "You are an expert forex trading AI. Analyze this market data and provide ONE trading recommendation.

Current Market Data:
{summary}

Account Balance: ${balance:.2}
Open Trades: {open}/{max_open}
Risk Per Trade: {risk}%

Based on technical analysis (RSI, Bollinger Bands, Momentum), provide your recommendation in this exact format:

ACTION: [BUY/SELL/HOLD/CLOSE]
SYMBOL: [currency pair]
REASON: [one sentence explanation]
CONFIDENCE: [0-100]

Rules:
- RSI < 30 = oversold (potential BUY)
- RSI > 70 = overbought (potential SELL)
- Price near lower Bollinger Band = potential BUY
- Price near upper Bollinger Band = potential SELL
- Positive momentum = bullish, negative = bearish
- Only recommend trades with confidence > 70
- Consider open trades before suggesting new ones",
        summary = market_summary(instruments),
        balance = ctx.balance,
        open = ctx.open_trades,
        max_open = ctx.max_open_trades,
        risk = ctx.risk_percent,
    )
}
