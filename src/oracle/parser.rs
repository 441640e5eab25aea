//! Advisory reply decoding
//!
//! The model is asked for four labelled lines (ACTION, SYMBOL, REASON,
//! CONFIDENCE). Replies are decoded into [`ParsedReply`]; anything without
//! a usable ACTION and SYMBOL is [`ParsedReply::Unparseable`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Reason used when the reply has no REASON line
pub const DEFAULT_REASON: &str = "AI analysis";

// Values may be wrapped in markdown emphasis or brackets: "**ACTION:** [BUY]"
static ACTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)ACTION\s*:[\s*\[]*(\w+)").expect("valid regex"));
static SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)SYMBOL\s*:[\s*\[]*(\w+)").expect("valid regex"));
static REASON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)REASON\s*:[ \t*]*([^\n]+)").expect("valid regex"));
static CONFIDENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)CONFIDENCE\s*:[\s*\[]*(\d+)").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Sell,
    Hold,
    Close,
}

impl Action {
    fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_uppercase().as_str() {
            "BUY" => Some(Action::Buy),
            "SELL" => Some(Action::Sell),
            "HOLD" => Some(Action::Hold),
            "CLOSE" => Some(Action::Close),
            _ => None,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
            Action::Close => "CLOSE",
        };
        write!(f, "{}", s)
    }
}

/// Structured trade recommendation
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub action: Action,
    pub symbol: String,
    pub reason: String,
    /// 0-100
    pub confidence: u32,
    /// Full reply the recommendation was decoded from
    pub raw_text: String,
}

/// Result of decoding one advisory reply
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedReply {
    Recommendation(Recommendation),
    Unparseable { raw_text: String },
}

impl ParsedReply {
    pub fn into_recommendation(self) -> Option<Recommendation> {
        match self {
            ParsedReply::Recommendation(rec) => Some(rec),
            ParsedReply::Unparseable { .. } => None,
        }
    }
}

fn capture<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Decode a free-form reply. Field labels are matched case-insensitively.
pub fn parse_reply(text: &str) -> ParsedReply {
    let unparseable = || ParsedReply::Unparseable {
        raw_text: text.to_string(),
    };

    let Some(action) = capture(&ACTION_RE, text).and_then(Action::from_word) else {
        return unparseable();
    };
    let Some(symbol) = capture(&SYMBOL_RE, text) else {
        return unparseable();
    };

    let reason = capture(&REASON_RE, text)
        .map(|r| r.trim().trim_end_matches('*').trim())
        .filter(|r| !r.is_empty())
        .unwrap_or(DEFAULT_REASON)
        .to_string();

    // Missing or out-of-range confidence never passes the confidence gate
    let confidence = capture(&CONFIDENCE_RE, text)
        .and_then(|c| c.parse::<u64>().ok())
        .map(|c| c.min(100) as u32)
        .unwrap_or(0);

    ParsedReply::Recommendation(Recommendation {
        action,
        symbol: symbol.to_ascii_uppercase(),
        reason,
        confidence,
        raw_text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(text: &str) -> Recommendation {
        parse_reply(text)
            .into_recommendation()
            .expect("should parse")
    }

    #[test]
    fn test_parse_canonical_reply() {
        let text = "ACTION: BUY\nSYMBOL: EURUSD\nREASON: RSI oversold near lower band\nCONFIDENCE: 82";
        let r = rec(text);
        assert_eq!(r.action, Action::Buy);
        assert_eq!(r.symbol, "EURUSD");
        assert_eq!(r.reason, "RSI oversold near lower band");
        assert_eq!(r.confidence, 82);
        assert_eq!(r.raw_text, text);
    }

    #[test]
    fn test_labels_are_case_insensitive() {
        let r = rec("action: sell\nsymbol: gbpusd\nreason: overbought\nconfidence: 75");
        assert_eq!(r.action, Action::Sell);
        assert_eq!(r.symbol, "GBPUSD");
    }

    #[test]
    fn test_markdown_and_brackets() {
        let r = rec("**ACTION:** [CLOSE]\n**SYMBOL:** USDJPY\n**REASON:** momentum faded\n**CONFIDENCE:** 90%");
        assert_eq!(r.action, Action::Close);
        assert_eq!(r.symbol, "USDJPY");
        assert_eq!(r.reason, "momentum faded");
        assert_eq!(r.confidence, 90);
    }

    #[test]
    fn test_missing_action_or_symbol_is_unparseable() {
        assert!(matches!(
            parse_reply("SYMBOL: EURUSD\nCONFIDENCE: 90"),
            ParsedReply::Unparseable { .. }
        ));
        assert!(matches!(
            parse_reply("ACTION: BUY\nCONFIDENCE: 90"),
            ParsedReply::Unparseable { .. }
        ));
        assert!(matches!(parse_reply(""), ParsedReply::Unparseable { .. }));
    }

    #[test]
    fn test_unknown_action_is_unparseable() {
        let parsed = parse_reply("ACTION: WAIT\nSYMBOL: EURUSD");
        assert_eq!(
            parsed,
            ParsedReply::Unparseable {
                raw_text: "ACTION: WAIT\nSYMBOL: EURUSD".to_string()
            }
        );
    }

    #[test]
    fn test_defaults_for_optional_fields() {
        let r = rec("ACTION: HOLD\nSYMBOL: AUDUSD");
        assert_eq!(r.confidence, 0);
        assert_eq!(r.reason, DEFAULT_REASON);
    }

    #[test]
    fn test_confidence_clamped() {
        assert_eq!(rec("ACTION: BUY\nSYMBOL: EURUSD\nCONFIDENCE: 250").confidence, 100);
        assert_eq!(
            rec("ACTION: BUY\nSYMBOL: EURUSD\nCONFIDENCE: 99999999999999999999999").confidence,
            0
        );
    }

    #[test]
    fn test_surrounding_prose_is_ignored() {
        let r = rec(
            "Looking at the data, EURUSD looks stretched.\n\nACTION: SELL\nSYMBOL: EURUSD\nREASON: price at upper band\nCONFIDENCE: 71\n\nTrade carefully.",
        );
        assert_eq!(r.action, Action::Sell);
        assert_eq!(r.confidence, 71);
    }
}
