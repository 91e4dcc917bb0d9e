//! Synthetic quotes emitted by the publisher.
//!
//! Prices follow a small random walk per symbol. The JSON shape mirrors what upstream
//! producers send: either the long-form field names with a `spread`, or the short-form
//! names some feeds use.

use chrono::Utc;
use rand::Rng;
use serde_json::{Value, json};
use tickerboard_common::Result;
use tickerboard_common::quote::{
    FIELD_ASK, FIELD_ASK_PRICE, FIELD_BID, FIELD_BID_PRICE, FIELD_LOCAL_SYMBOL, FIELD_SYMBOL,
    FIELD_TIME,
};

/// Price every symbol starts from.
pub const INITIAL_PRICE: f64 = 100.0;
/// Ask minus bid, in price units.
const SPREAD: f64 = 0.01;

/// Bid/ask pair for one symbol at one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundQuote {
    /// Instrument symbol.
    pub symbol: String,
    /// Bid price.
    pub bid: f64,
    /// Ask price.
    pub ask: f64,
    /// RFC 3339 UTC time of generation.
    pub time: String,
}

impl OutboundQuote {
    /// Calculate the next synthetic mid price using a small random walk around `current`.
    ///
    /// The change is sampled uniformly from `[-1%, +1%]` and the result is clamped to a
    /// small positive minimum.
    pub fn next_price(current: f64) -> f64 {
        let mut rng = rand::rng();
        let change: f64 = rng.random_range(-0.01..0.01);
        (current * (1.0 + change)).max(0.01)
    }

    /// Quote for `symbol` around `mid`, stamped now.
    pub fn around(symbol: &str, mid: f64) -> Self {
        let half = SPREAD / 2.0;
        Self {
            symbol: symbol.to_string(),
            bid: round_cents(mid - half),
            ask: round_cents(mid + half),
            time: Utc::now().to_rfc3339(),
        }
    }

    /// Absolute ask/bid difference.
    pub fn spread(&self) -> f64 {
        (self.ask - self.bid).abs()
    }

    /// JSON object using long-form (`local_symbol`, `bidprice`, ...) or short-form names.
    pub fn to_json(&self, short_fields: bool) -> Value {
        if short_fields {
            json!({
                FIELD_SYMBOL: self.symbol,
                FIELD_BID: self.bid,
                FIELD_ASK: self.ask,
                FIELD_TIME: self.time,
            })
        } else {
            json!({
                FIELD_LOCAL_SYMBOL: self.symbol,
                FIELD_BID_PRICE: self.bid,
                FIELD_ASK_PRICE: self.ask,
                "spread": self.spread(),
                FIELD_TIME: self.time,
            })
        }
    }

    /// Encode to JSON bytes, without a trailing newline.
    pub fn to_json_bytes(&self, short_fields: bool) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.to_json(short_fields))?)
    }
}

fn round_cents(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}
