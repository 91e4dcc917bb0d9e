//! Canonical quote record and the wire field names producers use.
//!
//! Producers disagree on naming: some send `local_symbol`/`bidprice`/`askprice`, others
//! `symbol`/`bid`/`ask`. The constants below list both spellings; the server resolves them
//! into a single [`Quote`].

use serde::Serialize;

/// Long-form instrument field.
pub const FIELD_LOCAL_SYMBOL: &str = "local_symbol";
/// Short-form instrument field.
pub const FIELD_SYMBOL: &str = "symbol";
/// Long-form bid field.
pub const FIELD_BID_PRICE: &str = "bidprice";
/// Short-form bid field.
pub const FIELD_BID: &str = "bid";
/// Long-form ask field.
pub const FIELD_ASK_PRICE: &str = "askprice";
/// Short-form ask field.
pub const FIELD_ASK: &str = "ask";
/// Event time field.
pub const FIELD_TIME: &str = "time";

/// Latest known bid/ask for one instrument.
///
/// All fields are text. Serialized with the long-form field names the quote board page
/// reads (`local_symbol`, `bidprice`, `askprice`, `time`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    /// Instrument identifier, never empty.
    #[serde(rename = "local_symbol")]
    pub key: String,
    /// Bid price as text, empty when the producer sent none.
    #[serde(rename = "bidprice")]
    pub bid: String,
    /// Ask price as text, empty when the producer sent none.
    #[serde(rename = "askprice")]
    pub ask: String,
    /// Producer time, or the receipt time as `HH:MM:SS`.
    #[serde(rename = "time")]
    pub timestamp: String,
}

impl Quote {
    /// Build a quote from its four text fields.
    pub fn new(
        key: impl Into<String>,
        bid: impl Into<String>,
        ask: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            bid: bid.into(),
            ask: ask.into(),
            timestamp: timestamp.into(),
        }
    }
}
