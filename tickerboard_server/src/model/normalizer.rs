//! Field resolution from a decoded producer message to a canonical [`Quote`].
//!
//! Each logical attribute has an ordered list of candidate fields. The first candidate
//! that is present *and truthy* wins, where truthiness follows JSON-value falsiness:
//! `null`, `false`, `0`, `""`, `[]` and `{}` are all treated as absent.
//!
//! A consequence worth knowing: a bid or ask of numeric `0` is indistinguishable from a
//! missing field and falls through to the next candidate (or to `""`). Existing producers
//! rely on this resolution order, so it is kept as is.

use chrono::Local;
use serde_json::{Map, Value};
use tickerboard_common::Quote;
use tickerboard_common::quote::{
    FIELD_ASK, FIELD_ASK_PRICE, FIELD_BID, FIELD_BID_PRICE, FIELD_LOCAL_SYMBOL, FIELD_SYMBOL,
    FIELD_TIME,
};

/// Candidate fields for the instrument key, in priority order.
pub const KEY_FIELDS: [&str; 2] = [FIELD_LOCAL_SYMBOL, FIELD_SYMBOL];
/// Candidate fields for the bid price, in priority order.
pub const BID_FIELDS: [&str; 2] = [FIELD_BID_PRICE, FIELD_BID];
/// Candidate fields for the ask price, in priority order.
pub const ASK_FIELDS: [&str; 2] = [FIELD_ASK_PRICE, FIELD_ASK];
/// Candidate fields for the event time.
pub const TIME_FIELDS: [&str; 1] = [FIELD_TIME];

/// Format used for the receipt time when the producer sent none.
const LOCAL_TIME_FORMAT: &str = "%H:%M:%S";

/// Normalize `message`, stamping it with the host's local time if it carries no `time`.
///
/// Returns `None` when no key field resolves to a truthy value; that is the only
/// rejection condition.
pub fn normalize(message: &Map<String, Value>) -> Option<Quote> {
    normalize_with(message, local_clock)
}

/// Same as [`normalize`] but with an injectable fallback clock.
///
/// `clock` is only called when the message has no truthy `time` field.
pub fn normalize_with<F>(message: &Map<String, Value>, clock: F) -> Option<Quote>
where
    F: FnOnce() -> String,
{
    let key = first_truthy(message, &KEY_FIELDS).map(to_text)?;
    let bid = first_truthy(message, &BID_FIELDS)
        .map(to_text)
        .unwrap_or_default();
    let ask = first_truthy(message, &ASK_FIELDS)
        .map(to_text)
        .unwrap_or_default();
    let timestamp = first_truthy(message, &TIME_FIELDS)
        .map(to_text)
        .unwrap_or_else(clock);

    Some(Quote {
        key,
        bid,
        ask,
        timestamp,
    })
}

/// Current local time as `HH:MM:SS`.
pub fn local_clock() -> String {
    Local::now().format(LOCAL_TIME_FORMAT).to_string()
}

fn first_truthy<'a>(message: &'a Map<String, Value>, candidates: &[&str]) -> Option<&'a Value> {
    candidates
        .iter()
        .filter_map(|field| message.get(*field))
        .find(|value| is_truthy(value))
}

/// JSON falsiness: null, false, zero, and empty strings/arrays/objects.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

/// Strings are taken verbatim, numbers in their shortest decimal form, anything else as
/// compact JSON text.
fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
