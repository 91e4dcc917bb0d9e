//! Latest-quote-per-instrument store shared by every listener.
//!
//! The map sits behind a single `RwLock`. Writers replace whole `Quote` values, so a
//! reader holding the read guard always sees complete records, and `snapshot` clones the
//! full map under one guard, giving a point-in-time view.
//!
//! A poisoned lock is recovered rather than propagated: every write is a single
//! `HashMap::insert` of a fully built value, so a panicking holder cannot leave a partial
//! record behind.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tickerboard_common::{Quote, Result};

/// Concurrent key → latest [`Quote`] map with atomic upsert and snapshot.
#[derive(Debug, Default)]
pub struct QuoteStore {
    quotes: RwLock<HashMap<String, Quote>>,
}

impl QuoteStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the entry for `quote.key`.
    ///
    /// Returns `false` without touching the map if the key is empty.
    #[must_use]
    pub fn upsert(&self, quote: Quote) -> bool {
        if quote.key.is_empty() {
            return false;
        }
        self.write().insert(quote.key.clone(), quote);
        true
    }

    /// One quote per known key, as of a single instant. Order is unspecified.
    pub fn snapshot(&self) -> Vec<Quote> {
        self.read().values().cloned().collect()
    }

    /// The snapshot rendered as the JSON array served to the quote board.
    pub fn snapshot_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.snapshot())?)
    }

    /// Number of distinct instruments seen so far.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// `true` until the first quote is stored.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Quote>> {
        self.quotes.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Quote>> {
        self.quotes.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    #[test]
    fn test_upsert_then_snapshot() {
        let store = QuoteStore::new();
        assert!(store.is_empty());

        assert!(store.upsert(Quote::new("GCZ5", "3573.7", "3573.8", "t")));

        let snapshot = store.snapshot();
        assert_eq!(snapshot, vec![Quote::new("GCZ5", "3573.7", "3573.8", "t")]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_second_upsert_replaces_whole_record() {
        let store = QuoteStore::new();
        assert!(store.upsert(Quote::new("X", "1", "2", "t1")));
        assert!(store.upsert(Quote::new("X", "3", "", "t2")));

        assert_eq!(store.snapshot(), vec![Quote::new("X", "3", "", "t2")]);
    }

    #[test]
    fn test_empty_key_is_refused() {
        let store = QuoteStore::new();
        assert!(!store.upsert(Quote::new("", "1", "2", "t")));
        assert!(store.is_empty());
    }

    #[test]
    fn test_snapshot_json_is_array() {
        let store = QuoteStore::new();
        assert!(store.upsert(Quote::new("A", "1", "2", "t")));

        let json: serde_json::Value = serde_json::from_slice(&store.snapshot_json().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"local_symbol": "A", "bidprice": "1", "askprice": "2", "time": "t"}])
        );
    }

    #[test]
    fn test_empty_snapshot_json() {
        let store = QuoteStore::new();
        assert_eq!(store.snapshot_json().unwrap(), b"[]");
    }

    #[test]
    fn test_concurrent_distinct_keys() {
        let store = Arc::new(QuoteStore::new());
        let handles: Vec<_> = (0..64)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let n = i.to_string();
                    assert!(store.upsert(Quote::new(format!("K{i}"), n.clone(), n.clone(), n)));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 64);
        for quote in snapshot {
            assert_eq!(quote.key, format!("K{}", quote.bid));
            assert_eq!(quote.bid, quote.ask);
            assert_eq!(quote.bid, quote.timestamp);
        }
    }

    #[test]
    fn test_no_torn_reads_under_contention() {
        let store = Arc::new(QuoteStore::new());
        let done = Arc::new(AtomicBool::new(false));

        // Every written quote has bid == ask == timestamp; any mismatch is a torn record.
        let writers: Vec<_> = (0..4)
            .map(|w| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..2_000 {
                        let v = format!("{w}-{i}");
                        assert!(store.upsert(Quote::new(format!("K{}", i % 8), v.clone(), v.clone(), v)));
                    }
                })
            })
            .collect();

        let reader = {
            let store = Arc::clone(&store);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::Relaxed) {
                    for quote in store.snapshot() {
                        assert_eq!(quote.bid, quote.ask);
                        assert_eq!(quote.ask, quote.timestamp);
                    }
                }
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        done.store(true, Ordering::Relaxed);
        reader.join().unwrap();

        assert_eq!(store.len(), 8);
    }
}
