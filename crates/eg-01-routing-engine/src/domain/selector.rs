//! Per-key round-robin selection.
//!
//! Each routing key owns an atomic counter. The map of counters is guarded
//! by a reader/writer lock that is only taken for writing when a key is seen
//! for the first time; advancing a counter never blocks other keys.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::errors::SelectionError;
use super::value_objects::RoutingKey;

#[derive(Debug, Default)]
pub struct RoundRobinSelector {
    counters: RwLock<HashMap<RoutingKey, Arc<AtomicU64>>>,
}

impl RoundRobinSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the next index in `0..candidate_count` for `key`.
    ///
    /// The first call for a key returns 0. Over N calls with a stable
    /// `candidate_count` M, every index is returned floor(N/M) or
    /// ceil(N/M) times.
    pub fn next(&self, key: &RoutingKey, candidate_count: usize) -> Result<usize, SelectionError> {
        if candidate_count == 0 {
            return Err(SelectionError::EmptyCandidateSet {
                key: key.to_string(),
            });
        }
        let counter = self.counter_for(key);
        let ticket = counter.fetch_add(1, Ordering::Relaxed);
        Ok((ticket % candidate_count as u64) as usize)
    }

    /// Create the counter for `key` without advancing it.
    pub fn ensure(&self, key: &RoutingKey) {
        self.counter_for(key);
    }

    /// Current counter value, if the key has been seen.
    pub fn counter(&self, key: &RoutingKey) -> Option<u64> {
        self.counters
            .read()
            .get(key)
            .map(|c| c.load(Ordering::Relaxed))
    }

    pub fn tracked_keys(&self) -> usize {
        self.counters.read().len()
    }

    fn counter_for(&self, key: &RoutingKey) -> Arc<AtomicU64> {
        if let Some(counter) = self.counters.read().get(key) {
            return Arc::clone(counter);
        }
        let mut counters = self.counters.write();
        Arc::clone(
            counters
                .entry(key.clone())
                .or_insert_with(|| Arc::new(AtomicU64::new(0))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::thread;

    fn key(k: &str) -> RoutingKey {
        RoutingKey::new(k).unwrap()
    }

    #[test]
    fn test_first_pick_is_zero_then_cycles() {
        let selector = RoundRobinSelector::new();
        let btc = key("btc");
        let picks: Vec<usize> = (0..5).map(|_| selector.next(&btc, 2).unwrap()).collect();
        assert_eq!(picks, vec![0, 1, 0, 1, 0]);
    }

    #[test]
    fn test_keys_are_independent() {
        let selector = RoundRobinSelector::new();
        assert_eq!(selector.next(&key("a"), 3).unwrap(), 0);
        assert_eq!(selector.next(&key("a"), 3).unwrap(), 1);
        assert_eq!(selector.next(&key("b"), 3).unwrap(), 0);
        assert_eq!(selector.tracked_keys(), 2);
    }

    #[test]
    fn test_empty_candidate_set() {
        let selector = RoundRobinSelector::new();
        let err = selector.next(&key("btc"), 0).unwrap_err();
        assert_eq!(err, SelectionError::EmptyCandidateSet { key: "btc".into() });
        // a failed selection does not create a counter
        assert_eq!(selector.counter(&key("btc")), None);
    }

    #[test]
    fn test_ensure_does_not_advance() {
        let selector = RoundRobinSelector::new();
        let btc = key("btc");
        selector.ensure(&btc);
        selector.ensure(&btc);
        assert_eq!(selector.counter(&btc), Some(0));
        assert_eq!(selector.next(&btc, 4).unwrap(), 0);
        assert_eq!(selector.counter(&btc), Some(1));
    }

    #[test]
    fn test_concurrent_picks_are_balanced() {
        let selector = Arc::new(RoundRobinSelector::new());
        let btc = key("btc");
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let selector = Arc::clone(&selector);
                let btc = btc.clone();
                thread::spawn(move || {
                    let mut hits = [0usize; 3];
                    for _ in 0..300 {
                        hits[selector.next(&btc, 3).unwrap()] += 1;
                    }
                    hits
                })
            })
            .collect();

        let mut totals = [0usize; 3];
        for handle in handles {
            let hits = handle.join().unwrap();
            for (total, h) in totals.iter_mut().zip(hits) {
                *total += h;
            }
        }
        assert_eq!(totals, [800, 800, 800]);
        assert_eq!(selector.counter(&btc), Some(2400));
    }

    proptest! {
        #[test]
        fn prop_distribution_is_fair(n in 0usize..500, m in 1usize..12) {
            let selector = RoundRobinSelector::new();
            let k = key("k");
            let mut hits = vec![0usize; m];
            for _ in 0..n {
                hits[selector.next(&k, m).unwrap()] += 1;
            }
            for h in hits {
                prop_assert!(h == n / m || h == n.div_ceil(m));
            }
        }
    }
}
