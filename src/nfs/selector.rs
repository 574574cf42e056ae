//! Server Selection
//!
//! Picks one server out of a pool per provisioning request. Round-robin
//! counters are owned by the selector, one per storage class.

use crate::domain::ports::ServerRecord;
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

// =============================================================================
// Selection Strategy
// =============================================================================

/// How a server is chosen when a pool has more than one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionStrategy {
    /// Cycle through servers, per storage class
    #[default]
    RoundRobin,
    /// Uniform random pick
    Random,
    /// Always the first server
    First,
}

impl SelectionStrategy {
    /// Parse a strategy name; unrecognised names select [`SelectionStrategy::First`]
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "roundrobin" => SelectionStrategy::RoundRobin,
            "random" => SelectionStrategy::Random,
            _ => SelectionStrategy::First,
        }
    }

    /// Strategy for an optional storage class parameter
    pub fn from_parameter(value: Option<&str>) -> Self {
        value.map(Self::parse).unwrap_or_default()
    }
}

impl std::fmt::Display for SelectionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionStrategy::RoundRobin => write!(f, "roundrobin"),
            SelectionStrategy::Random => write!(f, "random"),
            SelectionStrategy::First => write!(f, "first"),
        }
    }
}

// =============================================================================
// Server Selector
// =============================================================================

/// Server selector owning the round-robin state
///
/// One instance lives for the whole process; counters are never reset.
#[derive(Debug, Default)]
pub struct ServerSelector {
    counters: Mutex<HashMap<String, u64>>,
}

impl ServerSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a server from `pool`
    ///
    /// Returns `None` only for an empty pool, which callers reject before
    /// selecting.
    pub fn select<'a>(
        &self,
        pool: &'a [ServerRecord],
        class_key: &str,
        strategy: SelectionStrategy,
    ) -> Option<&'a ServerRecord> {
        match pool.len() {
            0 => None,
            1 => pool.first(),
            len => {
                let index = match strategy {
                    SelectionStrategy::RoundRobin => (self.next_count(class_key) % len as u64) as usize,
                    SelectionStrategy::Random => rand::thread_rng().gen_range(0..len),
                    SelectionStrategy::First => 0,
                };
                pool.get(index)
            }
        }
    }

    /// Select a server, degrading to the first one if selection yields nothing
    pub fn select_or_first<'a>(
        &self,
        pool: &'a [ServerRecord],
        class_key: &str,
        strategy: SelectionStrategy,
    ) -> Option<&'a ServerRecord> {
        self.select(pool, class_key, strategy).or_else(|| {
            warn!(
                "Server selection for class {} ({}) returned nothing, using first server",
                class_key, strategy
            );
            pool.first()
        })
    }

    /// Atomically read and increment the counter for a class
    fn next_count(&self, class_key: &str) -> u64 {
        let mut counters = self.counters.lock();
        let counter = counters.entry(class_key.to_string()).or_insert(0);
        let count = *counter;
        *counter = counter.wrapping_add(1);
        count
    }

    /// Current counter value for a class
    pub fn counter(&self, class_key: &str) -> u64 {
        self.counters.lock().get(class_key).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn pool(n: usize) -> Vec<ServerRecord> {
        (0..n)
            .map(|i| ServerRecord {
                address: format!("10.0.0.{}", i + 1),
                export_path: "/export".into(),
            })
            .collect()
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!(SelectionStrategy::parse("RoundRobin"), SelectionStrategy::RoundRobin);
        assert_eq!(SelectionStrategy::parse("ROUNDROBIN"), SelectionStrategy::RoundRobin);
        assert_eq!(SelectionStrategy::parse("random"), SelectionStrategy::Random);
        assert_eq!(SelectionStrategy::parse("least-used"), SelectionStrategy::First);
        assert_eq!(SelectionStrategy::from_parameter(None), SelectionStrategy::RoundRobin);
    }

    #[test]
    fn test_empty_pool() {
        let selector = ServerSelector::new();
        assert!(selector.select(&[], "gold", SelectionStrategy::RoundRobin).is_none());
        assert!(selector.select_or_first(&[], "gold", SelectionStrategy::Random).is_none());
    }

    #[test]
    fn test_single_server_skips_strategy() {
        let selector = ServerSelector::new();
        let servers = pool(1);

        for strategy in [
            SelectionStrategy::RoundRobin,
            SelectionStrategy::Random,
            SelectionStrategy::First,
        ] {
            assert_eq!(selector.select(&servers, "gold", strategy), Some(&servers[0]));
        }
        // No counter was consumed
        assert_eq!(selector.counter("gold"), 0);
    }

    #[test]
    fn test_round_robin_cycles() {
        let selector = ServerSelector::new();
        let servers = pool(3);
        let k = 4;

        let picked: Vec<_> = (0..servers.len() * k)
            .map(|_| {
                selector
                    .select(&servers, "gold", SelectionStrategy::RoundRobin)
                    .unwrap()
                    .address
                    .clone()
            })
            .collect();

        for (i, address) in picked.iter().enumerate() {
            assert_eq!(address, &servers[i % servers.len()].address);
        }
        assert_eq!(selector.counter("gold"), 12);
    }

    #[test]
    fn test_round_robin_classes_independent() {
        let selector = ServerSelector::new();
        let servers = pool(2);

        let a = selector.select(&servers, "gold", SelectionStrategy::RoundRobin).unwrap();
        let b = selector.select(&servers, "silver", SelectionStrategy::RoundRobin).unwrap();
        let c = selector.select(&servers, "gold", SelectionStrategy::RoundRobin).unwrap();

        assert_eq!(a, &servers[0]);
        assert_eq!(b, &servers[0]);
        assert_eq!(c, &servers[1]);
    }

    #[test]
    fn test_first_and_random() {
        let selector = ServerSelector::new();
        let servers = pool(4);

        for _ in 0..20 {
            assert_eq!(
                selector.select(&servers, "gold", SelectionStrategy::First),
                Some(&servers[0])
            );
            let picked = selector.select(&servers, "gold", SelectionStrategy::Random).unwrap();
            assert!(servers.contains(picked));
        }
        assert_eq!(selector.counter("gold"), 0);
    }

    #[test]
    fn test_round_robin_concurrent_counts_unique() {
        let selector = Arc::new(ServerSelector::new());
        let threads = 8;
        let per_thread = 250;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let selector = selector.clone();
                std::thread::spawn(move || {
                    (0..per_thread)
                        .map(|_| selector.next_count("gold"))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for count in handle.join().unwrap() {
                assert!(seen.insert(count), "counter value {} observed twice", count);
            }
        }
        assert_eq!(seen.len(), threads * per_thread);
        assert_eq!(selector.counter("gold"), (threads * per_thread) as u64);
    }
}
