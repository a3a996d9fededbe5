//! Per-key in-flight de-duplication
//!
//! Concurrent requests for the same cache key serialize on a per-key lock.
//! The first holder runs the expensive analysis and fills the cache; the
//! others re-check the cache once they get the lock and find the answer
//! there. Lock entries are dropped from the table once nobody holds or
//! waits on them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

type FlightTable = HashMap<String, Arc<AsyncMutex<()>>>;

#[derive(Clone, Default)]
pub struct SingleFlight {
    flights: Arc<Mutex<FlightTable>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other caller holds `key`, then hold it
    pub async fn acquire(&self, key: &str) -> FlightGuard {
        let slot = {
            let mut flights = lock_table(&self.flights);
            flights
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        if slot.try_lock().is_err() {
            debug!("Waiting on in-flight query: {}", key);
        }

        let guard = slot.lock_owned().await;

        FlightGuard {
            key: key.to_string(),
            flights: self.flights.clone(),
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or awaited
    pub fn in_flight(&self) -> usize {
        lock_table(&self.flights).len()
    }
}

/// Holds a key until dropped
pub struct FlightGuard {
    key: String,
    flights: Arc<Mutex<FlightTable>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl FlightGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        // Release the lock (and its Arc) before inspecting the table
        self.guard.take();

        let mut flights = lock_table(&self.flights);
        let idle = flights
            .get(&self.key)
            .map(|slot| Arc::strong_count(slot) == 1)
            .unwrap_or(false);
        if idle {
            flights.remove(&self.key);
        }
    }
}

fn lock_table(flights: &Mutex<FlightTable>) -> MutexGuard<'_, FlightTable> {
    // The table holds no invariants a panicking holder could break
    flights.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
