//! Per-symbol mutual exclusion for check-then-act sequences
//!
//! The position check and the order that follows it are two separate exchange
//! calls. Holding the symbol's lock across both keeps two requests in this
//! process from passing the check before either order lands. Other processes
//! trading the same account are not covered.
//!
//! Entries live only while someone holds or waits for them, so the table does
//! not grow with the number of distinct symbols ever seen.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockTable = HashMap<String, Arc<AsyncMutex<()>>>;

#[derive(Debug, Default)]
pub struct SymbolLocks {
    locks: Mutex<LockTable>,
}

/// Exclusive access to one symbol; released on drop
#[derive(Debug)]
pub struct SymbolGuard<'a> {
    owner: &'a SymbolLocks,
    symbol: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl SymbolLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, LockTable> {
        self.locks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Wait for exclusive access to `symbol`
    pub async fn acquire(&self, symbol: &str) -> SymbolGuard<'_> {
        let lock = self
            .table()
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();

        SymbolGuard {
            owner: self,
            symbol: symbol.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }
}

impl Drop for SymbolGuard<'_> {
    fn drop(&mut self) {
        // Release first so our own handle no longer counts.
        drop(self.guard.take());

        // Waiters and in-flight acquirers hold a clone, so a count of one means
        // only the table references the mutex.
        let mut table = self.owner.table();
        let idle = table
            .get(&self.symbol)
            .map_or(false, |lock| Arc::strong_count(lock) == 1);
        if idle {
            table.remove(&self.symbol);
        }
    }
}
