//! Module: lock
//! Responsibility: process-wide per-table mutual exclusion.
//! Does not own: SQL transactions — the table lock is orthogonal to them
//! and protects only engine callers inside this process.

use parking_lot::{
    Mutex, RawMutex, RawThreadId, ReentrantMutex,
    lock_api::ArcReentrantMutexGuard,
};
use std::{collections::HashMap, sync::Arc};

///
/// LockRegistry
///
/// Lock table keyed by (database identity, table name), owned by one shared
/// coordination context injected into every engine instance — never a
/// module-level global. Locks are re-entrant per thread, so an engine
/// operation that takes the lock may be called under a caller-held
/// `begin_table_update` guard.
///

#[derive(Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<(String, String), Arc<ReentrantMutex<()>>>>,
}

impl LockRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the (database, table) lock is held; returns the guard.
    #[must_use]
    pub fn lock(&self, database: &str, table: &str) -> TableLockGuard {
        let mutex = {
            let mut locks = self.locks.lock();
            locks
                .entry((database.to_string(), table.to_string()))
                .or_insert_with(|| Arc::new(ReentrantMutex::new(())))
                .clone()
        };

        TableLockGuard {
            _guard: ReentrantMutex::lock_arc(&mutex),
        }
    }
}

///
/// TableLockGuard
///
/// Held for the duration of a dedup-sensitive operation; dropping it
/// releases the table.
///

pub struct TableLockGuard {
    _guard: ArcReentrantMutexGuard<RawMutex, RawThreadId, ()>,
}
