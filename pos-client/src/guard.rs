//! Pending-action flags
//!
//! A flag is raised for the lifetime of a guard. A second attempt while it
//! is raised is rejected with `SystemBusy` instead of being queued.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use shared::error::AppError;

/// Single in-flight flag for one action
#[derive(Debug)]
pub struct InFlight {
    action: &'static str,
    busy: AtomicBool,
}

impl InFlight {
    pub const fn new(action: &'static str) -> Self {
        Self {
            action,
            busy: AtomicBool::new(false),
        }
    }

    /// Raise the flag, or fail if it is already raised
    pub fn try_begin(&self) -> Result<InFlightGuard<'_>, AppError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlightGuard { flag: &self.busy })
            .map_err(|_| {
                tracing::debug!(action = self.action, "Rejected duplicate submission");
                AppError::busy(self.action)
            })
    }

    pub fn is_pending(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Lowers the flag on drop
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// In-flight flags keyed by target, e.g. one per order
#[derive(Debug)]
pub struct PendingSet<K: Eq + Hash> {
    action: &'static str,
    keys: Mutex<HashSet<K>>,
}

impl<K: Eq + Hash + Clone> PendingSet<K> {
    pub fn new(action: &'static str) -> Self {
        Self {
            action,
            keys: Mutex::new(HashSet::new()),
        }
    }

    pub fn try_begin(&self, key: K) -> Result<PendingGuard<'_, K>, AppError> {
        let mut keys = self.keys.lock();
        if !keys.insert(key.clone()) {
            return Err(AppError::busy(self.action));
        }
        Ok(PendingGuard { set: self, key })
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.keys.lock().contains(key)
    }
}

/// Clears its key on drop
pub struct PendingGuard<'a, K: Eq + Hash> {
    set: &'a PendingSet<K>,
    key: K,
}

impl<K: Eq + Hash> Drop for PendingGuard<'_, K> {
    fn drop(&mut self) {
        self.set.keys.lock().remove(&self.key);
    }
}
