//! Built-in extensions.
//!
//! Each one subscribes to `start` and `complete` and works purely through
//! the cancellation token the orchestrator hands out on `start`:
//!
//! - [`UniqueExtension`]: at most one in-flight call per key
//! - [`AbortExtension`]: abort every in-flight call at once
//! - [`TimeoutExtension`]: abort calls that take too long

mod abort;
mod timeout;
mod unique;

pub use abort::AbortExtension;
pub use timeout::TimeoutExtension;
pub use unique::UniqueExtension;

use courier_core::{CancellationToken, OperationId};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-flight calls by key, shared between an extension's listeners.
#[derive(Debug)]
struct InFlight<K> {
    calls: Mutex<HashMap<K, (OperationId, CancellationToken)>>,
}

impl<K: std::hash::Hash + Eq> InFlight<K> {
    fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, (OperationId, CancellationToken)>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track `id` under `key`, returning the entry it replaced
    fn insert(
        &self,
        key: K,
        id: OperationId,
        token: CancellationToken,
    ) -> Option<(OperationId, CancellationToken)> {
        self.lock().insert(key, (id, token))
    }

    /// Forget `key` if it still tracks `id`
    fn remove_if(&self, key: &K, id: OperationId) {
        let mut calls = self.lock();
        if calls.get(key).is_some_and(|(tracked, _)| *tracked == id) {
            calls.remove(key);
        }
    }

    fn drain(&self) -> Vec<(OperationId, CancellationToken)> {
        self.lock().drain().map(|(_, entry)| entry).collect()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}
