use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-attempt async locks shared by the answer, scoring and deletion paths.
///
/// Entries are dropped once no guard or waiter holds them. Entries left by
/// waiters that were cancelled are swept on the next acquire or release.
#[derive(Clone, Default)]
pub struct AttemptLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

pub struct AttemptGuard {
    _guard: OwnedMutexGuard<()>,
    attempt_id: String,
    locks: AttemptLocks,
}

impl AttemptLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, attempt_id: &str) -> AttemptGuard {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            sweep_unused(&mut map);
            map.entry(attempt_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        AttemptGuard {
            _guard: lock.lock_owned().await,
            attempt_id: attempt_id.to_string(),
            locks: self.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Drops entries only the map itself still references.
fn sweep_unused(map: &mut HashMap<String, Arc<AsyncMutex<()>>>) {
    map.retain(|_, lock| Arc::strong_count(lock) > 1);
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        let mut map = self.locks.inner.lock().unwrap_or_else(|e| e.into_inner());
        // map's Arc plus the one inside our guard
        if let Some(lock) = map.get(&self.attempt_id) {
            if Arc::strong_count(lock) <= 2 {
                map.remove(&self.attempt_id);
            }
        }
        sweep_unused(&mut map);
    }
}
