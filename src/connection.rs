//! Concurrent-connection admission per identity.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Caps the number of simultaneous connections an identity may hold.
///
/// The WebSocket upgrade path calls [`allow`](Self::allow) before accepting a
/// connection and must call [`release`](Self::release) exactly once when that
/// connection later closes, if and only if `allow` returned `true` for it.
#[derive(Clone)]
pub struct ConnectionLimiter {
    /// Identity key -> live connection count. Keys at zero are removed.
    connections: Arc<RwLock<HashMap<String, usize>>>,
    max_per_user: usize,
}

impl ConnectionLimiter {
    /// `max_per_user == 0` is the degenerate configuration: every `allow`
    /// call is refused.
    #[must_use]
    pub fn new(max_per_user: usize) -> Self {
        Self { connections: Arc::new(RwLock::new(HashMap::new())), max_per_user }
    }

    /// Admit one more connection for `key`, or refuse without side effect.
    pub fn allow(&self, key: &str) -> bool {
        let mut connections = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let count = connections.get(key).copied().unwrap_or(0);
        if count >= self.max_per_user {
            return false;
        }
        connections.insert(key.to_string(), count + 1);
        true
    }

    /// Record one connection for `key` as closed.
    ///
    /// A count that would reach zero removes the key entirely so idle
    /// identities do not accumulate. Releasing a key with no recorded
    /// connections is a no-op; the count never underflows.
    pub fn release(&self, key: &str) {
        let mut connections = self
            .connections
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(count) = connections.get_mut(key) {
            if *count <= 1 {
                connections.remove(key);
            } else {
                *count -= 1;
            }
        }
    }

    /// Current live connection count for `key`. Absent keys read as zero.
    #[must_use]
    pub fn count(&self, key: &str) -> usize {
        let connections = self
            .connections
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        connections.get(key).copied().unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "connection_test.rs"]
mod tests;
