//! In-process soft locks guarding topic-creation and inbox-card races.
//!
//! These are advisory, not mutual-exclusion primitives: a lost lock (e.g.
//! after a crash) just means the next caller might redo a little work, never
//! that correctness depends on holding it. Each key gets a deadline instead
//! of a held guard, so a caller that panics or is dropped never wedges the
//! key forever.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct SoftLockMap {
    ttl: Duration,
    deadlines: Mutex<HashMap<String, Instant>>,
}

impl SoftLockMap {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: Duration::from_secs(ttl_secs),
            deadlines: Mutex::new(HashMap::new()),
        }
    }

    /// Try to acquire `key`. Returns `true` if the caller now holds it (no
    /// unexpired entry existed), `false` if someone else currently holds it.
    pub fn try_acquire(&self, key: &str) -> bool {
        let mut map = self.deadlines.lock().unwrap();
        let now = Instant::now();
        if let Some(deadline) = map.get(key) {
            if *deadline > now {
                return false;
            }
        }
        map.insert(key.to_string(), now + self.ttl);
        true
    }

    pub fn release(&self, key: &str) {
        let mut map = self.deadlines.lock().unwrap();
        map.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_first_holds() {
        let locks = SoftLockMap::new(5);
        assert!(locks.try_acquire("a"));
        assert!(!locks.try_acquire("a"));
    }

    #[test]
    fn release_allows_reacquire() {
        let locks = SoftLockMap::new(5);
        assert!(locks.try_acquire("a"));
        locks.release("a");
        assert!(locks.try_acquire("a"));
    }

    #[test]
    fn independent_keys_do_not_interfere() {
        let locks = SoftLockMap::new(5);
        assert!(locks.try_acquire("a"));
        assert!(locks.try_acquire("b"));
    }

    #[test]
    fn expired_deadline_allows_reacquire() {
        let locks = SoftLockMap::new(0);
        assert!(locks.try_acquire("a"));
        std::thread::sleep(Duration::from_millis(5));
        assert!(locks.try_acquire("a"));
    }
}
