//! Global uniqueness registry for emitted voucher codes.

use std::collections::HashSet;
use std::sync::Mutex;

/// Process-scoped set of codes already emitted across all workers.
///
/// Membership test-and-insert is a single serialized operation, so the
/// same key can never be reported as newly inserted twice.
#[derive(Debug, Default)]
pub struct DedupRegistry {
    seen: Mutex<HashSet<String>>,
}

impl DedupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `key` if absent. Returns `true` when the key was newly
    /// inserted; only that result authorizes decrementing the target
    /// counter and emitting a result event.
    pub fn insert_if_absent(&self, key: &str) -> bool {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        seen.insert(key.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_insert_reports_once() {
        let registry = DedupRegistry::new();
        assert!(registry.insert_if_absent("a1"));
        assert!(!registry.insert_if_absent("a1"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn grows_by_at_most_one_per_distinct_key() {
        let registry = DedupRegistry::new();
        for _ in 0..3 {
            registry.insert_if_absent("a1");
            registry.insert_if_absent("a2");
        }
        assert_eq!(registry.len(), 2);
    }
}
