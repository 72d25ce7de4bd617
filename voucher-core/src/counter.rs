//! Shared goal countdown and the cooperative termination protocol.

use std::sync::atomic::{AtomicI64, Ordering};

/// Countdown of remaining required unique successes.
///
/// Workers read [`TargetCounter::is_met`] at the top of each loop
/// iteration (non-blocking) and call [`TargetCounter::record_success`]
/// once per confirmed-unique success. The read and the decrement are
/// independent operations: with `C` concurrently active workers the
/// final number of unique successes may exceed the goal by up to
/// `C - 1`. That tolerance is part of the termination contract.
#[derive(Debug)]
pub struct TargetCounter {
    remaining: AtomicI64,
}

impl TargetCounter {
    pub fn new(goal: i64) -> Self {
        Self {
            remaining: AtomicI64::new(goal),
        }
    }

    /// Non-blocking read of the remaining count. May go negative
    /// under worst-case interleaving; never resets.
    pub fn remaining(&self) -> i64 {
        self.remaining.load(Ordering::SeqCst)
    }

    /// Terminal read: `true` once the goal has been reached (or
    /// overshot). Workers must stop without further attempts.
    pub fn is_met(&self) -> bool {
        self.remaining() <= 0
    }

    /// Decrements by exactly one. Call only after the dedup registry
    /// confirmed the success as newly inserted.
    pub fn record_success(&self) {
        self.remaining.fetch_sub(1, Ordering::SeqCst);
    }
}
