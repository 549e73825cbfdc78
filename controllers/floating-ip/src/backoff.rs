//! # Escalating Backoff
//!
//! Delay between outer association attempts. Each delay is a fixed base plus a
//! step for every attempt already consumed, so later attempts wait longer.
//! With the defaults (1s base, 1s step): 2s, 3s, 4s, 5s, 6s, 7s.

use std::time::Duration;

/// Linear backoff calculator
///
/// Generates `base + step * consumed` and advances `consumed` on every call.
#[derive(Debug, Clone)]
pub struct EscalatingBackoff {
    base: Duration,
    step: Duration,
    /// Attempts consumed so far
    consumed: u32,
}

impl EscalatingBackoff {
    /// Create a new backoff with the given base and per-attempt step
    #[must_use]
    pub fn new(base: Duration, step: Duration) -> Self {
        Self {
            base,
            step,
            consumed: 0,
        }
    }

    /// Record one consumed attempt and return the delay before the next one
    pub fn next_backoff(&mut self) -> Duration {
        self.consumed = self.consumed.saturating_add(1);
        Self::calculate_for_attempts(self.consumed, self.base, self.step)
    }

    /// Delay after `consumed` attempts (stateless)
    #[must_use]
    pub fn calculate_for_attempts(consumed: u32, base: Duration, step: Duration) -> Duration {
        base.saturating_add(step.saturating_mul(consumed))
    }
}
