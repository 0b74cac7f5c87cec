//! Debounce of per-cycle probe outcomes into a stable presence signal.

use serde::{Deserialize, Serialize};

/// How many negative probe cycles it takes to declare the beacon gone.
///
/// A positive cycle always declares presence immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DebouncePolicy {
    /// One empty cycle flips present → away.
    #[default]
    SingleCycle,
    /// `n` consecutive empty cycles flip present → away.  `0` behaves as `1`.
    ConsecutiveMisses(u8),
}

impl DebouncePolicy {
    /// Number of consecutive misses needed before declaring away.
    pub fn required_misses(self) -> u8 {
        match self {
            Self::SingleCycle => 1,
            Self::ConsecutiveMisses(n) => n.max(1),
        }
    }
}

/// Miss counter applying a [`DebouncePolicy`].
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    policy: DebouncePolicy,
    misses: u8,
}

impl Debouncer {
    pub fn new(policy: DebouncePolicy) -> Self {
        Self { policy, misses: 0 }
    }

    /// Feed one completed cycle.  Returns the new presence value when it
    /// differs from `present`, `None` otherwise.
    pub fn decide(&mut self, beacon_seen: bool, present: bool) -> Option<bool> {
        if beacon_seen {
            self.misses = 0;
            return (!present).then_some(true);
        }
        if !present {
            return None;
        }
        self.misses = self.misses.saturating_add(1);
        if self.misses >= self.policy.required_misses() {
            self.misses = 0;
            Some(false)
        } else {
            None
        }
    }

    /// Forget accumulated misses (after a manual override).
    pub fn reset(&mut self) {
        self.misses = 0;
    }

    pub fn misses(&self) -> u8 {
        self.misses
    }

    pub fn policy(&self) -> DebouncePolicy {
        self.policy
    }
}
