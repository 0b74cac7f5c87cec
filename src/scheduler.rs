//! Fixed-period tick scheduling driven by an injected clock.
//!
//! The main loop owns one [`TickScheduler`] per periodic job (control tick,
//! status report) and polls each with the current time:
//!
//! ```text
//!   ClockPort::now() ──▶ TickScheduler::poll ──▶ due? ──▶ AppService::tick()
//!                               │
//!                               └─▶ time_until_due ──▶ sleep
//! ```
//!
//! Deadlines advance by whole periods so the cadence does not drift with
//! loop jitter.  When the loop falls more than [`MAX_DRIFT_PERIODS`] behind
//! (flash write, long log burst) the backlog is skipped instead of replayed.

use embassy_time::{Duration, Instant};
use log::warn;

/// Backlog, in periods, after which missed ticks are skipped.
pub const MAX_DRIFT_PERIODS: u32 = 2;

#[derive(Debug, Clone)]
pub struct TickScheduler {
    /// Human-readable label for log lines (e.g. "control").
    label: &'static str,
    period: Duration,
    next_due: Option<Instant>,
    overruns: u32,
}

impl TickScheduler {
    pub fn new(label: &'static str, period: Duration) -> Self {
        Self {
            label,
            period,
            next_due: None,
            overruns: 0,
        }
    }

    /// True when the tick is due.  The first poll is always due.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(due) = self.next_due else {
            self.next_due = Some(now + self.period);
            return true;
        };
        if now < due {
            return false;
        }

        let behind = now.saturating_duration_since(due);
        if behind > self.period * MAX_DRIFT_PERIODS {
            self.overruns = self.overruns.saturating_add(1);
            warn!(
                "Scheduler '{}': {} ms behind, skipping backlog",
                self.label,
                behind.as_millis()
            );
            self.next_due = Some(now + self.period);
        } else {
            self.next_due = Some(due + self.period);
        }
        true
    }

    /// Time left until the next deadline; zero when already due.
    pub fn time_until_due(&self, now: Instant) -> Duration {
        self.next_due
            .map_or(Duration::from_ticks(0), |due| due.saturating_duration_since(now))
    }

    /// Number of times the backlog was skipped.
    pub fn overruns(&self) -> u32 {
        self.overruns
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
