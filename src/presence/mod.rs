//! Presence detection state machine.
//!
//! ```text
//!        ┌───────── scan_interval elapsed ─────────┐
//!        ▼                                          │
//!   ┌─────────┐  start_probe_cycle   ┌──────────┐   │
//!   │  IDLE   │ ───────────────────▶ │ SCANNING │ ──┘ scan_duration elapsed:
//!   └─────────┘                      └──────────┘     stop, decide presence
//!                                     ▲  │
//!                  ProbeMatch ────────┘  └─ beacon_seen |= matcher(probe)
//! ```
//!
//! The detector owns [`PresenceState`] and is driven exclusively by
//! [`PresenceDetector::tick`].  Probe matches are handed in by the caller
//! (drained from the probe queue); matches arriving while no cycle is open
//! are discarded so `beacon_seen` never leaks across cycles.

pub mod debounce;
pub mod matcher;

use embassy_time::{Duration, Instant};
use log::{debug, info, warn};

use crate::app::ports::ScanPort;
use crate::config::SystemConfig;
use crate::error::ScanError;

use self::debounce::Debouncer;
use self::matcher::{BeaconMatcher, MatchKind, ProbeMatch};

/// Presence transition emitted when a completed cycle flips occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceEvent {
    Present,
    Away,
}

impl PresenceEvent {
    fn from_present(present: bool) -> Self {
        if present { Self::Present } else { Self::Away }
    }
}

/// Scan/debounce state.  Mutated only by [`PresenceDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceState {
    /// A probe cycle is in flight.
    pub scanning: bool,
    /// Start of the in-flight cycle; meaningful only while `scanning`.
    pub scan_started_at: Instant,
    /// A qualifying match was seen in the in-flight cycle.
    pub beacon_seen: bool,
    /// Inferred occupancy.
    pub present: bool,
    /// Start time of the most recent cycle, successful or not.
    pub last_scan_at: Option<Instant>,
    /// The transport refused to start the in-flight cycle.
    pub cycle_failed: bool,
}

impl Default for PresenceState {
    fn default() -> Self {
        Self {
            scanning: false,
            scan_started_at: Instant::from_ticks(0),
            beacon_seen: false,
            present: false,
            last_scan_at: None,
            cycle_failed: false,
        }
    }
}

/// What happened during one [`PresenceDetector::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PresenceTick {
    /// First qualifying match of the in-flight cycle, if it arrived this tick.
    pub matched: Option<MatchKind>,
    /// A cycle closed with a decision; carries `beacon_seen`.
    pub completed: Option<bool>,
    /// A new cycle was started (or attempted).
    pub started: bool,
    /// The transport refused the new cycle.
    pub failed: Option<ScanError>,
    /// Presence flipped.
    pub event: Option<PresenceEvent>,
}

pub struct PresenceDetector {
    state: PresenceState,
    matcher: BeaconMatcher,
    debouncer: Debouncer,
    scan_interval: Duration,
    scan_duration: Duration,
}

impl PresenceDetector {
    /// Fail-safe start: not present, no cycle yet.  The first tick starts
    /// the first cycle.
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            state: PresenceState::default(),
            matcher: BeaconMatcher::new(config.beacon.clone()),
            debouncer: Debouncer::new(config.debounce),
            scan_interval: Duration::from_millis(u64::from(config.scan_interval_ms)),
            scan_duration: Duration::from_millis(u64::from(config.scan_duration_ms)),
        }
    }

    /// Feed one probe match.  Returns the match kind the first time the
    /// in-flight cycle sees the beacon; `None` for repeats, non-matches and
    /// matches outside an open cycle.
    pub fn observe(&mut self, probe: &ProbeMatch) -> Option<MatchKind> {
        let s = &mut self.state;
        if !s.scanning || s.cycle_failed || s.beacon_seen {
            return None;
        }
        let kind = self.matcher.matches(probe)?;
        s.beacon_seen = true;
        info!(
            "Presence: beacon matched by {} ({})",
            kind.as_str(),
            probe.identifier
        );
        Some(kind)
    }

    /// Advance the state machine: ingest matches, close a due cycle, start
    /// the next one when the interval has elapsed.
    pub fn tick<S: ScanPort>(
        &mut self,
        now: Instant,
        matches: &[ProbeMatch],
        scan: &mut S,
    ) -> PresenceTick {
        let mut out = PresenceTick::default();

        for probe in matches {
            if let Some(kind) = self.observe(probe) {
                out.matched = Some(kind);
            }
        }

        if self.state.scanning
            && now.saturating_duration_since(self.state.scan_started_at) >= self.scan_duration
        {
            self.close_cycle(scan, &mut out);
        }

        if !self.state.scanning && self.interval_elapsed(now) {
            self.start_cycle(now, scan, &mut out);
        }

        out
    }

    fn interval_elapsed(&self, now: Instant) -> bool {
        self.state
            .last_scan_at
            .is_none_or(|last| now.saturating_duration_since(last) >= self.scan_interval)
    }

    fn start_cycle<S: ScanPort>(&mut self, now: Instant, scan: &mut S, out: &mut PresenceTick) {
        let s = &mut self.state;
        s.scanning = true;
        s.scan_started_at = now;
        s.beacon_seen = false;
        s.last_scan_at = Some(now);
        s.cycle_failed = false;
        out.started = true;

        if let Err(e) = scan.start_probe_cycle(self.scan_duration) {
            warn!("Presence: probe cycle not started: {}", e);
            s.cycle_failed = true;
            out.failed = Some(e);
        } else {
            debug!("Presence: probe cycle started");
        }
    }

    fn close_cycle<S: ScanPort>(&mut self, scan: &mut S, out: &mut PresenceTick) {
        scan.stop_probe_cycle();
        let s = &mut self.state;
        s.scanning = false;

        if s.cycle_failed {
            // No observation was possible: last known presence persists.
            s.cycle_failed = false;
            return;
        }

        let seen = s.beacon_seen;
        out.completed = Some(seen);
        debug!("Presence: probe cycle done, beacon_seen={}", seen);

        if let Some(present) = self.debouncer.decide(seen, s.present) {
            s.present = present;
            let event = PresenceEvent::from_present(present);
            info!("Presence: {:?}", event);
            out.event = Some(event);
        }
    }

    /// Manual override.  The next completed cycle may override it again.
    pub fn force_presence(&mut self, present: bool) -> Option<PresenceEvent> {
        self.debouncer.reset();
        if self.state.present == present {
            return None;
        }
        self.state.present = present;
        let event = PresenceEvent::from_present(present);
        info!("Presence: forced {:?}", event);
        Some(event)
    }

    /// Flip presence manually.
    pub fn toggle(&mut self) -> PresenceEvent {
        let present = !self.state.present;
        self.debouncer.reset();
        self.state.present = present;
        let event = PresenceEvent::from_present(present);
        info!("Presence: toggled {:?}", event);
        event
    }

    pub fn is_present(&self) -> bool {
        self.state.present
    }

    pub fn state(&self) -> &PresenceState {
        &self.state
    }
}
