//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the presence detector and the transition engine and
//! nothing else.  All I/O flows through port traits injected at call sites,
//! making the entire service testable with mock adapters.
//!
//! ```text
//!   ProbeMatch[] ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                    │          AppService          │
//!    ScanPort   ◀──  │  PresenceDetector ─▶ Engine  │ ──▶ RenderPort
//!                    └──────────────────────────────┘
//! ```
//!
//! Within one tick, presence evaluation runs before the brightness step, so
//! a presence flip is reflected in the very same tick's render.

use embassy_time::Instant;
use log::{info, warn};

use crate::config::{ConfigUpdate, LightConfig, SystemConfig};
use crate::error::Result;
use crate::light::{ConfigOutcome, TransitionEngine};
use crate::presence::matcher::ProbeMatch;
use crate::presence::{PresenceDetector, PresenceEvent};

use super::commands::AppCommand;
use super::events::{AppEvent, StatusSnapshot};
use super::ports::{ConfigPort, EventSink, RenderPort, ScanPort};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    presence: PresenceDetector,
    light: TransitionEngine,
    tick_count: u64,
    save_pending: bool,
}

impl AppService {
    /// Construct the service.  `config.light` seeds the engine; its
    /// `target_brightness` is ignored, the engine always starts at the away
    /// floor.
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            presence: PresenceDetector::new(config),
            light: TransitionEngine::new(&config.light),
            tick_count: 0,
            save_pending: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Push the initial (dark) frame and announce the start.
    pub fn start(&mut self, strip: &mut impl RenderPort, sink: &mut impl EventSink) {
        self.light.render(strip);
        let present = self.presence.is_present();
        let brightness = self.light.state().current;
        sink.emit(&AppEvent::Started {
            present,
            brightness,
        });
        info!(
            "AppService started (present={}, target={})",
            present,
            self.light.state().target
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle: presence → engine → render.
    ///
    /// The `hw` parameter satisfies **both** [`ScanPort`] and
    /// [`RenderPort`]; this avoids a double mutable borrow while keeping the
    /// port boundary explicit.
    pub fn tick(
        &mut self,
        now: Instant,
        matches: &[ProbeMatch],
        hw: &mut (impl ScanPort + RenderPort),
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;

        // 1. Presence state machine
        let t = self.presence.tick(now, matches, hw);

        if let Some(kind) = t.matched {
            sink.emit(&AppEvent::BeaconMatched(kind));
        }
        if let Some(beacon_seen) = t.completed {
            sink.emit(&AppEvent::ScanCompleted { beacon_seen });
        }
        if let Some(event) = t.event {
            self.apply_presence(event, sink);
        }
        if t.started {
            match t.failed {
                Some(e) => sink.emit(&AppEvent::ScanFailed(e)),
                None => sink.emit(&AppEvent::ScanStarted),
            }
        }

        // 2. Brightness step
        self.light.step(now, hw);
    }

    fn apply_presence(&mut self, event: PresenceEvent, sink: &mut impl EventSink) {
        let target = self.light.on_presence_event(event);
        sink.emit(&AppEvent::PresenceChanged { event, target });
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        strip: &mut impl RenderPort,
        sink: &mut impl EventSink,
    ) {
        match cmd {
            AppCommand::UpdateConfig(update) => {
                self.apply_update(update, 0, strip, sink);
            }
            AppCommand::TogglePresence => {
                let event = self.presence.toggle();
                self.apply_presence(event, sink);
            }
            AppCommand::SaveConfig => {
                self.save_pending = true;
                info!("Config save requested (flushes on next check)");
            }
        }
    }

    /// Parse a JSON update body and apply the valid fields.
    ///
    /// Fails only when the body is not a JSON object; rejected fields are
    /// counted in the emitted [`AppEvent::ConfigApplied`].
    pub fn apply_config_json(
        &mut self,
        body: &str,
        strip: &mut impl RenderPort,
        sink: &mut impl EventSink,
    ) -> Result<ConfigOutcome> {
        let parsed = ConfigUpdate::from_json(body).inspect_err(|e| {
            warn!("Config update rejected: {}", e);
        })?;
        let rejected = parsed.rejected.len() as u8;
        Ok(self.apply_update(parsed.update, rejected, strip, sink))
    }

    /// Range-check, then hand the surviving fields to the engine.  `rejected`
    /// counts fields the caller already dropped.
    fn apply_update(
        &mut self,
        update: ConfigUpdate,
        rejected: u8,
        strip: &mut impl RenderPort,
        sink: &mut impl EventSink,
    ) -> ConfigOutcome {
        let (update, dropped) = update.validated();
        let rejected = rejected.saturating_add(dropped.len() as u8);
        let outcome = self.light.on_config_update(&update, strip);
        sink.emit(&AppEvent::ConfigApplied {
            applied: outcome.applied,
            rejected,
            rendered: outcome.rendered,
        });
        info!(
            "Configuration updated at runtime ({} applied, {} rejected)",
            outcome.applied, rejected
        );
        outcome
    }

    // ── Persistence ───────────────────────────────────────────

    /// Write the light configuration if a save was requested.  Returns
    /// `true` if the config was saved.  A failed save is dropped, not
    /// retried.
    pub fn flush_config(
        &mut self,
        storage: &impl ConfigPort,
        sink: &mut impl EventSink,
    ) -> bool {
        if !self.save_pending {
            return false;
        }
        self.save_pending = false;
        match storage.save(&self.current_config()) {
            Ok(()) => {
                info!("Config saved to NVS");
                sink.emit(&AppEvent::ConfigSaved);
                true
            }
            Err(e) => {
                warn!("Config save failed: {}", e);
                false
            }
        }
    }

    /// Whether a save was requested and not yet flushed.
    pub fn is_save_pending(&self) -> bool {
        self.save_pending
    }

    // ── Queries ───────────────────────────────────────────────

    /// Full light configuration; `brightness` reports the live target.
    pub fn current_config(&self) -> LightConfig {
        self.light.config()
    }

    /// Status snapshot for the host surface.
    pub fn status(&self, connected: bool) -> StatusSnapshot {
        let present = self.presence.is_present();
        StatusSnapshot {
            connected,
            beacon_found: present,
            brightness: self.light.state().current,
            is_away: !present,
        }
    }

    /// Emit a [`AppEvent::Status`] snapshot.
    pub fn report_status(&self, connected: bool, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Status(self.status(connected)));
    }

    pub fn presence(&self) -> &PresenceDetector {
        &self.presence
    }

    pub fn light(&self) -> &TransitionEngine {
        &self.light
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}
