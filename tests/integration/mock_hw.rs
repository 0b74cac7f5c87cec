//! Mock adapters for integration tests.
//!
//! Records every scan and render call so tests can assert on the full
//! history without a radio or an LED strip.

use std::cell::{Cell, RefCell};

use beaconlight::app::events::AppEvent;
use beaconlight::app::ports::{ConfigError, ConfigPort, EventSink, RenderPort, ScanPort};
use beaconlight::config::LightConfig;
use beaconlight::error::ScanError;
use beaconlight::light::color::Frame;
use beaconlight::presence::PresenceEvent;
use embassy_time::{Duration, Instant};

pub fn at(ms: u64) -> Instant {
    Instant::from_millis(ms)
}

// ── MockHw ────────────────────────────────────────────────────

/// Scanner and strip in one, the shape `AppService::tick` expects.
#[derive(Default)]
pub struct MockHw {
    pub frames: Vec<Frame>,
    pub starts: Vec<Duration>,
    pub stops: u32,
    /// Every `start_probe_cycle` fails with this error while set.
    pub fail_with: Option<ScanError>,
}

#[allow(dead_code)]
impl MockHw {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn last_brightness(&self) -> Option<u8> {
        self.frames.last().map(|f| f.brightness)
    }
}

impl ScanPort for MockHw {
    fn start_probe_cycle(&mut self, duration: Duration) -> Result<(), ScanError> {
        if let Some(e) = self.fail_with {
            return Err(e);
        }
        self.starts.push(duration);
        Ok(())
    }

    fn stop_probe_cycle(&mut self) {
        self.stops += 1;
    }
}

impl RenderPort for MockHw {
    fn render(&mut self, frame: &Frame) {
        self.frames.push(*frame);
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presence_changes(&self) -> Vec<PresenceEvent> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::PresenceChanged { event, .. } => Some(*event),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── MockConfigStore ───────────────────────────────────────────

#[derive(Default)]
pub struct MockConfigStore {
    pub stored: RefCell<Option<LightConfig>>,
    pub saves: Cell<u32>,
    pub fail_with: Option<ConfigError>,
}

#[allow(dead_code)]
impl MockConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(e: ConfigError) -> Self {
        Self {
            fail_with: Some(e),
            ..Self::default()
        }
    }
}

impl ConfigPort for MockConfigStore {
    fn load(&self) -> Result<LightConfig, ConfigError> {
        (*self.stored.borrow()).ok_or(ConfigError::NotFound)
    }

    fn save(&self, config: &LightConfig) -> Result<(), ConfigError> {
        self.saves.set(self.saves.get() + 1);
        if let Some(e) = self.fail_with {
            return Err(e);
        }
        *self.stored.borrow_mut() = Some(*config);
        Ok(())
    }
}
