//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink {
    emitted: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events logged since construction.
    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        self.emitted = self.emitted.wrapping_add(1);
        match event {
            AppEvent::Started {
                present,
                brightness,
            } => {
                info!("START | present={} | brightness={}", present, brightness);
            }
            AppEvent::ScanStarted => {
                log::debug!("SCAN | started");
            }
            AppEvent::ScanFailed(e) => {
                warn!("SCAN | failed: {} | presence unchanged", e);
            }
            AppEvent::BeaconMatched(kind) => {
                info!("SCAN | beacon matched by {}", kind.as_str());
            }
            AppEvent::ScanCompleted { beacon_seen } => {
                log::debug!("SCAN | done | beacon_seen={}", beacon_seen);
            }
            AppEvent::PresenceChanged { event, target } => {
                info!("PRESENCE | {:?} | target={}", event, target);
            }
            AppEvent::ConfigApplied {
                applied,
                rejected,
                rendered,
            } => {
                info!(
                    "CONFIG | applied={} rejected={} | rendered={}",
                    applied, rejected, rendered
                );
            }
            AppEvent::ConfigSaved => {
                info!("CONFIG | saved");
            }
            AppEvent::Status(s) => {
                info!(
                    "STATUS | connected={} | beacon={} | brightness={} | away={}",
                    s.connected, s.beacon_found, s.brightness, s.is_away
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::events::StatusSnapshot;
    use crate::error::ScanError;

    #[test]
    fn counts_every_event() {
        let mut sink = LogEventSink::new();
        sink.emit(&AppEvent::ScanStarted);
        sink.emit(&AppEvent::ScanFailed(ScanError::Busy));
        sink.emit(&AppEvent::Status(StatusSnapshot {
            connected: false,
            beacon_found: true,
            brightness: 255,
            is_away: false,
        }));
        assert_eq!(sink.emitted(), 3);
    }
}
