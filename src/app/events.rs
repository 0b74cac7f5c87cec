//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them.

use serde::Serialize;

use crate::error::ScanError;
use crate::presence::PresenceEvent;
use crate::presence::matcher::MatchKind;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The service has started (carries the initial state).
    Started { present: bool, brightness: u8 },

    /// A probe cycle was started.
    ScanStarted,

    /// The transport refused a probe cycle; presence is unchanged.
    ScanFailed(ScanError),

    /// The tracked beacon was matched during the open cycle.
    BeaconMatched(MatchKind),

    /// A probe cycle closed with a decision.
    ScanCompleted { beacon_seen: bool },

    /// Occupancy flipped (by a probe cycle or manually).
    PresenceChanged { event: PresenceEvent, target: u8 },

    /// A configuration update was processed.
    ConfigApplied {
        applied: u8,
        rejected: u8,
        rendered: bool,
    },

    /// The light configuration was written to storage.
    ConfigSaved,

    /// Periodic status snapshot.
    Status(StatusSnapshot),
}

/// Point-in-time status, serialised with the keys the host surface uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    /// Network station connected.
    pub connected: bool,
    /// Occupancy as last inferred.
    pub beacon_found: bool,
    /// Rendered brightness.
    pub brightness: u8,
    pub is_away: bool,
}
