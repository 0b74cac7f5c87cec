//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (scan transport, LED strip, event sinks, storage)
//! implement these traits.  The [`AppService`](super::service::AppService)
//! consumes them via generics, so the domain core never touches hardware
//! directly.

use embassy_time::{Duration, Instant};

use crate::config::LightConfig;
use crate::error::ScanError;
use crate::light::color::Frame;

// ───────────────────────────────────────────────────────────────
// Scan port (driven adapter: domain → radio)
// ───────────────────────────────────────────────────────────────

/// Controls the wireless probe transport.
///
/// Matches observed while a cycle is open are not returned here; the
/// transport pushes them as [`ProbeMatch`](crate::presence::matcher::ProbeMatch)
/// records onto the probe queue and the main loop hands them to the tick.
pub trait ScanPort {
    /// Begin one probe cycle that lasts at most `duration`.
    fn start_probe_cycle(&mut self, duration: Duration) -> Result<(), ScanError>;

    /// End the current probe cycle.  A no-op when none is running.
    fn stop_probe_cycle(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Render port (driven adapter: domain → LED strip)
// ───────────────────────────────────────────────────────────────

/// Displays one solid frame on every pixel.  Synchronous; render failures
/// are not reported back.
pub trait RenderPort {
    fn render(&mut self, frame: &Frame);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the user-facing light configuration.
///
/// Implementations must reject out-of-range values with
/// [`ConfigError::ValidationFailed`] rather than clamping them.
pub trait ConfigPort {
    /// Load the stored record.  [`ConfigError::NotFound`] on first boot.
    fn load(&self) -> Result<LightConfig, ConfigError>;

    /// Validate and persist.
    fn save(&self, config: &LightConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source injected into the tick loop.
pub trait ClockPort {
    fn now(&self) -> Instant;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::NotFound => Self::Storage("config not found"),
            ConfigError::Corrupted => Self::Storage("config corrupted"),
            ConfigError::ValidationFailed(msg) => Self::Storage(msg),
            ConfigError::StorageFull => Self::Storage("storage full"),
            ConfigError::IoError => Self::Storage("I/O error"),
        }
    }
}
