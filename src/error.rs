//! Unified error types for the beaconlight firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level loop's error handling uniform.  All variants are `Copy` so they
//! can be passed through the tick loop and the event sink without allocation.
//!
//! None of these errors is fatal: the core always degrades to "last known
//! state persists".

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The scan transport could not run a probe cycle.
    Scan(ScanError),
    /// A single configuration field was rejected.
    Config(ConfigFieldError),
    /// A configuration body could not be parsed at all.
    Parse(&'static str),
    /// Persistent storage failed.
    Storage(&'static str),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scan(e) => write!(f, "scan: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Parse(msg) => write!(f, "parse: {msg}"),
            Self::Storage(msg) => write!(f, "storage: {msg}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Scan transport errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanError {
    /// The radio stack is not initialised or refused to start scanning.
    TransportUnavailable,
    /// The transport reports a scan already in progress.
    Busy,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransportUnavailable => write!(f, "scan transport unavailable"),
            Self::Busy => write!(f, "scan already in progress"),
        }
    }
}

impl From<ScanError> for Error {
    fn from(e: ScanError) -> Self {
        Self::Scan(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration field errors
// ---------------------------------------------------------------------------

/// Why a single field of a configuration update was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRejection {
    /// Numeric value outside the declared range.
    OutOfRange,
    /// Value has the wrong JSON type (e.g. a string where a number belongs).
    WrongType,
}

/// A rejected field of a partial configuration update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigFieldError {
    /// Wire name of the field (e.g. `"colorTemp"`).
    pub field: &'static str,
    pub reason: FieldRejection,
}

impl fmt::Display for ConfigFieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            FieldRejection::OutOfRange => write!(f, "'{}' out of range", self.field),
            FieldRejection::WrongType => write!(f, "'{}' has the wrong type", self.field),
        }
    }
}

impl From<ConfigFieldError> for Error {
    fn from(e: ConfigFieldError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_subsystem_prefix() {
        let e: Error = ScanError::TransportUnavailable.into();
        assert_eq!(e.to_string(), "scan: scan transport unavailable");

        let e: Error = ConfigFieldError {
            field: "colorTemp",
            reason: FieldRejection::OutOfRange,
        }
        .into();
        assert_eq!(e.to_string(), "config: 'colorTemp' out of range");
    }
}
