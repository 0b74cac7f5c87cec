//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (the local
//! configuration surface, serial console) that the
//! [`AppService`](super::service::AppService) interprets and acts upon.

use crate::config::ConfigUpdate;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Apply a partial light configuration update.
    UpdateConfig(ConfigUpdate),

    /// Flip presence manually.  The next completed probe cycle may flip it
    /// back.
    TogglePresence,

    /// Persist the current light configuration on the next flush.
    SaveConfig,
}
