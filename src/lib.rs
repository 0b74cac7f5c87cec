//! Beaconlight firmware library.
//!
//! Presence-aware ambient lighting: a BLE beacon scan decides whether the
//! room is occupied, and the strip fades between full brightness and a
//! dimmed away level.  Exposes the pure-logic modules for integration
//! testing.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod light;
pub mod presence;
pub mod scheduler;

pub mod adapters;
pub mod pins;
