//! Application core: pure domain orchestration, zero I/O.
//!
//! Wires the presence detector to the transition engine and routes
//! commands.  All interaction with hardware happens through **port traits**
//! defined in [`ports`], keeping this layer fully testable without real
//! peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
