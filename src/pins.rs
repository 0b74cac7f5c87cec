//! GPIO / peripheral pin assignments for the beaconlight board.
//!
//! Numeric pin ids for logs and documentation.  `esp_idf_hal` hands out
//! pins as typed peripherals, so `main` takes the matching `gpioN` field
//! by name and must be kept in step with these constants.

/// WS2812 data line, driven by RMT channel 0.  Taken as `pins.gpio4`.
pub const LED_DATA_GPIO: i32 = 4;
