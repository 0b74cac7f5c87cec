//! Fuzz target: `ConfigUpdate::from_json`
//!
//! Feeds arbitrary bodies to the lenient update parser and verifies:
//! - No panics on any UTF-8 input
//! - Accepted fields are always inside their declared ranges
//! - At most one rejection per known key
//!
//! cargo fuzz run fuzz_config_update

#![no_main]

use beaconlight::config::{COLOR_TEMP_RANGE, ConfigUpdate, MAX_FADE_MS, MAX_REJECTED};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(body) = core::str::from_utf8(data) else {
        return;
    };
    let Ok(parsed) = ConfigUpdate::from_json(body) else {
        return;
    };

    let u = parsed.update;
    if let Some(k) = u.color_temperature {
        assert!((COLOR_TEMP_RANGE.0..=COLOR_TEMP_RANGE.1).contains(&k));
    }
    if let Some(ms) = u.fade_in_ms {
        assert!(ms <= MAX_FADE_MS);
    }
    if let Some(ms) = u.fade_out_ms {
        assert!(ms <= MAX_FADE_MS);
    }
    assert!(parsed.rejected.len() <= MAX_REJECTED);
});
