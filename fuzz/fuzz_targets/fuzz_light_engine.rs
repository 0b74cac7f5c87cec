//! Fuzz target: `TransitionEngine` step sequences
//!
//! Drives the engine with arbitrary interleavings of config updates,
//! presence events and steps at arbitrary spacing, and verifies the engine
//! never panics and that a fade never crosses its target.
//!
//! cargo fuzz run fuzz_light_engine

#![no_main]

use beaconlight::app::ports::RenderPort;
use beaconlight::config::{ConfigUpdate, LightConfig};
use beaconlight::light::TransitionEngine;
use beaconlight::light::color::Frame;
use beaconlight::presence::PresenceEvent;
use embassy_time::Instant;
use libfuzzer_sys::fuzz_target;

struct NullStrip;

impl RenderPort for NullStrip {
    fn render(&mut self, _frame: &Frame) {}
}

fuzz_target!(|data: &[u8]| {
    let mut engine = TransitionEngine::new(&LightConfig::default());
    let mut strip = NullStrip;
    let mut now_ms = 0u64;

    for chunk in data.chunks(3) {
        let [op, a, b] = match *chunk {
            [op, a, b] => [op, a, b],
            _ => return,
        };
        match op % 4 {
            0 => {
                let update = ConfigUpdate {
                    target_brightness: Some(a),
                    fade_in_ms: Some(u16::from(b) * 100),
                    fade_out_ms: Some(u16::from(b) * 100),
                    smoothing: Some(a & 1 == 0),
                    ..ConfigUpdate::default()
                };
                engine.on_config_update(&update, &mut strip);
            }
            1 => {
                let event = if a & 1 == 0 {
                    PresenceEvent::Present
                } else {
                    PresenceEvent::Away
                };
                engine.on_presence_event(event);
            }
            _ => {
                let before = *engine.state();
                now_ms += u64::from(b);
                engine.step(Instant::from_millis(now_ms), &mut strip);
                let after = engine.state();
                if before.current <= before.target {
                    assert!(after.current <= after.target.max(before.current));
                } else {
                    assert!(after.current >= after.target.min(before.current));
                }
            }
        }
    }
});
