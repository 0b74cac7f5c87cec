//! Runtime configuration updates through the service: partial updates,
//! lenient JSON parsing and the read-back surface.

use super::mock_hw::{MockHw, RecordingSink, at};

use beaconlight::adapters::nvs::NvsAdapter;
use beaconlight::app::commands::AppCommand;
use beaconlight::app::events::AppEvent;
use beaconlight::app::ports::ConfigPort;
use beaconlight::app::service::AppService;
use beaconlight::config::{ConfigUpdate, LightConfig, SystemConfig};
use beaconlight::error::Error;

fn make_app() -> (AppService, MockHw, RecordingSink) {
    let mut app = AppService::new(&SystemConfig::default());
    let mut hw = MockHw::new();
    let mut sink = RecordingSink::new();
    app.start(&mut hw, &mut sink);
    (app, hw, sink)
}

#[test]
fn red_only_update_leaves_other_fields() {
    let (mut app, mut hw, mut sink) = make_app();
    let before = app.current_config();
    let frames_before = hw.frames.len();

    let update = ConfigUpdate {
        red: Some(10),
        ..ConfigUpdate::default()
    };
    app.handle_command(AppCommand::UpdateConfig(update), &mut hw, &mut sink);

    let after = app.current_config();
    assert_eq!(after.red, 10);
    assert_eq!(
        LightConfig { red: before.red, ..after },
        before,
        "only red may change"
    );
    assert_eq!(hw.frames.len(), frames_before + 1, "colour change re-renders");
    assert_eq!(hw.last_frame().map(|f| f.red), Some(10));
}

#[test]
fn json_update_applies_valid_fields_and_counts_rejections() {
    let (mut app, mut hw, mut sink) = make_app();
    let outcome = app
        .apply_config_json(
            r#"{"green": 12, "colorTemp": 500, "fadeInTime": "slow", "mood": "calm"}"#,
            &mut hw,
            &mut sink,
        )
        .unwrap();

    assert_eq!(outcome.applied, 1);
    assert!(outcome.color_changed);
    let cfg = app.current_config();
    assert_eq!(cfg.green, 12);
    assert_eq!(cfg.color_temperature, 4000);
    assert_eq!(cfg.fade_in_ms, 3000);
    assert_eq!(
        sink.events.last(),
        Some(&AppEvent::ConfigApplied {
            applied: 1,
            rejected: 2,
            rendered: true
        })
    );
}

#[test]
fn non_object_body_is_rejected_whole() {
    let (mut app, mut hw, mut sink) = make_app();
    let before = app.current_config();
    let events_before = sink.events.len();

    assert!(matches!(
        app.apply_config_json("[1, 2, 3]", &mut hw, &mut sink),
        Err(Error::Parse(_))
    ));
    assert!(matches!(
        app.apply_config_json("brightness=255", &mut hw, &mut sink),
        Err(Error::Parse(_))
    ));
    assert_eq!(app.current_config(), before);
    assert_eq!(sink.events.len(), events_before);
}

#[test]
fn brightness_update_retargets_the_fade() {
    let (mut app, mut hw, mut sink) = make_app();
    app.apply_config_json(r#"{"brightness": 200}"#, &mut hw, &mut sink)
        .unwrap();
    assert_eq!(app.light().state().target, 200);

    let mut t = 0;
    while t <= 3000 {
        app.tick(at(t), &[], &mut hw, &mut sink);
        t += 20;
    }
    assert!(app.light().state().current.abs_diff(200) <= 1);
}

#[test]
fn smoothing_off_brightness_update_snaps_immediately() {
    let (mut app, mut hw, mut sink) = make_app();
    let outcome = app
        .apply_config_json(
            r#"{"smoothTransition": false, "brightness": 128}"#,
            &mut hw,
            &mut sink,
        )
        .unwrap();

    assert!(outcome.rendered);
    assert_eq!(app.light().state().current, 128);
    assert_eq!(hw.last_brightness(), Some(128));
}

#[test]
fn current_config_serialises_with_wire_keys() {
    let (app, _hw, _sink) = make_app();
    let json = serde_json::to_value(app.current_config()).unwrap();
    let obj = json.as_object().unwrap();
    for key in [
        "red",
        "green",
        "blue",
        "white",
        "brightness",
        "awayBrightness",
        "colorTemp",
        "fadeInTime",
        "fadeOutTime",
        "smoothTransition",
    ] {
        assert!(obj.contains_key(key), "missing key {key}");
    }
    assert_eq!(obj.len(), 10);
    assert_eq!(json["brightness"], 70, "reports the live target");
    assert_eq!(json["colorTemp"], 4000);
}

#[test]
fn away_floor_change_does_not_retarget_current_away() {
    let (mut app, mut hw, mut sink) = make_app();
    app.apply_config_json(r#"{"awayBrightness": 30}"#, &mut hw, &mut sink)
        .unwrap();
    assert_eq!(app.light().state().target, 70);

    app.handle_command(AppCommand::TogglePresence, &mut hw, &mut sink);
    app.handle_command(AppCommand::TogglePresence, &mut hw, &mut sink);
    assert_eq!(app.light().state().target, 30);
}

#[test]
fn typed_update_ignores_out_of_range_fields() {
    let (mut app, mut hw, mut sink) = make_app();
    let update = ConfigUpdate {
        red: Some(40),
        color_temperature: Some(0),
        fade_in_ms: Some(65_000),
        ..ConfigUpdate::default()
    };
    app.handle_command(AppCommand::UpdateConfig(update), &mut hw, &mut sink);

    let cfg = app.current_config();
    assert_eq!(cfg.red, 40);
    assert_eq!(cfg.color_temperature, 4000);
    assert_eq!(cfg.fade_in_ms, 3000);
    assert_eq!(
        sink.events.last(),
        Some(&AppEvent::ConfigApplied {
            applied: 1,
            rejected: 2,
            rendered: true
        })
    );

    // The surviving state is one storage accepts.
    let nvs = NvsAdapter::new().unwrap();
    app.handle_command(AppCommand::SaveConfig, &mut hw, &mut sink);
    assert!(app.flush_config(&nvs, &mut sink));
    assert_eq!(nvs.load(), Ok(cfg));
}
