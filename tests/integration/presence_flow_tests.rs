//! End-to-end presence scenarios: probe cycles → presence events →
//! brightness fades, driven through `AppService::tick` with mock hardware.

use super::mock_hw::{MockConfigStore, MockHw, RecordingSink, at};

use beaconlight::app::commands::AppCommand;
use beaconlight::app::events::AppEvent;
use beaconlight::app::ports::ConfigError;
use beaconlight::app::service::AppService;
use beaconlight::config::{ConfigUpdate, SystemConfig};
use beaconlight::error::ScanError;
use beaconlight::presence::PresenceEvent;
use beaconlight::presence::matcher::ProbeMatch;

const BEACON_ADDR: &str = "0c:4e:a0:5f:fd:3c";

fn make_app(config: &SystemConfig) -> (AppService, MockHw, RecordingSink) {
    let mut app = AppService::new(config);
    let mut hw = MockHw::new();
    let mut sink = RecordingSink::new();
    app.start(&mut hw, &mut sink);
    (app, hw, sink)
}

/// Tick every `every_ms` over `[from_ms, to_ms]`, feeding `matches` each tick.
fn run(
    app: &mut AppService,
    hw: &mut MockHw,
    sink: &mut RecordingSink,
    from_ms: u64,
    to_ms: u64,
    every_ms: u64,
    matches: &[ProbeMatch],
) {
    let mut t = from_ms;
    while t <= to_ms {
        app.tick(at(t), matches, hw, sink);
        t += every_ms;
    }
}

/// Smoothing off for the first tick so the strip sits exactly at the away
/// floor, then smoothing back on.
fn settled_at_away_floor() -> (AppService, MockHw, RecordingSink) {
    let mut config = SystemConfig::default();
    config.light.smoothing = false;
    let (mut app, mut hw, mut sink) = make_app(&config);
    app.tick(at(0), &[], &mut hw, &mut sink);
    assert_eq!(app.light().state().current, 70);

    let update = ConfigUpdate {
        smoothing: Some(true),
        ..ConfigUpdate::default()
    };
    app.handle_command(AppCommand::UpdateConfig(update), &mut hw, &mut sink);
    (app, hw, sink)
}

#[test]
fn start_renders_dark_frame_and_announces_away() {
    let (app, hw, sink) = make_app(&SystemConfig::default());
    assert_eq!(hw.last_brightness(), Some(0));
    assert_eq!(
        sink.events.first(),
        Some(&AppEvent::Started {
            present: false,
            brightness: 0
        })
    );
    assert_eq!(app.light().state().target, 70);
}

#[test]
fn first_tick_starts_a_probe_cycle() {
    let (mut app, mut hw, mut sink) = make_app(&SystemConfig::default());
    app.tick(at(0), &[], &mut hw, &mut sink);
    assert_eq!(hw.starts.len(), 1);
    assert_eq!(hw.starts[0].as_millis(), 2000);
    assert!(sink.events.contains(&AppEvent::ScanStarted));
}

#[test]
fn matching_cycle_fades_up_to_full_within_fade_in() {
    let (mut app, mut hw, mut sink) = settled_at_away_floor();
    let beacon = [ProbeMatch::new(BEACON_ADDR, None)];

    // Cycle opened at t=0 closes at t=2000 with the beacon seen.
    run(&mut app, &mut hw, &mut sink, 20, 1980, 20, &beacon);
    assert!(!app.presence().is_present());

    app.tick(at(2000), &beacon, &mut hw, &mut sink);
    assert!(app.presence().is_present());
    assert_eq!(app.light().state().target, 255);
    assert_eq!(sink.presence_changes(), vec![PresenceEvent::Present]);

    // fadeInTime 3000 ms at 20 ms per step.
    run(&mut app, &mut hw, &mut sink, 2020, 5000, 20, &beacon);
    assert!(app.light().state().current >= 254);

    // Beacon keeps showing up: brightness holds.
    run(&mut app, &mut hw, &mut sink, 5020, 9000, 20, &beacon);
    assert!(app.light().state().current >= 254);
    assert_eq!(sink.presence_changes(), vec![PresenceEvent::Present]);
}

#[test]
fn address_match_is_case_insensitive_without_name() {
    let (mut app, mut hw, mut sink) = make_app(&SystemConfig::default());
    let beacon = [ProbeMatch::new("0C:4E:A0:5F:FD:3C", Some("tag"))];
    run(&mut app, &mut hw, &mut sink, 0, 2000, 20, &beacon);
    assert!(app.presence().is_present());
    assert_eq!(sink.count(|e| matches!(e, AppEvent::BeaconMatched(_))), 1);
}

#[test]
fn name_substring_match_counts_as_presence() {
    let (mut app, mut hw, mut sink) = make_app(&SystemConfig::default());
    let beacon = [ProbeMatch::new("11:22:33:44:55:66", Some("Bezkrovnyi Band"))];
    run(&mut app, &mut hw, &mut sink, 0, 2000, 20, &beacon);
    assert!(app.presence().is_present());
}

#[test]
fn smoothing_off_away_snaps_on_next_step() {
    let mut config = SystemConfig::default();
    config.light.smoothing = false;
    let (mut app, mut hw, mut sink) = make_app(&config);

    app.tick(at(0), &[], &mut hw, &mut sink);
    app.handle_command(AppCommand::TogglePresence, &mut hw, &mut sink);
    assert_eq!(app.light().state().current, 255);

    run(&mut app, &mut hw, &mut sink, 20, 1980, 20, &[]);
    app.tick(at(2000), &[], &mut hw, &mut sink);

    assert!(!app.presence().is_present());
    assert_eq!(app.light().state().current, 70);
    assert_eq!(hw.last_brightness(), Some(70));
}

#[test]
fn empty_cycles_while_away_raise_no_events() {
    let (mut app, mut hw, mut sink) = make_app(&SystemConfig::default());
    run(&mut app, &mut hw, &mut sink, 0, 8000, 20, &[]);

    assert!(sink.count(|e| matches!(e, AppEvent::ScanCompleted { beacon_seen: false })) >= 2);
    assert!(sink.presence_changes().is_empty());
    assert_eq!(hw.stops as usize, sink.count(|e| matches!(e, AppEvent::ScanCompleted { .. })));
}

#[test]
fn empty_cycle_while_present_goes_away() {
    let (mut app, mut hw, mut sink) = make_app(&SystemConfig::default());
    let beacon = [ProbeMatch::new(BEACON_ADDR, None)];
    run(&mut app, &mut hw, &mut sink, 0, 2000, 20, &beacon);
    assert!(app.presence().is_present());

    // Next cycle opens at t=3000 and closes at t=5000 empty.
    run(&mut app, &mut hw, &mut sink, 2020, 5000, 20, &[]);
    assert!(!app.presence().is_present());
    assert_eq!(
        sink.presence_changes(),
        vec![PresenceEvent::Present, PresenceEvent::Away]
    );
    assert_eq!(app.light().state().target, 70);
}

#[test]
fn transport_failure_keeps_last_presence() {
    let (mut app, mut hw, mut sink) = make_app(&SystemConfig::default());
    app.handle_command(AppCommand::TogglePresence, &mut hw, &mut sink);
    hw.fail_with = Some(ScanError::TransportUnavailable);

    run(&mut app, &mut hw, &mut sink, 0, 8000, 20, &[]);

    assert!(app.presence().is_present());
    assert!(sink.count(|e| matches!(e, AppEvent::ScanFailed(ScanError::TransportUnavailable))) >= 2);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::ScanCompleted { .. })), 0);
    assert_eq!(sink.presence_changes(), vec![PresenceEvent::Present]);
}

#[test]
fn scanning_resumes_after_transport_recovers() {
    let (mut app, mut hw, mut sink) = make_app(&SystemConfig::default());
    hw.fail_with = Some(ScanError::Busy);
    run(&mut app, &mut hw, &mut sink, 0, 2000, 20, &[]);
    assert!(hw.starts.is_empty());

    hw.fail_with = None;
    let beacon = [ProbeMatch::new(BEACON_ADDR, None)];
    run(&mut app, &mut hw, &mut sink, 2020, 5000, 20, &beacon);
    assert_eq!(hw.starts.len(), 1);
    assert!(app.presence().is_present());
}

#[test]
fn toggle_flips_presence_and_target() {
    let (mut app, mut hw, mut sink) = make_app(&SystemConfig::default());
    app.handle_command(AppCommand::TogglePresence, &mut hw, &mut sink);
    assert!(app.presence().is_present());
    assert_eq!(app.light().state().target, 255);

    app.handle_command(AppCommand::TogglePresence, &mut hw, &mut sink);
    assert!(!app.presence().is_present());
    assert_eq!(app.light().state().target, 70);
    assert_eq!(
        sink.presence_changes(),
        vec![PresenceEvent::Present, PresenceEvent::Away]
    );
}

#[test]
fn status_tracks_presence_and_rendered_brightness() {
    let (mut app, mut hw, mut sink) = settled_at_away_floor();
    let status = app.status(true);
    assert!(status.connected);
    assert!(!status.beacon_found);
    assert!(status.is_away);
    assert_eq!(status.brightness, 70);

    app.handle_command(AppCommand::TogglePresence, &mut hw, &mut sink);
    app.tick(at(20), &[], &mut hw, &mut sink);
    let status = app.status(false);
    assert!(status.beacon_found);
    assert!(!status.is_away);
    assert!(status.brightness > 70);

    app.report_status(false, &mut sink);
    assert!(matches!(sink.events.last(), Some(AppEvent::Status(s)) if *s == status));
}

#[test]
fn save_command_persists_on_flush() {
    let (mut app, mut hw, mut sink) = make_app(&SystemConfig::default());
    let store = MockConfigStore::new();

    assert!(!app.flush_config(&store, &mut sink));
    assert_eq!(store.saves.get(), 0);

    let update = ConfigUpdate {
        blue: Some(9),
        ..ConfigUpdate::default()
    };
    app.handle_command(AppCommand::UpdateConfig(update), &mut hw, &mut sink);
    app.handle_command(AppCommand::SaveConfig, &mut hw, &mut sink);
    assert!(app.is_save_pending());

    assert!(app.flush_config(&store, &mut sink));
    assert!(!app.is_save_pending());
    assert_eq!(*store.stored.borrow(), Some(app.current_config()));
    assert_eq!(store.stored.borrow().map(|c| c.blue), Some(9));
    assert!(sink.events.contains(&AppEvent::ConfigSaved));
}

#[test]
fn failed_save_is_dropped() {
    let (mut app, mut hw, mut sink) = make_app(&SystemConfig::default());
    let store = MockConfigStore::failing(ConfigError::StorageFull);

    app.handle_command(AppCommand::SaveConfig, &mut hw, &mut sink);
    assert!(!app.flush_config(&store, &mut sink));
    assert!(!app.is_save_pending());
    assert!(!sink.events.contains(&AppEvent::ConfigSaved));

    assert!(!app.flush_config(&store, &mut sink));
    assert_eq!(store.saves.get(), 1);
}
