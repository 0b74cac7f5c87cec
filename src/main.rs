//! Beaconlight Firmware — Main Entry Point
//!
//! Hexagonal architecture driven by a fixed-period tick loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  BleScanAdapter  LedStripAdapter  LogEventSink  NvsAdapter     │
//! │  (ScanPort)      (RenderPort)     (EventSink)   (ConfigPort)   │
//! │  Esp32TimeAdapter (ClockPort)     WifiAdapter (Connectivity)   │
//! │  console thread ──▶ COMMANDS                                   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  PresenceDetector · TransitionEngine                   │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  TickScheduler (control tick) · TickScheduler (status)         │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use embassy_time::Duration;
use log::{info, warn};

use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::rmt::config::TransmitConfig;
use esp_idf_hal::rmt::TxRmtDriver;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::wifi::EspWifi;

use beaconlight::adapters::ble_scan::BleScanAdapter;
use beaconlight::adapters::console;
use beaconlight::adapters::led_strip::{LedStripAdapter, PixelOrder};
use beaconlight::adapters::log_sink::LogEventSink;
use beaconlight::adapters::nvs::NvsAdapter;
use beaconlight::adapters::time::Esp32TimeAdapter;
use beaconlight::adapters::wifi::{ConnectivityPort, WifiAdapter};
use beaconlight::app::ports::{ClockPort, ConfigError, ConfigPort, RenderPort, ScanPort};
use beaconlight::app::service::AppService;
use beaconlight::config::SystemConfig;
use beaconlight::error::ScanError;
use beaconlight::events::{self, COMMANDS, PROBE_MATCHES, PROBE_QUEUE_CAP};
use beaconlight::light::color::Frame;
use beaconlight::presence::matcher::ProbeMatch;
use beaconlight::scheduler::TickScheduler;

// ── Combined hardware port ────────────────────────────────────
//
// `AppService::tick` scans and renders within one call, so the scanner
// and the strip travel together behind a single `&mut`.

struct Hardware {
    scan: BleScanAdapter,
    strip: LedStripAdapter,
}

impl ScanPort for Hardware {
    fn start_probe_cycle(&mut self, duration: Duration) -> Result<(), ScanError> {
        self.scan.start_probe_cycle(duration)
    }

    fn stop_probe_cycle(&mut self) {
        self.scan.stop_probe_cycle();
    }
}

impl RenderPort for Hardware {
    fn render(&mut self, frame: &Frame) {
        self.strip.render(frame);
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Beaconlight v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let mut config = SystemConfig::default();
    let nvs = NvsAdapter::new().map_err(|e| anyhow::anyhow!("NVS init failed: {}", e))?;
    match nvs.load() {
        Ok(light) => {
            info!("Light config loaded from NVS");
            config.light = light;
        }
        Err(ConfigError::NotFound) => info!("No stored light config, using defaults"),
        Err(e) => warn!("NVS config load failed ({}), using defaults", e),
    }

    // ── 3. Construct adapters ─────────────────────────────────
    let clock = Esp32TimeAdapter::new();
    let mut sink = LogEventSink::new();

    let mut scan = BleScanAdapter::new();
    scan.init();

    // Data line: pins::LED_DATA_GPIO.
    let tx = TxRmtDriver::new(
        peripherals.rmt.channel0,
        peripherals.pins.gpio4,
        &TransmitConfig::new().clock_divider(1),
    )?;
    let strip = LedStripAdapter::new(tx, config.led_count, PixelOrder::default());

    let mut hw = Hardware { scan, strip };

    let mut wifi = WifiAdapter::new(EspWifi::new(peripherals.modem, sysloop, None)?);
    match (option_env!("WIFI_SSID"), option_env!("WIFI_PASS")) {
        (Some(ssid), pass) => {
            if let Err(e) = wifi.set_credentials(ssid, pass.unwrap_or("")) {
                warn!("WiFi: invalid build-time credentials ({})", e);
            } else if let Err(e) = wifi.connect() {
                warn!("WiFi: initial connect failed ({}), will retry", e);
            }
        }
        (None, _) => info!("WiFi: no credentials configured, status stays offline"),
    }

    if let Err(e) = console::spawn() {
        warn!("Console: reader thread failed to start ({}), no local commands", e);
    }

    // ── 4. Construct app service ──────────────────────────────
    let mut app = AppService::new(&config);
    app.start(&mut hw, &mut sink);

    let mut control = TickScheduler::new(
        "control",
        Duration::from_millis(u64::from(config.tick_interval_ms)),
    );
    let mut status = TickScheduler::new(
        "status",
        Duration::from_secs(u64::from(config.status_interval_secs)),
    );

    info!("System ready. Entering tick loop.");

    // ── 5. Tick loop ──────────────────────────────────────────
    let mut matches: heapless::Vec<ProbeMatch, PROBE_QUEUE_CAP> = heapless::Vec::new();

    loop {
        let now = clock.now();

        if control.poll(now) {
            matches.clear();
            events::drain_probes(&PROBE_MATCHES, &mut matches);

            events::drain_commands(&COMMANDS, |cmd| {
                app.handle_command(cmd, &mut hw, &mut sink);
            });

            app.tick(now, &matches, &mut hw, &mut sink);
            app.flush_config(&nvs, &mut sink);
        }

        if status.poll(now) {
            app.report_status(wifi.is_connected(), &mut sink);
        }

        wifi.poll(clock.uptime_secs());

        let wait = control.time_until_due(now).min(status.time_until_due(now));
        std::thread::sleep(core::time::Duration::from_micros(wait.as_micros()));
    }
}
