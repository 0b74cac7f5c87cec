//! BLE scan adapter.
//!
//! Implements [`ScanPort`] on top of Bluedroid GAP scanning.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: raw `esp_ble_gap_*` calls.  Every
//!   advertisement report is turned into a [`ProbeMatch`] in the GAP
//!   callback and pushed onto [`PROBE_MATCHES`](crate::events::PROBE_MATCHES).
//! - **all other targets**: simulation.  Tests inject advertisements with
//!   [`BleScanAdapter::inject`] and collect them with
//!   [`BleScanAdapter::take_matches`]; the transport can be made
//!   unavailable with [`BleScanAdapter::set_available`].

use embassy_time::Duration;
use log::{debug, info, warn};

use crate::app::ports::ScanPort;
use crate::error::ScanError;
#[cfg(not(target_os = "espidf"))]
use crate::presence::matcher::ProbeMatch;

/// Scan interval / window in 0.625 ms units.
#[cfg(target_os = "espidf")]
const SCAN_INTERVAL_UNITS: u16 = 0x50;
#[cfg(target_os = "espidf")]
const SCAN_WINDOW_UNITS: u16 = 0x30;

#[cfg(not(target_os = "espidf"))]
const SIM_MATCH_CAP: usize = 32;

// ── ESP-IDF GAP callback ──────────────────────────────────────
//
// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures; the probe queue bridges the callback task to the main loop.

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gap_event_handler(
    event: esp_idf_svc::sys::esp_gap_ble_cb_event_t,
    param: *mut esp_idf_svc::sys::esp_ble_gap_cb_param_t,
) {
    use crate::presence::matcher::ProbeMatch;
    use esp_idf_svc::sys::*;

    #[allow(non_upper_case_globals)]
    match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_RESULT_EVT => {
            // SAFETY: Bluedroid guarantees `param` is valid for the duration
            // of the callback and `scan_rst` is the active variant.
            let r = unsafe { &mut (*param).scan_rst };
            if r.search_evt != esp_gap_search_evt_t_ESP_GAP_SEARCH_INQ_RES_EVT {
                return;
            }

            let mut name_len: u8 = 0;
            let mut name_ptr = unsafe {
                esp_ble_resolve_adv_data(
                    r.ble_adv.as_mut_ptr(),
                    esp_ble_adv_data_type_ESP_BLE_AD_TYPE_NAME_CMPL as u8,
                    &mut name_len,
                )
            };
            if name_ptr.is_null() {
                name_ptr = unsafe {
                    esp_ble_resolve_adv_data(
                        r.ble_adv.as_mut_ptr(),
                        esp_ble_adv_data_type_ESP_BLE_AD_TYPE_NAME_SHORT as u8,
                        &mut name_len,
                    )
                };
            }
            let name = if name_ptr.is_null() {
                None
            } else {
                let raw = unsafe { core::slice::from_raw_parts(name_ptr, name_len as usize) };
                core::str::from_utf8(raw).ok()
            };

            // A full queue is counted and reported once per cycle on stop.
            let _ = crate::events::push_probe(ProbeMatch::from_address(r.bda, name));
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_SCAN_START_COMPLETE_EVT => {
            let status = unsafe { (*param).scan_start_cmpl.status };
            if status != esp_bt_status_t_ESP_BT_STATUS_SUCCESS {
                log::warn!("BLE: scan start failed (status {})", status);
            }
        }
        _ => {}
    }
}

// ───────────────────────────────────────────────────────────────
// BLE scan adapter
// ───────────────────────────────────────────────────────────────

pub struct BleScanAdapter {
    available: bool,
    scanning: bool,
    cycles: u32,
    dropped_total: u32,
    #[cfg(not(target_os = "espidf"))]
    pending: heapless::Vec<ProbeMatch, SIM_MATCH_CAP>,
    #[cfg(not(target_os = "espidf"))]
    sim_dropped: u32,
}

impl Default for BleScanAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl BleScanAdapter {
    pub fn new() -> Self {
        Self {
            available: false,
            scanning: false,
            cycles: 0,
            dropped_total: 0,
            #[cfg(not(target_os = "espidf"))]
            pending: heapless::Vec::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_dropped: 0,
        }
    }

    /// Bring up the controller and Bluedroid and register the GAP callback.
    /// On failure the adapter stays unavailable and every probe cycle
    /// reports [`ScanError::TransportUnavailable`].
    pub fn init(&mut self) {
        self.available = self.platform_init();
        if self.available {
            info!("BLE: scanner ready");
        } else {
            log::error!("BLE: scanner unavailable, presence will not update");
        }
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    /// Probe cycles started successfully since boot.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    /// Advertisements lost to a full queue since boot.
    pub fn dropped_total(&self) -> u32 {
        self.dropped_total
    }

    fn report_dropped(&mut self, dropped: u32) {
        if dropped > 0 {
            self.dropped_total = self.dropped_total.saturating_add(dropped);
            warn!("BLE: {} advertisements dropped this cycle (queue full)", dropped);
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_init(&mut self) -> bool {
        use esp_idf_svc::sys::*;
        unsafe {
            // Release classic BT memory (BLE-only mode).
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            let ret = esp_bt_controller_init(&mut bt_cfg);
            if ret != ESP_OK as i32 {
                log::error!("BLE: bt_controller_init failed ({})", ret);
                return false;
            }
            let ret = esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE);
            if ret != ESP_OK as i32 {
                log::error!("BLE: bt_controller_enable failed ({})", ret);
                return false;
            }
            let ret = esp_bluedroid_init();
            if ret != ESP_OK as i32 {
                log::error!("BLE: bluedroid_init failed ({})", ret);
                return false;
            }
            let ret = esp_bluedroid_enable();
            if ret != ESP_OK as i32 {
                log::error!("BLE: bluedroid_enable failed ({})", ret);
                return false;
            }

            let ret = esp_ble_gap_register_callback(Some(ble_gap_event_handler));
            if ret != ESP_OK as i32 {
                log::error!("BLE: gap_register_callback failed ({})", ret);
                return false;
            }

            let mut params = esp_ble_scan_params_t {
                scan_type: esp_ble_scan_type_t_BLE_SCAN_TYPE_ACTIVE,
                own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
                scan_filter_policy: esp_ble_scan_filter_t_BLE_SCAN_FILTER_ALLOW_ALL,
                scan_interval: SCAN_INTERVAL_UNITS,
                scan_window: SCAN_WINDOW_UNITS,
                scan_duplicate: esp_ble_scan_duplicate_t_BLE_SCAN_DUPLICATE_DISABLE,
            };
            let ret = esp_ble_gap_set_scan_params(&mut params);
            if ret != ESP_OK as i32 {
                log::error!("BLE: set_scan_params failed ({})", ret);
                return false;
            }
        }
        true
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_init(&mut self) -> bool {
        info!("BLE(sim): scanner initialised");
        true
    }

    #[cfg(target_os = "espidf")]
    fn platform_start(&mut self, duration: Duration) -> Result<(), ScanError> {
        // Bluedroid takes whole seconds; round up so the radio outlives the
        // cycle and the detector's timeout closes it.
        let secs = duration.as_millis().div_ceil(1000).max(1) as u32;
        let ret = unsafe { esp_idf_svc::sys::esp_ble_gap_start_scanning(secs) };
        if ret != esp_idf_svc::sys::ESP_OK as i32 {
            log::warn!("BLE: start_scanning failed ({})", ret);
            return Err(ScanError::TransportUnavailable);
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start(&mut self, duration: Duration) -> Result<(), ScanError> {
        debug!("BLE(sim): scanning for {} ms", duration.as_millis());
        self.pending.clear();
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_stop(&mut self) {
        unsafe {
            esp_idf_svc::sys::esp_ble_gap_stop_scanning();
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_stop(&mut self) {
        debug!("BLE(sim): scan stopped");
    }

    #[cfg(target_os = "espidf")]
    fn take_dropped(&mut self) -> u32 {
        crate::events::take_dropped_matches()
    }

    #[cfg(not(target_os = "espidf"))]
    fn take_dropped(&mut self) -> u32 {
        core::mem::take(&mut self.sim_dropped)
    }
}

#[cfg(not(target_os = "espidf"))]
impl BleScanAdapter {
    /// Simulate a radio that failed to come up (or recovered).
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    /// Simulate an advertisement report.  Reports outside a scan are lost,
    /// as on the real radio.  Returns whether the report was captured;
    /// overflow during a scan is counted like the device queue's.
    pub fn inject(&mut self, probe: ProbeMatch) -> bool {
        if !self.scanning {
            return false;
        }
        let captured = self.pending.push(probe).is_ok();
        if !captured {
            self.sim_dropped += 1;
        }
        captured
    }

    /// Hand over captured reports, the host-side equivalent of draining the
    /// probe queue.
    pub fn take_matches(&mut self) -> heapless::Vec<ProbeMatch, SIM_MATCH_CAP> {
        core::mem::take(&mut self.pending)
    }
}

impl ScanPort for BleScanAdapter {
    fn start_probe_cycle(&mut self, duration: Duration) -> Result<(), ScanError> {
        if !self.available {
            return Err(ScanError::TransportUnavailable);
        }
        if self.scanning {
            return Err(ScanError::Busy);
        }
        self.platform_start(duration)?;
        self.scanning = true;
        self.cycles = self.cycles.wrapping_add(1);
        Ok(())
    }

    fn stop_probe_cycle(&mut self) {
        if self.scanning {
            self.platform_stop();
            self.scanning = false;
            let dropped = self.take_dropped();
            self.report_dropped(dropped);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
