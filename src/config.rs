//! System configuration parameters
//!
//! All tunable parameters for the beaconlight controller.  The user-facing
//! [`LightConfig`] record can be overridden at runtime through partial
//! [`ConfigUpdate`]s and persisted via NVS; the rest of [`SystemConfig`] is
//! fixed at boot.

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigFieldError, Error, FieldRejection, Result};
use crate::presence::debounce::DebouncePolicy;

/// Maximum stored length of the beacon's advertised name.
pub const MAX_NAME_LEN: usize = 32;
/// Length of a textual hardware address, `aa:bb:cc:dd:ee:ff`.
pub const ADDRESS_LEN: usize = 17;

/// Accepted colour temperature range (Kelvin).
pub const COLOR_TEMP_RANGE: (u16, u16) = (1000, 40_000);
/// Longest accepted fade duration (milliseconds).
pub const MAX_FADE_MS: u16 = 60_000;

// Wire names of the configuration record, shared by serde and the
// lenient partial-update parser.
const KEY_RED: &str = "red";
const KEY_GREEN: &str = "green";
const KEY_BLUE: &str = "blue";
const KEY_WHITE: &str = "white";
const KEY_BRIGHTNESS: &str = "brightness";
const KEY_AWAY_BRIGHTNESS: &str = "awayBrightness";
const KEY_COLOR_TEMP: &str = "colorTemp";
const KEY_FADE_IN: &str = "fadeInTime";
const KEY_FADE_OUT: &str = "fadeOutTime";
const KEY_SMOOTHING: &str = "smoothTransition";

/// Upper bound on rejected fields reported per update (one per known key).
pub const MAX_REJECTED: usize = 10;

// ═══════════════════════════════════════════════════════════════
//  Boot-time configuration
// ═══════════════════════════════════════════════════════════════

/// Identity of the tracked beacon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconConfig {
    /// Substring of the advertised name.  Empty disables name matching.
    pub target_name: heapless::String<MAX_NAME_LEN>,
    /// Hardware address, compared case-insensitively.  Empty disables
    /// address matching.
    pub target_address: heapless::String<ADDRESS_LEN>,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            target_name: heapless::String::try_from("Bezkrovnyi").unwrap_or_default(),
            target_address: heapless::String::try_from("0c:4e:a0:5f:fd:3c").unwrap_or_default(),
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Presence ---
    pub beacon: BeaconConfig,
    /// Minimum time between the starts of two probe cycles (milliseconds)
    pub scan_interval_ms: u32,
    /// Length of one probe cycle (milliseconds); also its timeout
    pub scan_duration_ms: u32,
    /// How many negative cycles it takes to declare "away"
    pub debounce: DebouncePolicy,

    // --- Timing ---
    /// Control tick interval (milliseconds)
    pub tick_interval_ms: u32,
    /// Status report interval (seconds)
    pub status_interval_secs: u32,

    // --- Strip ---
    /// Number of addressable pixels on the strip
    pub led_count: u16,
    /// Light parameters applied at boot (overridden by NVS if present)
    pub light: LightConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            beacon: BeaconConfig::default(),
            scan_interval_ms: 3000,
            scan_duration_ms: 2000,
            debounce: DebouncePolicy::SingleCycle,

            tick_interval_ms: 5,
            status_interval_secs: 60,

            led_count: 25,
            light: LightConfig::default(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  User-facing light record
// ═══════════════════════════════════════════════════════════════

/// The configuration record exposed to the host's configuration surface.
///
/// `target_brightness` is reported on read but ignored at boot: the engine
/// always starts at the away floor until a scan confirms presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LightConfig {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub white: u8,
    #[serde(rename = "brightness")]
    pub target_brightness: u8,
    pub away_brightness: u8,
    #[serde(rename = "colorTemp")]
    pub color_temperature: u16,
    #[serde(rename = "fadeInTime")]
    pub fade_in_ms: u16,
    #[serde(rename = "fadeOutTime")]
    pub fade_out_ms: u16,
    #[serde(rename = "smoothTransition")]
    pub smoothing: bool,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            red: 255,
            green: 255,
            blue: 255,
            white: 0,
            target_brightness: 0,
            away_brightness: 70,
            color_temperature: 4000,
            fade_in_ms: 3000,
            fade_out_ms: 3000,
            smoothing: true,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Partial updates
// ═══════════════════════════════════════════════════════════════

/// A partial update of [`LightConfig`]; `None` fields are left unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigUpdate {
    pub red: Option<u8>,
    pub green: Option<u8>,
    pub blue: Option<u8>,
    pub white: Option<u8>,
    pub target_brightness: Option<u8>,
    pub away_brightness: Option<u8>,
    pub color_temperature: Option<u16>,
    pub fade_in_ms: Option<u16>,
    pub fade_out_ms: Option<u16>,
    pub smoothing: Option<bool>,
}

/// Result of leniently parsing an update body.
#[derive(Debug, Clone, Default)]
pub struct ParsedUpdate {
    /// The fields that passed validation.
    pub update: ConfigUpdate,
    /// Known fields that were ignored, and why.
    pub rejected: heapless::Vec<ConfigFieldError, MAX_REJECTED>,
    /// Count of keys outside the declared field set.
    pub unknown: usize,
}

impl ConfigUpdate {
    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Drop every field outside its declared range.  The `u8` and `bool`
    /// fields are in range by type; the temperature and fades are not.
    pub fn validated(mut self) -> (Self, heapless::Vec<ConfigFieldError, MAX_REJECTED>) {
        let mut rejected = heapless::Vec::new();
        let (min_k, max_k) = COLOR_TEMP_RANGE;
        drop_out_of_range(
            &mut self.color_temperature,
            KEY_COLOR_TEMP,
            |k| (min_k..=max_k).contains(&k),
            &mut rejected,
        );
        drop_out_of_range(&mut self.fade_in_ms, KEY_FADE_IN, |ms| ms <= MAX_FADE_MS, &mut rejected);
        drop_out_of_range(&mut self.fade_out_ms, KEY_FADE_OUT, |ms| ms <= MAX_FADE_MS, &mut rejected);
        (self, rejected)
    }

    /// Parse a JSON object body.  Only a body that is not a JSON object fails
    /// as a whole; bad fields are collected in [`ParsedUpdate::rejected`].
    pub fn from_json(body: &str) -> Result<ParsedUpdate> {
        let value: Value =
            serde_json::from_str(body).map_err(|_| Error::Parse("body is not valid JSON"))?;
        Self::from_value(&value)
    }

    /// Same as [`from_json`](Self::from_json) for an already-decoded value.
    pub fn from_value(value: &Value) -> Result<ParsedUpdate> {
        let Some(map) = value.as_object() else {
            return Err(Error::Parse("body is not a JSON object"));
        };

        let mut parsed = ParsedUpdate::default();
        for (key, raw) in map {
            match key.as_str() {
                KEY_RED => parsed.take(KEY_RED, raw, parse_u8, |u, v| u.red = Some(v)),
                KEY_GREEN => parsed.take(KEY_GREEN, raw, parse_u8, |u, v| u.green = Some(v)),
                KEY_BLUE => parsed.take(KEY_BLUE, raw, parse_u8, |u, v| u.blue = Some(v)),
                KEY_WHITE => parsed.take(KEY_WHITE, raw, parse_u8, |u, v| u.white = Some(v)),
                KEY_BRIGHTNESS => parsed.take(KEY_BRIGHTNESS, raw, parse_u8, |u, v| {
                    u.target_brightness = Some(v);
                }),
                KEY_AWAY_BRIGHTNESS => parsed.take(KEY_AWAY_BRIGHTNESS, raw, parse_u8, |u, v| {
                    u.away_brightness = Some(v);
                }),
                KEY_COLOR_TEMP => parsed.take(KEY_COLOR_TEMP, raw, parse_color_temp, |u, v| {
                    u.color_temperature = Some(v);
                }),
                KEY_FADE_IN => parsed.take(KEY_FADE_IN, raw, parse_fade, |u, v| {
                    u.fade_in_ms = Some(v);
                }),
                KEY_FADE_OUT => parsed.take(KEY_FADE_OUT, raw, parse_fade, |u, v| {
                    u.fade_out_ms = Some(v);
                }),
                KEY_SMOOTHING => parsed.take(KEY_SMOOTHING, raw, parse_bool, |u, v| {
                    u.smoothing = Some(v);
                }),
                other => {
                    warn!("Config update: ignoring unknown field '{}'", other);
                    parsed.unknown += 1;
                }
            }
        }
        Ok(parsed)
    }
}

impl ParsedUpdate {
    fn take<T>(
        &mut self,
        field: &'static str,
        raw: &Value,
        parse: fn(&Value) -> core::result::Result<T, FieldRejection>,
        apply: fn(&mut ConfigUpdate, T),
    ) {
        match parse(raw) {
            Ok(v) => apply(&mut self.update, v),
            Err(reason) => {
                let err = ConfigFieldError { field, reason };
                warn!("Config update: {}, field ignored", err);
                // One entry per known key, so the vector cannot overflow.
                let _ = self.rejected.push(err);
            }
        }
    }
}

fn drop_out_of_range<T: Copy + core::fmt::Display>(
    field: &mut Option<T>,
    name: &'static str,
    in_range: impl Fn(T) -> bool,
    rejected: &mut heapless::Vec<ConfigFieldError, MAX_REJECTED>,
) {
    let Some(v) = *field else { return };
    if in_range(v) {
        return;
    }
    *field = None;
    let err = ConfigFieldError {
        field: name,
        reason: FieldRejection::OutOfRange,
    };
    warn!("Config update: {} ({}), field ignored", err, v);
    let _ = rejected.push(err);
}

fn parse_ranged(raw: &Value, min: u64, max: u64) -> core::result::Result<u64, FieldRejection> {
    match raw.as_u64() {
        Some(n) if (min..=max).contains(&n) => Ok(n),
        Some(_) => Err(FieldRejection::OutOfRange),
        // Negative integers are numbers, just not representable here.
        None if raw.is_i64() => Err(FieldRejection::OutOfRange),
        None => Err(FieldRejection::WrongType),
    }
}

fn parse_u8(raw: &Value) -> core::result::Result<u8, FieldRejection> {
    parse_ranged(raw, 0, u64::from(u8::MAX)).map(|n| n as u8)
}

fn parse_color_temp(raw: &Value) -> core::result::Result<u16, FieldRejection> {
    let (min, max) = COLOR_TEMP_RANGE;
    parse_ranged(raw, u64::from(min), u64::from(max)).map(|n| n as u16)
}

fn parse_fade(raw: &Value) -> core::result::Result<u16, FieldRejection> {
    parse_ranged(raw, 0, u64::from(MAX_FADE_MS)).map(|n| n as u16)
}

fn parse_bool(raw: &Value) -> core::result::Result<bool, FieldRejection> {
    raw.as_bool().ok_or(FieldRejection::WrongType)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = SystemConfig::default();
        assert!(c.scan_duration_ms < c.scan_interval_ms);
        assert!(c.tick_interval_ms > 0);
        assert!(c.led_count > 0);
        assert!(c.light.away_brightness > 0, "away floor dims, never turns off");
        assert!(!c.beacon.target_name.is_empty());
        assert_eq!(c.beacon.target_address.len(), ADDRESS_LEN);
    }

    #[test]
    fn light_config_uses_wire_names() {
        let json = serde_json::to_string(&LightConfig::default()).unwrap();
        for key in [
            KEY_RED,
            KEY_WHITE,
            KEY_BRIGHTNESS,
            KEY_AWAY_BRIGHTNESS,
            KEY_COLOR_TEMP,
            KEY_FADE_IN,
            KEY_FADE_OUT,
            KEY_SMOOTHING,
        ] {
            assert!(json.contains(&format!("\"{key}\"")), "missing {key} in {json}");
        }
    }

    #[test]
    fn postcard_roundtrip() {
        let c = SystemConfig::default();
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: SystemConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(c.light, c2.light);
        assert_eq!(c.beacon, c2.beacon);
        assert_eq!(c.debounce, c2.debounce);
    }

    #[test]
    fn partial_update_sets_only_present_fields() {
        let parsed = ConfigUpdate::from_json(r#"{"red": 10}"#).unwrap();
        assert_eq!(parsed.update.red, Some(10));
        assert_eq!(parsed.update.green, None);
        assert_eq!(parsed.update.color_temperature, None);
        assert_eq!(parsed.update.fade_in_ms, None);
        assert!(parsed.rejected.is_empty());
    }

    #[test]
    fn out_of_range_field_is_dropped_but_others_apply() {
        let parsed =
            ConfigUpdate::from_json(r#"{"red": 300, "blue": 7, "colorTemp": 90000}"#).unwrap();
        assert_eq!(parsed.update.red, None);
        assert_eq!(parsed.update.blue, Some(7));
        assert_eq!(parsed.update.color_temperature, None);
        assert_eq!(parsed.rejected.len(), 2);
        assert!(
            parsed
                .rejected
                .iter()
                .all(|e| e.reason == FieldRejection::OutOfRange)
        );
    }

    #[test]
    fn wrong_types_and_negatives() {
        let parsed = ConfigUpdate::from_json(
            r#"{"green": "high", "white": -1, "smoothTransition": 1, "fadeInTime": 1.5}"#,
        )
        .unwrap();
        assert!(parsed.update.is_empty());
        assert_eq!(parsed.rejected.len(), 4);
        let white = parsed.rejected.iter().find(|e| e.field == KEY_WHITE).unwrap();
        assert_eq!(white.reason, FieldRejection::OutOfRange);
        let green = parsed.rejected.iter().find(|e| e.field == KEY_GREEN).unwrap();
        assert_eq!(green.reason, FieldRejection::WrongType);
    }

    #[test]
    fn unknown_keys_are_counted_not_fatal() {
        let parsed = ConfigUpdate::from_json(r#"{"hue": 3, "awayBrightness": 40}"#).unwrap();
        assert_eq!(parsed.unknown, 1);
        assert_eq!(parsed.update.away_brightness, Some(40));
    }

    #[test]
    fn typed_update_drops_out_of_range_fields() {
        let update = ConfigUpdate {
            red: Some(3),
            color_temperature: Some(0),
            fade_in_ms: Some(65_000),
            fade_out_ms: Some(MAX_FADE_MS),
            ..ConfigUpdate::default()
        };
        let (valid, rejected) = update.validated();
        assert_eq!(valid.red, Some(3));
        assert_eq!(valid.color_temperature, None);
        assert_eq!(valid.fade_in_ms, None);
        assert_eq!(valid.fade_out_ms, Some(MAX_FADE_MS));
        let fields: Vec<_> = rejected.iter().map(|e| e.field).collect();
        assert_eq!(fields, [KEY_COLOR_TEMP, KEY_FADE_IN]);
        assert!(rejected.iter().all(|e| e.reason == FieldRejection::OutOfRange));
    }

    #[test]
    fn parsed_update_is_already_valid() {
        let parsed = ConfigUpdate::from_json(r#"{"colorTemp": 1000, "fadeOutTime": 60000}"#).unwrap();
        let (valid, rejected) = parsed.update.validated();
        assert_eq!(valid, parsed.update);
        assert!(rejected.is_empty());
    }

    #[test]
    fn non_object_body_is_rejected() {
        assert!(matches!(ConfigUpdate::from_json("[1,2]"), Err(Error::Parse(_))));
        assert!(matches!(ConfigUpdate::from_json("{"), Err(Error::Parse(_))));
    }
}
