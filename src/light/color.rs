//! Colour composition: RGBW colour scaled by a black-body temperature fit.
//!
//! The fit is the usual piecewise approximation of the Planckian locus in
//! 8-bit sRGB: logarithmic below the knee (6600 K), power-law above.  It is
//! a tint, not a photometric conversion.

use serde::{Deserialize, Serialize};

/// `kelvin / 100` at which the fit switches from logarithmic to power-law.
pub const TEMPERATURE_KNEE: f32 = 66.0;

const GREEN_LOG_SCALE: f32 = 99.470_802_586_1;
const GREEN_LOG_OFFSET: f32 = 161.119_568_166_1;
const BLUE_LOG_SCALE: f32 = 138.517_731_223_1;
const BLUE_LOG_OFFSET: f32 = 305.044_792_730_7;
const BLUE_LOG_SHIFT: f32 = 10.0;

const POW_SHIFT: f32 = 60.0;
const RED_POW_SCALE: f32 = 329.698_727_446;
const RED_POW_EXP: f32 = -0.133_204_759_2;
const GREEN_POW_SCALE: f32 = 288.122_169_528_3;
const GREEN_POW_EXP: f32 = -0.075_514_849_2;

const CHANNEL_MAX: f32 = 255.0;

/// Four-channel colour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgbw {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub white: u8,
}

impl Rgbw {
    pub const fn new(red: u8, green: u8, blue: u8, white: u8) -> Self {
        Self {
            red,
            green,
            blue,
            white,
        }
    }
}

/// One solid frame applied to every pixel of the strip.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Frame {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub white: u8,
    pub brightness: u8,
}

/// Per-channel factors in `[0, 255]` for a colour temperature.
pub fn temperature_factors(kelvin: u16) -> [f32; 3] {
    let t = f32::from(kelvin) / 100.0;

    let (red, green, blue) = if t <= TEMPERATURE_KNEE {
        (
            CHANNEL_MAX,
            GREEN_LOG_SCALE * t.ln() - GREEN_LOG_OFFSET,
            // ln of a non-positive argument is NaN or -inf; both clamp to 0.
            BLUE_LOG_SCALE * (t - BLUE_LOG_SHIFT).ln() - BLUE_LOG_OFFSET,
        )
    } else {
        (
            RED_POW_SCALE * (t - POW_SHIFT).powf(RED_POW_EXP),
            GREEN_POW_SCALE * (t - POW_SHIFT).powf(GREEN_POW_EXP),
            CHANNEL_MAX,
        )
    };

    [clamp_channel(red), clamp_channel(green), clamp_channel(blue)]
}

/// `f32::clamp` propagates NaN; `max` does not.
fn clamp_channel(v: f32) -> f32 {
    v.max(0.0).min(CHANNEL_MAX)
}

fn scale(channel: u8, factor: f32) -> u8 {
    (f32::from(channel) * factor / CHANNEL_MAX) as u8
}

/// Tint `color` by `kelvin` and pair it with `brightness`.  White is not
/// tinted.
pub fn compose_frame(color: Rgbw, kelvin: u16, brightness: u8) -> Frame {
    let [r, g, b] = temperature_factors(kelvin);
    Frame {
        red: scale(color.red, r),
        green: scale(color.green, g),
        blue: scale(color.blue, b),
        white: color.white,
        brightness,
    }
}
