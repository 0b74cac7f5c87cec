//! Addressable LED strip adapter.
//!
//! Implements [`RenderPort`] by encoding a solid [`Frame`] into per-pixel
//! bytes and clocking them out to a WS2812-class strip.
//!
//! - **`target_os = "espidf"`**: RMT channel driven through
//!   `esp_idf_hal::rmt::TxRmtDriver`, one 800 kHz bit per pulse pair.
//! - **all other targets**: keeps the encoded buffer and last frame for
//!   inspection by tests.
//!
//! Brightness is applied per channel as `(c * (b + 1)) >> 8`, so 255 is
//! lossless and 0 is dark.

use log::info;

use crate::app::ports::RenderPort;
use crate::light::color::Frame;

#[cfg(target_os = "espidf")]
use esp_idf_hal::rmt::{PinState, Pulse, TxRmtDriver, VariableLengthSignal};

/// Wire order of colour channels within one pixel.  WS2812B strips take
/// `Grb`; `Grbw` is for SK6812 RGBW parts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PixelOrder {
    /// Three bytes: green, red, blue.  White is dropped.
    #[default]
    Grb,
    /// Four bytes: green, red, blue, white.
    Grbw,
}

impl PixelOrder {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Grb => 3,
            Self::Grbw => 4,
        }
    }
}

/// Scale one channel by a 0–255 brightness.
pub fn scale_channel(c: u8, brightness: u8) -> u8 {
    ((u16::from(c) * (u16::from(brightness) + 1)) >> 8) as u8
}

/// Encode one pixel of `frame` into `out`, returning the bytes written.
pub fn encode_pixel(frame: &Frame, order: PixelOrder, out: &mut [u8; 4]) -> usize {
    let b = frame.brightness;
    out[0] = scale_channel(frame.green, b);
    out[1] = scale_channel(frame.red, b);
    out[2] = scale_channel(frame.blue, b);
    out[3] = scale_channel(frame.white, b);
    order.bytes_per_pixel()
}

pub struct LedStripAdapter {
    led_count: u16,
    order: PixelOrder,
    buf: Vec<u8>,
    frames_rendered: u32,
    last_frame: Option<Frame>,
    #[cfg(target_os = "espidf")]
    tx: TxRmtDriver<'static>,
}

impl LedStripAdapter {
    /// Wrap an RMT transmitter already bound to the strip's data pin.
    #[cfg(target_os = "espidf")]
    pub fn new(tx: TxRmtDriver<'static>, led_count: u16, order: PixelOrder) -> Self {
        info!(
            "LedStrip: {} pixels ({:?}) on GPIO {}",
            led_count,
            order,
            crate::pins::LED_DATA_GPIO
        );
        Self {
            led_count,
            order,
            buf: Vec::with_capacity(usize::from(led_count) * order.bytes_per_pixel()),
            frames_rendered: 0,
            last_frame: None,
            tx,
        }
    }

    /// Simulation strip.
    #[cfg(not(target_os = "espidf"))]
    pub fn new(led_count: u16, order: PixelOrder) -> Self {
        info!("LedStrip(sim): {} pixels ({:?})", led_count, order);
        Self {
            led_count,
            order,
            buf: Vec::with_capacity(usize::from(led_count) * order.bytes_per_pixel()),
            frames_rendered: 0,
            last_frame: None,
        }
    }

    fn encode(&mut self, frame: &Frame) {
        let mut px = [0u8; 4];
        let n = encode_pixel(frame, self.order, &mut px);
        self.buf.clear();
        for _ in 0..self.led_count {
            self.buf.extend_from_slice(&px[..n]);
        }
    }

    #[cfg(target_os = "espidf")]
    fn transmit(&mut self) -> Result<(), esp_idf_svc::sys::EspError> {
        let ticks_hz = self.tx.counter_clock()?;
        let ns = |n| core::time::Duration::from_nanos(n);
        let t0h = Pulse::new_with_duration(ticks_hz, PinState::High, &ns(350))?;
        let t0l = Pulse::new_with_duration(ticks_hz, PinState::Low, &ns(800))?;
        let t1h = Pulse::new_with_duration(ticks_hz, PinState::High, &ns(700))?;
        let t1l = Pulse::new_with_duration(ticks_hz, PinState::Low, &ns(600))?;

        let mut signal = VariableLengthSignal::new();
        for byte in &self.buf {
            for bit in (0..8).rev() {
                let pair = if byte & (1 << bit) != 0 { [&t1h, &t1l] } else { [&t0h, &t0l] };
                signal.push(pair)?;
            }
        }
        self.tx.start_blocking(&signal)
    }

    #[cfg(not(target_os = "espidf"))]
    fn transmit(&mut self) -> Result<(), crate::error::Error> {
        Ok(())
    }

    /// Bytes of the last encoded frame (all pixels).
    pub fn encoded(&self) -> &[u8] {
        &self.buf
    }

    pub fn last_frame(&self) -> Option<Frame> {
        self.last_frame
    }

    pub fn frames_rendered(&self) -> u32 {
        self.frames_rendered
    }

    pub fn led_count(&self) -> u16 {
        self.led_count
    }
}

impl RenderPort for LedStripAdapter {
    fn render(&mut self, frame: &Frame) {
        self.encode(frame);
        if let Err(e) = self.transmit() {
            // Render failures are not reported upward; the next frame retries.
            log::warn!("LedStrip: transmit failed: {:?}", e);
        }
        self.last_frame = Some(*frame);
        self.frames_rendered = self.frames_rendered.wrapping_add(1);
    }
}
