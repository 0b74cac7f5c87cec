//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements       | Connects to               |
//! |-------------|------------------|---------------------------|
//! | `ble_scan`  | ScanPort         | Bluedroid GAP scanner     |
//! | `console`   | COMMANDS queue   | UART0 serial lines        |
//! | `led_strip` | RenderPort       | WS2812 strip via RMT      |
//! | `log_sink`  | EventSink        | Serial log output         |
//! | `nvs`       | ConfigPort       | NVS / in-memory store     |
//! | `time`      | ClockPort        | ESP32 system timer        |
//! | `wifi`      | ConnectivityPort | ESP-IDF WiFi STA          |

pub mod ble_scan;
pub mod console;
pub mod led_strip;
pub mod log_sink;
pub mod nvs;
pub mod time;
pub mod wifi;
