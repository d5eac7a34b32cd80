//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements              | Connects to              |
//! |-------------|-------------------------|--------------------------|
//! | `hardware`  | InputPort, OutputPort   | GPIO, relays, LEDC PWM   |
//! | `espnow`    | TransportPort           | ESP-NOW over Wi-Fi STA   |
//! | `nvs`       | ConfigPort, StoragePort | NVS / in-memory store    |
//! | `log_sink`  | EventSink               | Serial log output        |
//! | `serial`    |                         | Console lines on stdin   |
//! | `time`      |                         | ESP32 system timer       |
//! | `device_id` |                         | Factory MAC              |

pub mod device_id;
pub mod espnow;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod serial;
pub mod time;
