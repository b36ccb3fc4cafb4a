//! Host-facing pieces: logging setup and the BLE transport backends.

pub mod logging;
pub mod transport;
