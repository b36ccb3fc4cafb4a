//! Pair with a Smart Flashcard over BLE and provision its Wi-Fi
//! credentials and account token.
//!
//! The library drives one device at a time through a [`SessionController`]:
//! connect, submit a configuration, disconnect. Transports are pluggable;
//! the real BLE backend sits behind the `hardware` cargo feature and a
//! scripted mock ships for tests and radio-less hosts.

pub mod controller;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use controller::SessionController;
pub use error::{PairingError, TokenError, TransportError};
