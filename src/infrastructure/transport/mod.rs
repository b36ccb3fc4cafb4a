//! Transport Module
//!
//! Everything the pairing session needs from a BLE stack, behind one trait.
//!
//! ## Modules
//!
//! - [`adapter`] - the [`Transport`] trait and the disconnect watch
//! - [`protocol`] - Smart Flashcard GATT contract (device name, UUIDs)
//! - [`mock`] - scripted transport for tests and radio-less hosts
//! - [`btleplug`] - real BLE transport (cargo feature `hardware`)

pub mod adapter;
#[cfg(feature = "hardware")]
pub mod btleplug;
pub mod mock;
pub mod protocol;

pub use self::adapter::{DisconnectWatch, Transport};
#[cfg(feature = "hardware")]
pub use self::btleplug::BtleplugTransport;
pub use self::mock::{MockTransport, TransportOp};
