//! Smart Flashcard configuration protocol.
//!
//! The device advertises one configuration service with three writable
//! characteristics. Firmware applies the credentials when the token
//! characteristic is written, so that write always goes last.

use crate::domain::models::{CharacteristicMap, DeviceDescriptor};
use uuid::Uuid;

/// Advertised name of a flashcard in setup mode.
pub const DEVICE_NAME: &str = "Smart Flashcard ESP32";

/// Configuration service (custom 128-bit UUID).
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x19b10000_e8f2_537e_4f6c_d104768a1214);

// Characteristic UUIDs
pub const SSID_CHAR_UUID: Uuid = Uuid::from_u128(0x041675c7_d7e3_4b75_90f9_0c690823f847);
pub const PASSWORD_CHAR_UUID: Uuid = Uuid::from_u128(0x7589f9d3_eb44_423b_ba32_664e40da9ac2);
pub const TOKEN_CHAR_UUID: Uuid = Uuid::from_u128(0xe6d7c837_879f_4139_8834_ceb5f7e3bafe);

/// Descriptor for a stock flashcard.
pub fn default_descriptor() -> DeviceDescriptor {
    DeviceDescriptor {
        name: DEVICE_NAME.to_string(),
        service_uuid: SERVICE_UUID,
    }
}

/// Field-to-characteristic mapping for a stock flashcard.
pub fn default_characteristics() -> CharacteristicMap {
    CharacteristicMap {
        ssid: SSID_CHAR_UUID,
        password: PASSWORD_CHAR_UUID,
        auth_token: TOKEN_CHAR_UUID,
    }
}
