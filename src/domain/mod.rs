//! Pairing and provisioning logic, independent of any concrete BLE stack.

pub mod auth;
pub mod models;
pub mod session;
pub mod settings;
pub mod status;
pub(crate) mod writer;

pub use self::auth::{FixedTokenProvider, TokenProvider};
pub use self::models::{
    CharacteristicMap, ConfigField, ConfigPayload, DeviceDescriptor, SessionState,
    WifiCredentials,
};
pub use self::session::PairingSession;
pub use self::settings::{LogSettings, Settings, SettingsService};
pub use self::status::{MessageSeverity, StatusMessage, StatusReporter};
