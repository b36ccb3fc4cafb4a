use crate::error::PairingError;
use std::fmt;
use uuid::Uuid;

/// Connection lifecycle of a pairing session.
///
/// `Failed` is transient: a failed operation records its error, cleans up,
/// and settles back in `Disconnected`. Sessions rest only in `Disconnected`
/// and `Ready`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Discovering,
    Ready,
    Disconnecting,
    Failed,
}

impl SessionState {
    /// True while a device link is held.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected | Self::Discovering | Self::Ready)
    }
}

/// The device to look for during selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub name: String,
    pub service_uuid: Uuid,
}

/// One field of the configuration payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    Ssid,
    Password,
    AuthToken,
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Ssid => "ssid",
            Self::Password => "password",
            Self::AuthToken => "auth token",
        };
        f.write_str(label)
    }
}

/// Which characteristic receives each configuration field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacteristicMap {
    pub ssid: Uuid,
    pub password: Uuid,
    pub auth_token: Uuid,
}

impl CharacteristicMap {
    pub fn characteristic(&self, field: ConfigField) -> Uuid {
        match field {
            ConfigField::Ssid => self.ssid,
            ConfigField::Password => self.password,
            ConfigField::AuthToken => self.auth_token,
        }
    }
}

/// What the user types into the provisioning form.
#[derive(Debug, Clone)]
pub struct WifiCredentials {
    pub ssid: String,
    pub password: String,
}

/// A validated configuration set, built once per submission.
///
/// Field order matters to the device: the token write commits the whole set,
/// so it always goes last.
#[derive(Debug, Clone)]
pub struct ConfigPayload {
    ssid: String,
    password: String,
    auth_token: String,
}

impl ConfigPayload {
    /// Builds a payload, rejecting the first empty field.
    pub fn new(
        ssid: impl Into<String>,
        password: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Result<Self, PairingError> {
        let payload = Self {
            ssid: ssid.into(),
            password: password.into(),
            auth_token: auth_token.into(),
        };
        for (field, value) in payload.fields() {
            if value.is_empty() {
                return Err(PairingError::EmptyField(field));
            }
        }
        Ok(payload)
    }

    /// Fields in the order the device expects them written.
    pub fn fields(&self) -> [(ConfigField, &str); 3] {
        [
            (ConfigField::Ssid, self.ssid.as_str()),
            (ConfigField::Password, self.password.as_str()),
            (ConfigField::AuthToken, self.auth_token.as_str()),
        ]
    }
}
