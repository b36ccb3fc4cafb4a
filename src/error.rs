//! Error types for the pairing and provisioning pipeline.
//!
//! Transport failures stay close to the radio vocabulary; `PairingError` is
//! what session callers see, with every variant mapped to a status event and
//! a defined session state.

use crate::domain::models::ConfigField;
use thiserror::Error;
use uuid::Uuid;

/// Failures reported by a transport backend.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    #[error("user cancelled device selection")]
    UserCancelled,

    #[error("no matching device found")]
    DeviceNotFound,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("service {0} not found")]
    ServiceNotFound(Uuid),

    #[error("characteristic {0} not found")]
    EndpointNotFound(Uuid),

    #[error("write rejected: {0}")]
    Write(String),

    #[error("disconnect failed: {0}")]
    Disconnect(String),

    #[error("{0}")]
    Backend(String),
}

/// Failures surfaced by a pairing session or its controller.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PairingError {
    #[error("bluetooth is not available on this host")]
    Unsupported,

    #[error("device selection was cancelled")]
    UserCancelled,

    #[error("no matching device found")]
    DeviceNotFound,

    #[error("{0}")]
    ConnectionFailed(String),

    #[error("configuration service {0} not found on device")]
    ServiceNotFound(Uuid),

    #[error("{field} characteristic not found")]
    EndpointNotFound { field: ConfigField, characteristic: Uuid },

    #[error("writing {field} failed: {source}")]
    WriteFailed {
        field: ConfigField,
        source: TransportError,
    },

    #[error("not connected")]
    NotConnected,

    #[error("device connection was lost")]
    LinkLost,

    #[error("another pairing operation is still in progress")]
    SessionBusy,

    #[error("{0} must not be empty")]
    EmptyField(ConfigField),

    #[error("could not obtain an access token: {0}")]
    Token(String),

    #[error("{0}")]
    DisconnectFailed(String),
}

/// Failures from the identity provider backing [`crate::domain::auth::TokenProvider`].
#[derive(Debug, Error, PartialEq)]
pub enum TokenError {
    #[error("no signed-in user")]
    NotAuthenticated,

    #[error("token request failed: {0}")]
    Fetch(String),
}
