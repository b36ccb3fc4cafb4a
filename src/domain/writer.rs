//! Ordered delivery of the configuration payload.

use crate::domain::models::{CharacteristicMap, ConfigField, ConfigPayload};
use crate::error::{PairingError, TransportError};
use crate::infrastructure::transport::{DisconnectWatch, Transport};
use tracing::debug;
use uuid::Uuid;

/// Writes the payload fields in protocol order, stopping at the first
/// failure. The token goes last; the device treats that write as the commit
/// signal for the whole set.
///
/// Every transport call is raced against the disconnect watch, so a link
/// that dies mid-sequence surfaces as [`PairingError::LinkLost`] and any
/// result arriving after the loss is discarded.
pub(crate) async fn write_configuration<T: Transport>(
    transport: &T,
    service: &T::Service,
    watch: &mut DisconnectWatch,
    characteristics: &CharacteristicMap,
    payload: &ConfigPayload,
) -> Result<(), PairingError> {
    for (field, value) in payload.fields() {
        let characteristic = characteristics.characteristic(field);
        write_field(transport, service, watch, field, characteristic, value).await?;
    }
    Ok(())
}

async fn write_field<T: Transport>(
    transport: &T,
    service: &T::Service,
    watch: &mut DisconnectWatch,
    field: ConfigField,
    characteristic: Uuid,
    value: &str,
) -> Result<(), PairingError> {
    let endpoint = match watch
        .guard(transport.writable_endpoint(service, characteristic))
        .await
    {
        None => return Err(PairingError::LinkLost),
        Some(Ok(endpoint)) => endpoint,
        Some(Err(TransportError::EndpointNotFound(characteristic))) => {
            return Err(PairingError::EndpointNotFound {
                field,
                characteristic,
            })
        }
        Some(Err(source)) => return Err(PairingError::WriteFailed { field, source }),
    };

    match watch.guard(transport.write(&endpoint, value.as_bytes())).await {
        None => Err(PairingError::LinkLost),
        Some(Ok(())) => {
            debug!(%field, "field written");
            Ok(())
        }
        Some(Err(source)) => Err(PairingError::WriteFailed { field, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::transport::mock::{MockService, MockTransport};
    use crate::infrastructure::transport::{protocol, TransportOp};

    fn payload() -> ConfigPayload {
        ConfigPayload::new("attic-wifi", "hunter2", "user-42").unwrap()
    }

    #[tokio::test]
    async fn fields_go_out_in_protocol_order() {
        let transport = MockTransport::new();
        let (_sender, mut watch) = DisconnectWatch::channel();

        write_configuration(
            &transport,
            &MockService,
            &mut watch,
            &protocol::default_characteristics(),
            &payload(),
        )
        .await
        .unwrap();

        let written: Vec<Uuid> = transport.writes().into_iter().map(|(uuid, _)| uuid).collect();
        assert_eq!(
            written,
            vec![
                protocol::SSID_CHAR_UUID,
                protocol::PASSWORD_CHAR_UUID,
                protocol::TOKEN_CHAR_UUID
            ]
        );
    }

    #[tokio::test]
    async fn first_failure_stops_the_sequence() {
        let transport = MockTransport::new().reject_write(protocol::SSID_CHAR_UUID, "nack");
        let (_sender, mut watch) = DisconnectWatch::channel();

        let error = write_configuration(
            &transport,
            &MockService,
            &mut watch,
            &protocol::default_characteristics(),
            &payload(),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            error,
            PairingError::WriteFailed {
                field: ConfigField::Ssid,
                ..
            }
        ));
        assert_eq!(transport.writes().len(), 1);
    }

    #[tokio::test]
    async fn missing_characteristic_names_the_field() {
        let transport = MockTransport::new().without_endpoint(protocol::PASSWORD_CHAR_UUID);
        let (_sender, mut watch) = DisconnectWatch::channel();

        let error = write_configuration(
            &transport,
            &MockService,
            &mut watch,
            &protocol::default_characteristics(),
            &payload(),
        )
        .await
        .unwrap_err();

        assert_eq!(
            error,
            PairingError::EndpointNotFound {
                field: ConfigField::Password,
                characteristic: protocol::PASSWORD_CHAR_UUID,
            }
        );
        // The ssid write landed; nothing after the failure did.
        assert_eq!(transport.writes().len(), 1);
        assert!(!transport
            .calls()
            .contains(&TransportOp::WritableEndpoint(protocol::TOKEN_CHAR_UUID)));
    }

    #[tokio::test]
    async fn pending_loss_short_circuits_the_sequence() {
        let transport = MockTransport::new();
        let (sender, mut watch) = DisconnectWatch::channel();
        sender.send(()).unwrap();

        let error = write_configuration(
            &transport,
            &MockService,
            &mut watch,
            &protocol::default_characteristics(),
            &payload(),
        )
        .await
        .unwrap_err();

        assert_eq!(error, PairingError::LinkLost);
        assert!(transport.writes().is_empty());
    }
}
