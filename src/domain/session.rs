//! Pairing session state machine.
//!
//! A session owns the transport handles for one device at a time. All
//! operations take `&mut self`, so at most one runs at any moment, and each
//! starts by absorbing any loss event that arrived while the session sat
//! idle. Handles are cleared in the same call that moves the state, so a
//! service handle can never outlive its link.

use crate::domain::models::{
    CharacteristicMap, ConfigPayload, DeviceDescriptor, SessionState,
};
use crate::domain::status::StatusReporter;
use crate::domain::writer;
use crate::error::{PairingError, TransportError};
use crate::infrastructure::transport::{DisconnectWatch, Transport};
use tracing::{debug, info, warn};

pub struct PairingSession<T: Transport> {
    transport: T,
    descriptor: DeviceDescriptor,
    characteristics: CharacteristicMap,
    reporter: StatusReporter,
    state: SessionState,
    link: Option<T::Link>,
    service: Option<T::Service>,
    watch: Option<DisconnectWatch>,
    last_error: Option<PairingError>,
}

impl<T: Transport> PairingSession<T> {
    pub fn new(
        transport: T,
        descriptor: DeviceDescriptor,
        characteristics: CharacteristicMap,
        reporter: StatusReporter,
    ) -> Self {
        Self {
            transport,
            descriptor,
            characteristics,
            reporter,
            state: SessionState::Disconnected,
            link: None,
            service: None,
            watch: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn last_error(&self) -> Option<&PairingError> {
        self.last_error.as_ref()
    }

    /// Applies a loss event that arrived while no operation was running.
    pub fn absorb_link_loss(&mut self) {
        let lost = self.watch.as_mut().is_some_and(DisconnectWatch::try_lost);
        if lost {
            self.lose_link();
        }
    }

    /// Selects the device, links up, and resolves the configuration
    /// service. On success the session is `Ready`; on any failure it
    /// settles back in `Disconnected` with the error recorded.
    pub async fn connect(&mut self) -> Result<(), PairingError> {
        self.absorb_link_loss();

        if self.state != SessionState::Disconnected {
            return Err(PairingError::SessionBusy);
        }

        if !self.transport.is_available() {
            self.reporter.error("Bluetooth is not available on this host");
            self.last_error = Some(PairingError::Unsupported);
            return Err(PairingError::Unsupported);
        }

        self.state = SessionState::Connecting;
        self.last_error = None;
        self.reporter.info("Connecting to device...");
        info!(device = %self.descriptor.name, "starting pairing attempt");

        let requested = self.transport.request_device(&self.descriptor).await;
        let device = match requested {
            Ok(device) => device,
            Err(cause) => return Err(self.fail_connect(cause)),
        };

        let linked = self.transport.connect(&device).await;
        let link = match linked {
            Ok(link) => link,
            Err(cause) => return Err(self.fail_connect(cause)),
        };

        let watched = self.transport.watch_disconnect(&link).await;
        let mut watch = match watched {
            Ok(watch) => watch,
            Err(cause) => {
                self.teardown_link(&link).await;
                return Err(self.fail_connect(cause));
            }
        };
        self.state = SessionState::Connected;
        debug!("link established");

        self.state = SessionState::Discovering;
        let discovery = watch
            .guard(
                self.transport
                    .discover_service(&link, self.descriptor.service_uuid),
            )
            .await;
        let service = match discovery {
            None => return Err(self.lose_link()),
            Some(Ok(service)) => service,
            Some(Err(cause)) => {
                drop(watch);
                self.teardown_link(&link).await;
                return Err(self.fail_connect(cause));
            }
        };

        self.link = Some(link);
        self.service = Some(service);
        self.watch = Some(watch);
        self.state = SessionState::Ready;
        self.reporter.success("Connected. Ready to configure.");
        info!("configuration service ready");
        Ok(())
    }

    /// Delivers one validated payload over the live session. A transport
    /// failure with the link still up leaves the session `Ready` for
    /// another attempt; a lost link ends the session instead.
    pub async fn submit_configuration(
        &mut self,
        payload: &ConfigPayload,
    ) -> Result<(), PairingError> {
        self.absorb_link_loss();

        if self.state != SessionState::Ready {
            self.reporter
                .error("Error: Bluetooth is not connected. Please connect first.");
            return Err(PairingError::NotConnected);
        }

        let (Some(service), Some(watch)) = (self.service.as_ref(), self.watch.as_mut()) else {
            self.reporter
                .error("Error: Bluetooth is not connected. Please connect first.");
            return Err(PairingError::NotConnected);
        };

        debug!("submitting configuration");
        let outcome = writer::write_configuration(
            &self.transport,
            service,
            watch,
            &self.characteristics,
            payload,
        )
        .await;

        match outcome {
            Ok(()) => {
                self.reporter.success("Configuration saved successfully!");
                info!("configuration committed");
                Ok(())
            }
            Err(PairingError::LinkLost) => Err(self.lose_link()),
            Err(error) => {
                warn!(%error, "configuration write failed");
                self.reporter
                    .error(format!("Error saving configuration: {error}"));
                self.last_error = Some(error.clone());
                Err(error)
            }
        }
    }

    /// Ends the session on the user's request. Calling this with no live
    /// link is a no-op apart from a warning event.
    pub async fn disconnect(&mut self) -> Result<(), PairingError> {
        self.absorb_link_loss();

        let Some(link) = self.link.take() else {
            self.reporter.warning("Bluetooth is not connected");
            return Ok(());
        };

        self.state = SessionState::Disconnecting;
        // Deregister the watch before the link goes down, so a voluntary
        // teardown is never reported as an unsolicited loss.
        self.watch = None;
        self.service = None;
        debug!("closing session");

        let teardown = self.transport.disconnect(&link).await;
        match teardown {
            Ok(()) => {
                self.state = SessionState::Disconnected;
                self.reporter.info("Device disconnected");
                info!("session closed");
                Ok(())
            }
            Err(cause) => {
                let reason = match cause {
                    TransportError::Disconnect(reason) => reason,
                    other => other.to_string(),
                };
                let error = self.settle_failed(PairingError::DisconnectFailed(reason));
                self.reporter
                    .error(format!("Disconnection error: {error}"));
                Err(error)
            }
        }
    }

    /// Best-effort teardown of a link that never became a full session.
    async fn teardown_link(&mut self, link: &T::Link) {
        self.state = SessionState::Disconnecting;
        if let Err(error) = self.transport.disconnect(link).await {
            debug!(%error, "teardown after a failed step also failed");
        }
    }

    /// The device ended the link on its own. Handles die with it; any
    /// in-flight operation has already been abandoned by its watch.
    fn lose_link(&mut self) -> PairingError {
        warn!("device dropped the link");
        self.clear_handles();
        self.state = SessionState::Disconnected;
        self.reporter.warning("Device disconnected");
        self.last_error = Some(PairingError::LinkLost);
        PairingError::LinkLost
    }

    /// Records a failed connect step and settles in `Disconnected`.
    fn fail_connect(&mut self, cause: TransportError) -> PairingError {
        let error = match cause {
            TransportError::UserCancelled => PairingError::UserCancelled,
            TransportError::DeviceNotFound => PairingError::DeviceNotFound,
            TransportError::ServiceNotFound(service) => PairingError::ServiceNotFound(service),
            TransportError::Connection(reason) => PairingError::ConnectionFailed(reason),
            other => PairingError::ConnectionFailed(other.to_string()),
        };
        match &error {
            PairingError::UserCancelled => self.reporter.warning("Device selection cancelled"),
            other => self.reporter.error(format!("Connection error: {other}")),
        }
        warn!(%error, "pairing attempt failed");
        self.settle_failed(error)
    }

    /// `Failed` never outlives the operation that caused it: record, clean
    /// up, settle in `Disconnected`.
    fn settle_failed(&mut self, error: PairingError) -> PairingError {
        self.state = SessionState::Failed;
        self.clear_handles();
        self.state = SessionState::Disconnected;
        self.last_error = Some(error.clone());
        error
    }

    fn clear_handles(&mut self) {
        self.link = None;
        self.service = None;
        self.watch = None;
    }
}
