//! One façade over the session, the token provider, and the status feed.
//!
//! Callers hand in Wi-Fi credentials; the controller fetches the bearer
//! token, builds the validated payload, and drives the session. Status
//! events queue up on an unbounded channel until the caller polls them.

use crate::domain::auth::TokenProvider;
use crate::domain::models::{
    CharacteristicMap, ConfigPayload, DeviceDescriptor, SessionState, WifiCredentials,
};
use crate::domain::session::PairingSession;
use crate::domain::status::{StatusMessage, StatusReporter};
use crate::error::PairingError;
use crate::infrastructure::transport::Transport;
use tokio::sync::mpsc;
use tracing::warn;

pub struct SessionController<T: Transport, P: TokenProvider> {
    session: PairingSession<T>,
    tokens: P,
    events: mpsc::UnboundedReceiver<StatusMessage>,
    reporter: StatusReporter,
}

impl<T: Transport, P: TokenProvider> SessionController<T, P> {
    pub fn new(
        transport: T,
        descriptor: DeviceDescriptor,
        characteristics: CharacteristicMap,
        tokens: P,
    ) -> Self {
        let (reporter, events) = StatusReporter::new();
        let session =
            PairingSession::new(transport, descriptor, characteristics, reporter.clone());
        Self {
            session,
            tokens,
            events,
            reporter,
        }
    }

    pub async fn connect(&mut self) -> Result<(), PairingError> {
        self.session.connect().await
    }

    pub async fn disconnect(&mut self) -> Result<(), PairingError> {
        self.session.disconnect().await
    }

    /// Provisions the device with the given credentials. The bearer token
    /// is fetched fresh for every submission.
    pub async fn submit_configuration(
        &mut self,
        credentials: &WifiCredentials,
    ) -> Result<(), PairingError> {
        self.session.absorb_link_loss();
        if self.session.state() != SessionState::Ready {
            self.reporter
                .error("Error: Bluetooth is not connected. Please connect first.");
            return Err(PairingError::NotConnected);
        }

        let fetched = self.tokens.bearer_token().await;
        let token = match fetched {
            Ok(token) => token,
            Err(cause) => {
                let error = PairingError::Token(cause.to_string());
                warn!(%error, "token fetch failed");
                self.reporter
                    .error(format!("Error saving configuration: {error}"));
                return Err(error);
            }
        };

        let payload =
            match ConfigPayload::new(&credentials.ssid, &credentials.password, token) {
                Ok(payload) => payload,
                Err(error) => {
                    self.reporter
                        .error(format!("Error saving configuration: {error}"));
                    return Err(error);
                }
            };

        self.session.submit_configuration(&payload).await
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    pub fn last_error(&self) -> Option<&PairingError> {
        self.session.last_error()
    }

    /// The most recent status event, polled or not.
    pub fn last_status(&self) -> Option<StatusMessage> {
        self.reporter.last()
    }

    /// Everything reported since the previous poll, oldest first. Also
    /// picks up a link loss that happened while the controller sat idle.
    pub fn poll_events(&mut self) -> Vec<StatusMessage> {
        self.session.absorb_link_loss();
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::auth::FixedTokenProvider;
    use crate::domain::models::ConfigField;
    use crate::domain::status::MessageSeverity;
    use crate::error::TokenError;
    use crate::infrastructure::transport::mock::MockTransport;
    use crate::infrastructure::transport::protocol;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn credentials() -> WifiCredentials {
        WifiCredentials {
            ssid: "attic-wifi".to_string(),
            password: "hunter2".to_string(),
        }
    }

    fn controller<P: TokenProvider>(
        transport: MockTransport,
        tokens: P,
    ) -> SessionController<MockTransport, P> {
        SessionController::new(
            transport,
            protocol::default_descriptor(),
            protocol::default_characteristics(),
            tokens,
        )
    }

    #[derive(Clone, Default)]
    struct CountingProvider {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TokenProvider for CountingProvider {
        async fn bearer_token(&self) -> Result<String, TokenError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("counted-token".to_string())
        }
    }

    struct NoUser;

    #[async_trait]
    impl TokenProvider for NoUser {
        async fn bearer_token(&self) -> Result<String, TokenError> {
            Err(TokenError::NotAuthenticated)
        }
    }

    #[tokio::test]
    async fn token_rides_along_as_the_third_write() {
        let transport = MockTransport::new();
        let mut controller = controller(transport.clone(), FixedTokenProvider::new("uid-123"));

        controller.connect().await.unwrap();
        controller.poll_events();
        controller.submit_configuration(&credentials()).await.unwrap();

        assert_eq!(
            transport.writes(),
            vec![
                (protocol::SSID_CHAR_UUID, b"attic-wifi".to_vec()),
                (protocol::PASSWORD_CHAR_UUID, b"hunter2".to_vec()),
                (protocol::TOKEN_CHAR_UUID, b"uid-123".to_vec()),
            ]
        );

        let events = controller.poll_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "Configuration saved successfully!");
    }

    #[tokio::test]
    async fn empty_ssid_never_touches_the_device() {
        let transport = MockTransport::new();
        let mut controller = controller(transport.clone(), FixedTokenProvider::new("uid-123"));

        controller.connect().await.unwrap();
        controller.poll_events();

        let bad = WifiCredentials {
            ssid: String::new(),
            password: "hunter2".to_string(),
        };
        let error = controller.submit_configuration(&bad).await.unwrap_err();

        assert_eq!(error, PairingError::EmptyField(ConfigField::Ssid));
        assert!(transport.writes().is_empty());
        assert_eq!(controller.state(), SessionState::Ready);

        let events = controller.poll_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].severity, MessageSeverity::Error);
        assert_eq!(
            events[0].message,
            "Error saving configuration: ssid must not be empty"
        );
    }

    #[tokio::test]
    async fn failing_token_provider_is_reported() {
        let transport = MockTransport::new();
        let mut controller = controller(transport.clone(), NoUser);

        controller.connect().await.unwrap();
        controller.poll_events();

        let error = controller.submit_configuration(&credentials()).await.unwrap_err();

        assert_eq!(error, PairingError::Token("no signed-in user".to_string()));
        assert!(transport.writes().is_empty());
        assert_eq!(controller.state(), SessionState::Ready);

        let events = controller.poll_events();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].message,
            "Error saving configuration: could not obtain an access token: no signed-in user"
        );
    }

    #[tokio::test]
    async fn submit_before_connect_skips_the_token_fetch() {
        let transport = MockTransport::new();
        let tokens = CountingProvider::default();
        let mut controller = controller(transport.clone(), tokens.clone());

        let error = controller.submit_configuration(&credentials()).await.unwrap_err();

        assert_eq!(error, PairingError::NotConnected);
        assert_eq!(tokens.calls.load(Ordering::SeqCst), 0);
        assert!(transport.calls().is_empty());

        let events = controller.poll_events();
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].message,
            "Error: Bluetooth is not connected. Please connect first."
        );
    }

    #[tokio::test]
    async fn poll_drains_oldest_first_and_only_once() {
        let transport = MockTransport::new();
        let mut controller = controller(transport, FixedTokenProvider::new("uid-123"));

        controller.connect().await.unwrap();

        let events = controller.poll_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message, "Connecting to device...");
        assert_eq!(events[1].message, "Connected. Ready to configure.");
        assert!(controller.poll_events().is_empty());
    }

    #[tokio::test]
    async fn idle_link_loss_surfaces_on_the_next_poll() {
        let transport = MockTransport::new();
        let mut controller = controller(transport.clone(), FixedTokenProvider::new("uid-123"));

        controller.connect().await.unwrap();
        controller.poll_events();

        transport.drop_link();
        let events = controller.poll_events();

        assert_eq!(controller.state(), SessionState::Disconnected);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, "Device disconnected");
        assert_eq!(events[0].severity, MessageSeverity::Warning);
    }

    #[tokio::test]
    async fn last_status_tracks_the_feed() {
        let transport = MockTransport::new();
        let mut controller = controller(transport, FixedTokenProvider::new("uid-123"));

        assert!(controller.last_status().is_none());

        controller.connect().await.unwrap();
        assert_eq!(
            controller.last_status().unwrap().message,
            "Connected. Ready to configure."
        );

        controller.disconnect().await.unwrap();
        assert_eq!(controller.last_status().unwrap().message, "Device disconnected");
        assert!(controller.last_error().is_none());
    }
}
