//! Scripted in-memory transport.
//!
//! Stands in for the BLE stack in tests and on hosts without one. Every
//! call is recorded, so tests can assert on write order and on operations
//! that must never happen.

use crate::domain::models::DeviceDescriptor;
use crate::error::TransportError;
use crate::infrastructure::transport::adapter::{DisconnectWatch, Transport};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use uuid::Uuid;

/// A transport call, as recorded by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOp {
    RequestDevice,
    Connect,
    WatchDisconnect,
    DiscoverService(Uuid),
    WritableEndpoint(Uuid),
    Write(Uuid, Vec<u8>),
    Disconnect,
}

#[derive(Debug, Clone, Default)]
enum WriteScript {
    #[default]
    Succeed,
    Reject(String),
    /// Fires the loss event and never completes, like a write caught by the
    /// device going away.
    LoseLink,
}

#[derive(Default)]
struct MockState {
    calls: Vec<TransportOp>,
    loss_sender: Option<mpsc::UnboundedSender<()>>,
    request_device: Option<TransportError>,
    connect: Option<TransportError>,
    watch: Option<TransportError>,
    discover: Option<TransportError>,
    missing_endpoints: Vec<Uuid>,
    writes: HashMap<Uuid, WriteScript>,
    disconnect: Option<TransportError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockDevice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockLink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockEndpoint {
    pub characteristic: Uuid,
}

/// Clones share one recording, so a test can keep a handle while the
/// session owns another.
#[derive(Clone)]
pub struct MockTransport {
    available: bool,
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// A transport where every operation succeeds.
    pub fn new() -> Self {
        Self {
            available: true,
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// A host with no usable radio.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn reject_request_device(self, error: TransportError) -> Self {
        self.lock().request_device = Some(error);
        self
    }

    pub fn reject_connect(self, error: TransportError) -> Self {
        self.lock().connect = Some(error);
        self
    }

    pub fn reject_watch(self, error: TransportError) -> Self {
        self.lock().watch = Some(error);
        self
    }

    pub fn reject_discovery(self, error: TransportError) -> Self {
        self.lock().discover = Some(error);
        self
    }

    pub fn without_endpoint(self, characteristic: Uuid) -> Self {
        self.lock().missing_endpoints.push(characteristic);
        self
    }

    pub fn reject_write(self, characteristic: Uuid, reason: &str) -> Self {
        self.lock()
            .writes
            .insert(characteristic, WriteScript::Reject(reason.to_string()));
        self
    }

    pub fn lose_link_on_write(self, characteristic: Uuid) -> Self {
        self.lock()
            .writes
            .insert(characteristic, WriteScript::LoseLink);
        self
    }

    pub fn reject_disconnect(self, reason: &str) -> Self {
        self.lock().disconnect = Some(TransportError::Disconnect(reason.to_string()));
        self
    }

    /// Simulates the device dropping the link on its own.
    pub fn drop_link(&self) {
        if let Some(sender) = self.lock().loss_sender.clone() {
            let _ = sender.send(());
        }
    }

    /// Everything the session asked of the transport, in order.
    pub fn calls(&self) -> Vec<TransportOp> {
        self.lock().calls.clone()
    }

    /// Just the writes, as (characteristic, value) pairs.
    pub fn writes(&self) -> Vec<(Uuid, Vec<u8>)> {
        self.lock()
            .calls
            .iter()
            .filter_map(|op| match op {
                TransportOp::Write(uuid, value) => Some((*uuid, value.clone())),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Device = MockDevice;
    type Link = MockLink;
    type Service = MockService;
    type Endpoint = MockEndpoint;

    fn is_available(&self) -> bool {
        self.available
    }

    async fn request_device(
        &self,
        _descriptor: &DeviceDescriptor,
    ) -> Result<MockDevice, TransportError> {
        let script = {
            let mut state = self.lock();
            state.calls.push(TransportOp::RequestDevice);
            state.request_device.clone()
        };
        match script {
            Some(error) => Err(error),
            None => Ok(MockDevice),
        }
    }

    async fn connect(&self, _device: &MockDevice) -> Result<MockLink, TransportError> {
        let script = {
            let mut state = self.lock();
            state.calls.push(TransportOp::Connect);
            state.connect.clone()
        };
        match script {
            Some(error) => Err(error),
            None => Ok(MockLink),
        }
    }

    async fn watch_disconnect(&self, _link: &MockLink) -> Result<DisconnectWatch, TransportError> {
        let (sender, watch) = DisconnectWatch::channel();
        let script = {
            let mut state = self.lock();
            state.calls.push(TransportOp::WatchDisconnect);
            if state.watch.is_none() {
                state.loss_sender = Some(sender);
            }
            state.watch.clone()
        };
        match script {
            Some(error) => Err(error),
            None => Ok(watch),
        }
    }

    async fn discover_service(
        &self,
        _link: &MockLink,
        service: Uuid,
    ) -> Result<MockService, TransportError> {
        let script = {
            let mut state = self.lock();
            state.calls.push(TransportOp::DiscoverService(service));
            state.discover.clone()
        };
        match script {
            Some(error) => Err(error),
            None => Ok(MockService),
        }
    }

    async fn writable_endpoint(
        &self,
        _service: &MockService,
        characteristic: Uuid,
    ) -> Result<MockEndpoint, TransportError> {
        let missing = {
            let mut state = self.lock();
            state.calls.push(TransportOp::WritableEndpoint(characteristic));
            state.missing_endpoints.contains(&characteristic)
        };
        if missing {
            Err(TransportError::EndpointNotFound(characteristic))
        } else {
            Ok(MockEndpoint { characteristic })
        }
    }

    async fn write(&self, endpoint: &MockEndpoint, payload: &[u8]) -> Result<(), TransportError> {
        let (script, loss_sender) = {
            let mut state = self.lock();
            state
                .calls
                .push(TransportOp::Write(endpoint.characteristic, payload.to_vec()));
            (
                state
                    .writes
                    .get(&endpoint.characteristic)
                    .cloned()
                    .unwrap_or_default(),
                state.loss_sender.clone(),
            )
        };
        match script {
            WriteScript::Succeed => Ok(()),
            WriteScript::Reject(reason) => Err(TransportError::Write(reason)),
            WriteScript::LoseLink => {
                if let Some(sender) = loss_sender {
                    let _ = sender.send(());
                }
                std::future::pending().await
            }
        }
    }

    async fn disconnect(&self, _link: &MockLink) -> Result<(), TransportError> {
        let script = {
            let mut state = self.lock();
            state.calls.push(TransportOp::Disconnect);
            state.loss_sender = None;
            state.disconnect.clone()
        };
        match script {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
