//! BLE transport backed by `btleplug`.
//!
//! Device selection is a bounded scan: the flashcard advertises its name
//! while in setup mode, and the first peripheral advertising that exact
//! name wins. There is no retry; a scan window that ends without a match
//! reports the device as not found.

use crate::domain::models::DeviceDescriptor;
use crate::error::TransportError;
use crate::infrastructure::transport::adapter::{DisconnectWatch, Transport};
use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, Service,
    WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

const DEFAULT_SCAN_WINDOW: Duration = Duration::from_secs(10);
const SCAN_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A discovered service, kept together with the peripheral that owns it.
pub struct BleService {
    peripheral: Peripheral,
    service: Service,
}

/// A writable characteristic, kept together with its peripheral.
pub struct BleEndpoint {
    peripheral: Peripheral,
    characteristic: Characteristic,
}

pub struct BtleplugTransport {
    adapter: Option<Adapter>,
    scan_window: Duration,
}

impl BtleplugTransport {
    /// Picks the first usable adapter. A host without one still constructs;
    /// it just probes as unavailable.
    pub async fn new() -> Result<Self, TransportError> {
        let manager = Manager::new().await.map_err(backend)?;
        let adapter = manager
            .adapters()
            .await
            .map_err(backend)?
            .into_iter()
            .next();
        if adapter.is_none() {
            warn!("no bluetooth adapter present");
        }
        Ok(Self {
            adapter,
            scan_window: DEFAULT_SCAN_WINDOW,
        })
    }

    pub fn with_scan_window(mut self, window: Duration) -> Self {
        self.scan_window = window;
        self
    }

    fn adapter(&self) -> Result<&Adapter, TransportError> {
        self.adapter
            .as_ref()
            .ok_or_else(|| TransportError::Backend("no bluetooth adapter".to_string()))
    }
}

#[async_trait]
impl Transport for BtleplugTransport {
    type Device = Peripheral;
    type Link = Peripheral;
    type Service = BleService;
    type Endpoint = BleEndpoint;

    fn is_available(&self) -> bool {
        self.adapter.is_some()
    }

    async fn request_device(
        &self,
        descriptor: &DeviceDescriptor,
    ) -> Result<Peripheral, TransportError> {
        let adapter = self.adapter()?;
        info!(device = %descriptor.name, "scanning for device");

        adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(backend)?;
        let deadline = Instant::now() + self.scan_window;

        let found = loop {
            sleep(SCAN_POLL_INTERVAL).await;

            let peripherals = adapter.peripherals().await.map_err(backend)?;
            let mut matched = None;
            for peripheral in peripherals {
                let Ok(Some(properties)) = peripheral.properties().await else {
                    continue;
                };
                if properties.local_name.as_deref() == Some(descriptor.name.as_str()) {
                    matched = Some(peripheral);
                    break;
                }
            }

            if let Some(peripheral) = matched {
                break Some(peripheral);
            }
            if Instant::now() >= deadline {
                break None;
            }
        };

        if let Err(error) = adapter.stop_scan().await {
            debug!(%error, "failed to stop scan cleanly");
        }

        match found {
            Some(peripheral) => {
                info!(id = %peripheral.id(), "device found");
                Ok(peripheral)
            }
            None => Err(TransportError::DeviceNotFound),
        }
    }

    async fn connect(&self, device: &Peripheral) -> Result<Peripheral, TransportError> {
        let connected = device.is_connected().await.map_err(connection)?;
        if !connected {
            device.connect().await.map_err(connection)?;
        }
        Ok(device.clone())
    }

    async fn watch_disconnect(
        &self,
        link: &Peripheral,
    ) -> Result<DisconnectWatch, TransportError> {
        let mut events = self.adapter()?.events().await.map_err(backend)?;
        let id = link.id();
        let (sender, watch) = DisconnectWatch::channel();

        // Ends when the loss fires or the watch is dropped, whichever
        // comes first.
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = sender.closed() => break,
                    event = events.next() => match event {
                        Some(CentralEvent::DeviceDisconnected(gone)) if gone == id => {
                            let _ = sender.send(());
                            break;
                        }
                        Some(_) => {}
                        None => break,
                    },
                }
            }
        });

        Ok(watch)
    }

    async fn discover_service(
        &self,
        link: &Peripheral,
        service: Uuid,
    ) -> Result<BleService, TransportError> {
        link.discover_services().await.map_err(connection)?;
        link.services()
            .into_iter()
            .find(|candidate| candidate.uuid == service)
            .map(|found| BleService {
                peripheral: link.clone(),
                service: found,
            })
            .ok_or(TransportError::ServiceNotFound(service))
    }

    async fn writable_endpoint(
        &self,
        service: &BleService,
        characteristic: Uuid,
    ) -> Result<BleEndpoint, TransportError> {
        service
            .service
            .characteristics
            .iter()
            .find(|candidate| candidate.uuid == characteristic)
            .cloned()
            .map(|found| BleEndpoint {
                peripheral: service.peripheral.clone(),
                characteristic: found,
            })
            .ok_or(TransportError::EndpointNotFound(characteristic))
    }

    async fn write(&self, endpoint: &BleEndpoint, payload: &[u8]) -> Result<(), TransportError> {
        endpoint
            .peripheral
            .write(&endpoint.characteristic, payload, WriteType::WithResponse)
            .await
            .map_err(|error| TransportError::Write(error.to_string()))
    }

    async fn disconnect(&self, link: &Peripheral) -> Result<(), TransportError> {
        let connected = link.is_connected().await.unwrap_or(false);
        if connected {
            link.disconnect()
                .await
                .map_err(|error| TransportError::Disconnect(error.to_string()))?;
        }
        Ok(())
    }
}

fn backend(error: btleplug::Error) -> TransportError {
    TransportError::Backend(error.to_string())
}

fn connection(error: btleplug::Error) -> TransportError {
    TransportError::Connection(error.to_string())
}
