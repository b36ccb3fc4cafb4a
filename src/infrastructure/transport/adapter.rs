//! The seam between the pairing session and a BLE stack.

use crate::domain::models::DeviceDescriptor;
use crate::error::TransportError;
use async_trait::async_trait;
use std::future::Future;
use tokio::sync::mpsc;
use uuid::Uuid;

/// One-shot notification that a link was lost without being asked.
///
/// Dropping the watch deregisters interest. `lost()` resolves only on a
/// genuine loss event; a sender that goes away without firing means the
/// link outlived the watcher, and `lost()` then pends forever.
pub struct DisconnectWatch {
    events: mpsc::UnboundedReceiver<()>,
    fired: bool,
}

impl DisconnectWatch {
    pub fn new(events: mpsc::UnboundedReceiver<()>) -> Self {
        Self {
            events,
            fired: false,
        }
    }

    /// Sender half plus the watch, for transports that push loss events.
    pub fn channel() -> (mpsc::UnboundedSender<()>, Self) {
        let (sender, events) = mpsc::unbounded_channel();
        (sender, Self::new(events))
    }

    /// Resolves when the link reports loss.
    pub async fn lost(&mut self) {
        if self.fired {
            return;
        }
        match self.events.recv().await {
            Some(()) => self.fired = true,
            None => std::future::pending().await,
        }
    }

    /// Non-blocking check for a loss event that arrived while idle.
    /// Once a loss is seen it stays seen.
    pub fn try_lost(&mut self) -> bool {
        if !self.fired && self.events.try_recv().is_ok() {
            self.fired = true;
        }
        self.fired
    }

    /// Races `op` against link loss. Loss wins ties, so a result that lands
    /// after the link died is discarded.
    pub async fn guard<F: Future>(&mut self, op: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.lost() => None,
            output = op => Some(output),
        }
    }
}

/// A BLE stack reduced to the operations provisioning needs.
///
/// Implementations perform exactly one attempt per call; retry policy, if
/// any, belongs to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    type Device: Send + Sync;
    type Link: Send + Sync;
    type Service: Send + Sync;
    type Endpoint: Send + Sync;

    /// Whether this host can do BLE at all. No side effects.
    fn is_available(&self) -> bool;

    /// Selects the device matching `descriptor`.
    async fn request_device(
        &self,
        descriptor: &DeviceDescriptor,
    ) -> Result<Self::Device, TransportError>;

    /// Establishes a link to a selected device.
    async fn connect(&self, device: &Self::Device) -> Result<Self::Link, TransportError>;

    /// Registers for unsolicited-disconnect notification on a live link.
    async fn watch_disconnect(&self, link: &Self::Link)
        -> Result<DisconnectWatch, TransportError>;

    /// Resolves the configuration service on a live link.
    async fn discover_service(
        &self,
        link: &Self::Link,
        service: Uuid,
    ) -> Result<Self::Service, TransportError>;

    /// Resolves a writable characteristic within a discovered service.
    async fn writable_endpoint(
        &self,
        service: &Self::Service,
        characteristic: Uuid,
    ) -> Result<Self::Endpoint, TransportError>;

    /// Writes one value to an endpoint, acknowledged by the device.
    async fn write(&self, endpoint: &Self::Endpoint, payload: &[u8])
        -> Result<(), TransportError>;

    /// Tears the link down. Safe to call on a link that is already gone.
    async fn disconnect(&self, link: &Self::Link) -> Result<(), TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn guard_passes_result_through_while_link_holds() {
        let (_sender, mut watch) = DisconnectWatch::channel();
        let outcome = watch.guard(async { 7 }).await;
        assert_eq!(outcome, Some(7));
    }

    #[tokio::test]
    async fn guard_discards_results_once_link_is_lost() {
        let (sender, mut watch) = DisconnectWatch::channel();
        sender.send(()).unwrap();
        let outcome = watch.guard(async { 7 }).await;
        assert_eq!(outcome, None);
    }

    #[tokio::test]
    async fn guard_wins_against_an_operation_that_never_finishes() {
        let (sender, mut watch) = DisconnectWatch::channel();
        let pending = async {
            sender.send(()).unwrap();
            std::future::pending::<i32>().await
        };
        assert_eq!(watch.guard(pending).await, None);
    }

    #[tokio::test]
    async fn loss_stays_seen() {
        let (sender, mut watch) = DisconnectWatch::channel();
        sender.send(()).unwrap();
        assert!(watch.try_lost());
        assert!(watch.try_lost());
        assert_eq!(watch.guard(async { 1 }).await, None::<i32>);
    }

    #[tokio::test]
    async fn dropped_sender_is_not_a_loss() {
        let (sender, mut watch) = DisconnectWatch::channel();
        drop(sender);
        assert!(!watch.try_lost());
        assert_eq!(watch.guard(async { 3 }).await, Some(3));
    }
}
