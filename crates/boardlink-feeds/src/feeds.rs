//! Reactive input feeds
//!
//! Each input of the selection core is a `watch` channel: publishers
//! replace the whole value, subscribers always observe the latest one.
//! A publish with an unchanged value still notifies subscribers, which is
//! how the agent's re-emissions reach the reducer.

use std::collections::BTreeSet;
use std::sync::Arc;

use boardlink_core::{DetectedDevice, IotDevicesGroups, SketchMetadata};
use tokio::sync::watch;

use crate::agent::PortSnapshot;

pub type PortsValue = Arc<Vec<DetectedDevice>>;
pub type IotValue = Arc<IotDevicesGroups>;
/// `None` while the sketch is still loading
pub type MetadataValue = Option<SketchMetadata>;
pub type BusyValue = Arc<BTreeSet<String>>;

/// Publishing side of all four inputs
pub struct FeedHub {
    ports: watch::Sender<PortsValue>,
    iot: watch::Sender<IotValue>,
    metadata: watch::Sender<MetadataValue>,
    busy: watch::Sender<BusyValue>,
}

/// Subscription to all four inputs
#[derive(Debug, Clone)]
pub struct FeedReceivers {
    pub ports: watch::Receiver<PortsValue>,
    pub iot: watch::Receiver<IotValue>,
    pub metadata: watch::Receiver<MetadataValue>,
    pub busy: watch::Receiver<BusyValue>,
}

impl FeedHub {
    /// Empty feeds with the sketch metadata still loading
    pub fn new() -> Self {
        let (ports, _) = watch::channel(Arc::new(Vec::new()));
        let (iot, _) = watch::channel(Arc::new(IotDevicesGroups::default()));
        let (metadata, _) = watch::channel(None);
        let (busy, _) = watch::channel(Arc::new(BTreeSet::new()));

        Self {
            ports,
            iot,
            metadata,
            busy,
        }
    }

    pub fn publish_ports(&self, devices: Vec<DetectedDevice>) {
        self.ports.send_replace(Arc::new(devices));
    }

    /// Publish a port listing together with the busy ports derived from it
    pub fn publish_port_snapshot(&self, snapshot: PortSnapshot) {
        self.publish_ports(snapshot.devices);
        self.publish_busy(snapshot.busy);
    }

    pub fn publish_iot(&self, groups: IotDevicesGroups) {
        self.iot.send_replace(Arc::new(groups));
    }

    pub fn publish_metadata(&self, metadata: MetadataValue) {
        self.metadata.send_replace(metadata);
    }

    pub fn publish_busy(&self, busy: BTreeSet<String>) {
        self.busy.send_replace(Arc::new(busy));
    }

    /// Re-send the current port list unchanged
    pub fn reemit_ports(&self) {
        self.ports.send_modify(|_| {});
    }

    pub fn ports(&self) -> PortsValue {
        self.ports.borrow().clone()
    }

    pub fn iot(&self) -> IotValue {
        self.iot.borrow().clone()
    }

    pub fn metadata(&self) -> MetadataValue {
        self.metadata.borrow().clone()
    }

    pub fn subscribe(&self) -> FeedReceivers {
        FeedReceivers {
            ports: self.ports.subscribe(),
            iot: self.iot.subscribe(),
            metadata: self.metadata.subscribe(),
            busy: self.busy.subscribe(),
        }
    }
}

impl Default for FeedHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mock_uno, mock_uno_two};

    #[test]
    fn test_new_hub_starts_loading_and_empty() {
        let hub = FeedHub::new();
        assert!(hub.ports().is_empty());
        assert!(hub.iot().is_empty());
        assert!(hub.metadata().is_none());
    }

    #[test]
    fn test_publish_without_subscribers_keeps_value() {
        let hub = FeedHub::new();
        hub.publish_ports(vec![mock_uno()]);
        assert_eq!(hub.ports().len(), 1);
    }

    #[tokio::test]
    async fn test_subscriber_sees_latest_value() {
        let hub = FeedHub::new();
        let mut rx = hub.subscribe();

        hub.publish_ports(vec![mock_uno()]);
        hub.publish_ports(vec![mock_uno(), mock_uno_two()]);

        rx.ports.changed().await.unwrap();
        assert_eq!(rx.ports.borrow_and_update().len(), 2);
    }

    #[tokio::test]
    async fn test_reemit_notifies_subscribers() {
        let hub = FeedHub::new();
        hub.publish_ports(vec![mock_uno()]);
        let mut rx = hub.subscribe();

        hub.reemit_ports();

        rx.ports.changed().await.unwrap();
        assert_eq!(rx.ports.borrow_and_update()[0], mock_uno());
    }

    #[tokio::test]
    async fn test_port_snapshot_publishes_busy() {
        let hub = FeedHub::new();
        let mut rx = hub.subscribe();

        let uno = mock_uno();
        let mut busy = BTreeSet::new();
        busy.insert(uno.port_board_id.clone());
        hub.publish_port_snapshot(PortSnapshot {
            devices: vec![uno],
            busy,
        });

        rx.busy.changed().await.unwrap();
        assert_eq!(rx.busy.borrow_and_update().len(), 1);
    }

    #[test]
    fn test_metadata_publish() {
        let hub = FeedHub::new();
        hub.publish_metadata(Some(SketchMetadata::default()));
        assert_eq!(hub.metadata(), Some(SketchMetadata::default()));
    }
}
