//! Feed bridges: forward every `watch` feed into the message channel
//!
//! Each bridge first forwards the current value, then every notification
//! until the feed closes or shutdown is signalled. Re-emissions of an
//! unchanged value are forwarded too.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use boardlink_core::prelude::*;
use boardlink_feeds::FeedReceivers;

use crate::message::Message;

/// Spawn one bridge task per feed
pub fn spawn_feed_bridges(
    feeds: FeedReceivers,
    msg_tx: &mpsc::Sender<Message>,
    shutdown_rx: &watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    vec![
        spawn_bridge("ports", feeds.ports, msg_tx, shutdown_rx, |ports| {
            Message::DetectedDevicesUpdated(ports.as_ref().clone())
        }),
        spawn_bridge("iot", feeds.iot, msg_tx, shutdown_rx, |groups| {
            Message::IotDevicesUpdated(groups.as_ref().clone())
        }),
        spawn_bridge(
            "metadata",
            feeds.metadata,
            msg_tx,
            shutdown_rx,
            Message::SketchMetadataUpdated,
        ),
        spawn_bridge("busy", feeds.busy, msg_tx, shutdown_rx, |busy| {
            Message::BusyPortsUpdated(busy.as_ref().clone())
        }),
    ]
}

fn spawn_bridge<T, F>(
    name: &'static str,
    mut feed: watch::Receiver<T>,
    msg_tx: &mpsc::Sender<Message>,
    shutdown_rx: &watch::Receiver<bool>,
    to_message: F,
) -> JoinHandle<()>
where
    T: Clone + Send + Sync + 'static,
    F: Fn(T) -> Message + Send + 'static,
{
    let msg_tx = msg_tx.clone();
    let mut shutdown_rx = shutdown_rx.clone();

    tokio::spawn(async move {
        let initial = feed.borrow_and_update().clone();
        if msg_tx.send(to_message(initial)).await.is_err() {
            return;
        }

        loop {
            tokio::select! {
                changed = feed.changed() => {
                    if changed.is_err() {
                        debug!("Feed {} closed", name);
                        break;
                    }
                    let value = feed.borrow_and_update().clone();
                    if msg_tx.send(to_message(value)).await.is_err() {
                        debug!("Message channel closed, stopping {} bridge", name);
                        break;
                    }
                }
                _ = shutdown_rx.changed() => {
                    debug!("Feed bridge {} stopping", name);
                    break;
                }
            }
        }
    })
}
