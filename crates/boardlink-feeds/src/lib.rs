//! # boardlink-feeds - Selection Inputs
//!
//! The external collaborators of the selection core, reduced to the data
//! they exchange with it.
//!
//! Depends on [`boardlink_core`] for domain types and error handling.
//!
//! ## Public API
//!
//! ### Reactive Feeds
//! - [`FeedHub`] - `watch` channels for detected ports, IoT presence,
//!   sketch metadata and busy ports
//! - [`FeedReceivers`] - Subscription to all four
//!
//! ### Payload Parsing
//! - [`parse_agent_ports()`] - Local agent port listing to [`PortSnapshot`]
//! - [`parse_iot_devices()`] - IoT cloud listing to presence groups
//!
//! ### Board Catalog
//! - [`BoardCatalog`] - Lookup of board menus by base fqbn
//! - [`StaticBoardCatalog`] - JSON-backed in-memory catalog

pub mod agent;
pub mod catalog;
pub mod feeds;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use agent::{
    cloud_device_groups, parse_agent_ports, parse_iot_devices, AgentBoard, AgentPort, CloudDevice,
    PortSnapshot,
};
#[cfg(any(test, feature = "test-helpers"))]
pub use catalog::MockBoardCatalog;
pub use catalog::{BoardCatalog, BoardDefinition, BoardMenu, BoardMenuVariant, StaticBoardCatalog};
pub use feeds::{BusyValue, FeedHub, FeedReceivers, IotValue, MetadataValue, PortsValue};
