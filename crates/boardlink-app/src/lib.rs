//! boardlink-app - Board/port selection state and orchestration
//!
//! This crate implements the selection reducer in the TEA (The Elm
//! Architecture) pattern, the Engine that drives it from reactive feeds,
//! configuration loading, and the feed file watcher.

pub mod actions;
pub mod alt_port;
pub mod bridge;
pub mod config;
pub mod engine;
pub mod engine_event;
pub mod flavour;
pub mod handler;
pub mod matching;
pub mod message;
pub mod process;
pub mod prompt_gate;
pub mod state;
pub mod watcher;

// Re-export primary types
pub use engine::Engine;
pub use engine_event::EngineEvent;
pub use handler::{UpdateAction, UpdateResult};
pub use message::Message;
pub use state::{AppState, BypassId, RouteContext, SelectionOrigin, UploadPhase};
pub use watcher::{FeedWatcher, WatcherConfig};
