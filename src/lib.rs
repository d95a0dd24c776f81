//! Sighting Bot core
//!
//! The concurrent heart of a chat-platform bot: gateway events flow into
//! a single state aggregator, a background worker mirrors every change
//! to JSONL record files, and a small HTTP surface publishes consistent
//! statistics snapshots for the dashboard.
//!
//! ```text
//! gateway events ──> ingest ──> state aggregator ──> store (flush worker)
//!                                     │
//!                                     └──> api (/api/stats, /health, /)
//! ```

pub mod api;
pub mod config;
pub mod ingest;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod types;

pub use config::Config;
pub use state::{BotState, StateError};
pub use store::{FileStore, StoreConfig};

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
