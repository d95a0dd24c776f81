//! Monitoring HTTP surface
//!
//! Read-only endpoints over the aggregator: a JSON statistics snapshot,
//! the recent log tail, a readiness probe, and a small self-contained
//! dashboard page. Nothing here mutates state.

mod dashboard;
mod http;

use std::sync::Arc;

use crate::state::BotState;
use crate::telemetry::LogBuffer;

pub use http::create_router;

/// Shared context for the HTTP handlers
pub struct AppState {
    pub bot: Arc<BotState>,
    pub logs: LogBuffer,
}

impl AppState {
    pub fn new(bot: Arc<BotState>, logs: LogBuffer) -> Self {
        Self { bot, logs }
    }
}
