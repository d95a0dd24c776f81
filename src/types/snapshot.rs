//! Point-in-time statistics snapshot
//!
//! A snapshot is a value copied out of the aggregator under one read
//! lock; it never aliases live state. The dashboard polls it every 5s.

use serde::{Deserialize, Serialize};

/// Immutable statistics snapshot, serialized as the `/api/stats` body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub online: bool,
    pub latency_ms: f64,
    pub uptime_seconds: u64,
    pub guilds: u64,
    pub users: u64,
    pub total_reactions: u64,
    pub open_tickets: u64,
    pub authorized_users: u64,
}
