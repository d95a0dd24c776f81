//! Data types for the Sighting Bot state core
//!
//! This module contains the records the bot keeps in memory and mirrors
//! to disk, plus the gateway event payloads the ingest layer decodes.

mod event;
mod records;
mod snapshot;

pub use event::{
    BanData, ConnectedData, GatewayEvent, GuildConfigData, GuildCountsData, HeartbeatData,
    ReactionData, TicketCloseData, TicketOpenData, UserActionData,
};
pub use records::{
    AdminRecord, BanRecord, BotStatus, GuildChannels, ReactionKey, ReactionRecord, RecordKind,
    RecordSet, StatusRecord, Ticket, TicketStatus,
};
pub use snapshot::StatsSnapshot;

/// Unix timestamp in seconds, UTC
pub fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}
