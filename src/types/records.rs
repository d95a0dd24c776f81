//! Persistent records owned by the state aggregator
//!
//! Each record type maps to one file in the data directory. In-memory
//! collections are keyed maps; on disk every record is one JSON line.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Live connection status of the bot, one instance for the process lifetime.
///
/// `latency_ms` is ephemeral and never persisted; guild and user counts are
/// mirrored to `status.json` on change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BotStatus {
    pub connected: bool,
    pub latency_ms: f64,
    pub guild_count: u64,
    pub user_count: u64,
}

/// Durable subset of [`BotStatus`], written to `status.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub guild_count: u64,
    pub user_count: u64,
    /// Uptime at the moment of the last flush, informational only
    #[serde(default)]
    pub uptime_seconds: u64,
}

/// Key of one reaction counter: which emoji on which message in which guild
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReactionKey {
    pub guild: String,
    pub emoji: String,
    pub target: String,
}

impl ReactionKey {
    pub fn new(
        guild: impl Into<String>,
        emoji: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            guild: guild.into(),
            emoji: emoji.into(),
            target: target.into(),
        }
    }
}

/// One line of `reactions.jsonl`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionRecord {
    pub guild: String,
    pub emoji: String,
    pub target: String,
    pub count: u64,
}

impl ReactionRecord {
    pub fn from_entry(key: &ReactionKey, count: u64) -> Self {
        Self {
            guild: key.guild.clone(),
            emoji: key.emoji.clone(),
            target: key.target.clone(),
            count,
        }
    }

    pub fn into_entry(self) -> (ReactionKey, u64) {
        (
            ReactionKey {
                guild: self.guild,
                emoji: self.emoji,
                target: self.target,
            },
            self.count,
        )
    }
}

/// Lifecycle of a support ticket: open, then closed, never reopened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    Closed,
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketStatus::Open => write!(f, "open"),
            TicketStatus::Closed => write!(f, "closed"),
        }
    }
}

/// A support ticket. Ids are monotonic and allocated by the aggregator.
///
/// Invariant: `closed_at` is set exactly when `status` is `Closed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: u64,
    pub guild: String,
    pub opener: String,
    pub status: TicketStatus,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<i64>,
}

impl Ticket {
    pub fn open(id: u64, guild: impl Into<String>, opener: impl Into<String>) -> Self {
        Self {
            id,
            guild: guild.into(),
            opener: opener.into(),
            status: TicketStatus::Open,
            created_at: super::now_ts(),
            closed_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == TicketStatus::Open
    }
}

/// One line of `admins.jsonl`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminRecord {
    pub user: String,
    pub added_at: i64,
}

/// One line of `bans.jsonl`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BanRecord {
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banned_by: Option<String>,
    pub banned_at: i64,
}

/// Per-guild channel assignments, one line of `guilds.jsonl`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuildChannels {
    pub guild: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reaction_channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_channel: Option<String>,
}

/// Which record file a mutation dirtied; sent to the flush worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecordKind {
    Status,
    Reactions,
    Tickets,
    Admins,
    Bans,
    Guilds,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RecordKind::Status => "status",
            RecordKind::Reactions => "reactions",
            RecordKind::Tickets => "tickets",
            RecordKind::Admins => "admins",
            RecordKind::Bans => "bans",
            RecordKind::Guilds => "guilds",
        };
        write!(f, "{}", name)
    }
}

/// Everything the file store loads at startup
#[derive(Debug, Default, Clone)]
pub struct RecordSet {
    pub status: StatusRecord,
    pub reactions: HashMap<ReactionKey, u64>,
    pub tickets: BTreeMap<u64, Ticket>,
    /// user id -> added_at
    pub admins: BTreeMap<String, i64>,
    pub bans: HashMap<String, BanRecord>,
    pub guilds: HashMap<String, GuildChannels>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reaction_record_round_trip() {
        let key = ReactionKey::new("g1", "🎉", "msg1");
        let record = ReactionRecord::from_entry(&key, 3);
        let (back, count) = record.into_entry();
        assert_eq!(back, key);
        assert_eq!(count, 3);
    }

    #[test]
    fn test_ticket_opens_open() {
        let ticket = Ticket::open(1, "g1", "u1");
        assert!(ticket.is_open());
        assert!(ticket.closed_at.is_none());
        assert_eq!(ticket.status.to_string(), "open");
    }

    #[test]
    fn test_closed_at_skipped_while_open() {
        let ticket = Ticket::open(7, "g1", "u1");
        let json = serde_json::to_string(&ticket).unwrap();
        assert!(!json.contains("closed_at"));
    }
}
