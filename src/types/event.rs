//! Gateway event payloads
//!
//! The chat-gateway client hands the ingest layer loosely typed events:
//! a kind string plus a JSON payload. Known kinds decode into the typed
//! payloads below; unknown kinds are ignored by the dispatcher.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A raw notification from the chat gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

impl GatewayEvent {
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }
}

/// Payload of a `connected` event
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedData {
    #[serde(default)]
    pub latency_ms: f64,
    #[serde(default)]
    pub guild_count: Option<u64>,
    #[serde(default)]
    pub user_count: Option<u64>,
}

/// Payload of a `heartbeat` event
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatData {
    pub latency_ms: f64,
}

/// Payload of a `guild_counts` event
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildCountsData {
    pub guild_count: u64,
    pub user_count: u64,
}

/// Payload of a `reaction_added` event
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionData {
    pub guild: String,
    pub emoji: String,
    pub target: String,
    pub user: String,
}

/// Payload of a `ticket_opened` event
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketOpenData {
    pub guild: String,
    pub opener: String,
}

/// Payload of a `ticket_closed` event
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketCloseData {
    pub ticket_id: u64,
}

/// Payload of the admin `user_authorized` / `user_revoked` / `user_unbanned`
/// commands. `by` is the issuing admin, when the gateway knows it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserActionData {
    pub user: String,
    #[serde(default)]
    pub by: Option<String>,
}

/// Payload of the admin `user_banned` command
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BanData {
    pub user: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub by: Option<String>,
}

/// Payload of the admin `guild_config` command
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildConfigData {
    pub guild: String,
    #[serde(default)]
    pub reaction_channel: Option<String>,
    #[serde(default)]
    pub log_channel: Option<String>,
    #[serde(default)]
    pub support_channel: Option<String>,
    #[serde(default)]
    pub by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_without_data_defaults_to_null() {
        let event: GatewayEvent = serde_json::from_str(r#"{"kind":"disconnected"}"#).unwrap();
        assert_eq!(event.kind, "disconnected");
        assert!(event.data.is_null());
    }

    #[test]
    fn test_reaction_payload_decodes_camel_case() {
        let data: ReactionData = serde_json::from_value(json!({
            "guild": "g1",
            "emoji": "🛸",
            "target": "msg42",
            "user": "u9"
        }))
        .unwrap();
        assert_eq!(data.emoji, "🛸");
    }

    #[test]
    fn test_ticket_close_requires_id() {
        let result = serde_json::from_value::<TicketCloseData>(json!({}));
        assert!(result.is_err());
    }
}
