//! Gateway event ingestion
//!
//! Events arrive on a bounded queue and are applied by a single consumer
//! task, so the aggregator sees them in arrival order. A malformed
//! payload is tallied and logged but never stops the consumer; an
//! unknown kind is ignored so newer gateway clients can emit events this
//! build does not know about.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::state::{BotState, StateError};
use crate::types::{
    BanData, ConnectedData, GatewayEvent, GuildChannels, GuildConfigData, GuildCountsData,
    HeartbeatData, ReactionData, ReactionKey, TicketCloseData, TicketOpenData, UserActionData,
};

/// Producer handle to the bounded event queue
#[derive(Clone)]
pub struct IngestQueue {
    tx: mpsc::Sender<GatewayEvent>,
}

impl IngestQueue {
    /// Enqueue an event, waiting for room if the consumer is behind.
    /// Returns `false` once the consumer is gone.
    pub async fn push(&self, event: GatewayEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }

    /// Enqueue without waiting; `false` means the queue is full or closed
    pub fn try_push(&self, event: GatewayEvent) -> bool {
        self.tx.try_send(event).is_ok()
    }
}

/// Applies gateway events to the aggregator
pub struct EventIngestor {
    state: Arc<BotState>,
    malformed: AtomicU64,
}

impl EventIngestor {
    pub fn new(state: Arc<BotState>) -> Self {
        Self {
            state,
            malformed: AtomicU64::new(0),
        }
    }

    /// How many events were dropped for undecodable payloads
    pub fn malformed_count(&self) -> u64 {
        self.malformed.load(Ordering::Relaxed)
    }

    /// Apply one event. Decode failures and rejected operations are
    /// handled here; nothing propagates to the consumer loop.
    pub fn apply(&self, event: GatewayEvent) {
        match event.kind.as_str() {
            "connected" => {
                let Some(data) = self.decode::<ConnectedData>(&event) else {
                    return;
                };
                self.record(self.state.record_connection(true, data.latency_ms), &event);
                if data.guild_count.is_some() || data.user_count.is_some() {
                    // Counts arrive independently; a missing one keeps its
                    // current value
                    let current = self.state.status_record();
                    let guilds = data.guild_count.unwrap_or(current.guild_count);
                    let users = data.user_count.unwrap_or(current.user_count);
                    self.record(self.state.record_guild_counts(guilds, users), &event);
                }
                info!(latency_ms = data.latency_ms, "gateway connected");
            }
            "disconnected" => {
                self.record(self.state.record_connection(false, 0.0), &event);
                info!("gateway disconnected");
            }
            "heartbeat" => {
                let Some(data) = self.decode::<HeartbeatData>(&event) else {
                    return;
                };
                self.record(self.state.record_connection(true, data.latency_ms), &event);
            }
            "guild_counts" => {
                let Some(data) = self.decode::<GuildCountsData>(&event) else {
                    return;
                };
                self.record(
                    self.state
                        .record_guild_counts(data.guild_count, data.user_count),
                    &event,
                );
            }
            "reaction_added" => {
                let Some(data) = self.decode::<ReactionData>(&event) else {
                    return;
                };
                if self.state.is_banned(&data.user) {
                    debug!(user = %data.user, "dropping reaction from banned user");
                    return;
                }
                let key = ReactionKey::new(&data.guild, &data.emoji, &data.target);
                self.record(self.state.increment_reaction(key).map(|_| ()), &event);
            }
            "ticket_opened" => {
                let Some(data) = self.decode::<TicketOpenData>(&event) else {
                    return;
                };
                if self.state.is_banned(&data.opener) {
                    debug!(user = %data.opener, "dropping ticket from banned user");
                    return;
                }
                match self.state.open_ticket(&data.guild, &data.opener) {
                    Ok(id) => info!(ticket = id, guild = %data.guild, "ticket opened"),
                    Err(e) => self.reject(&event, e),
                }
            }
            "ticket_closed" => {
                let Some(data) = self.decode::<TicketCloseData>(&event) else {
                    return;
                };
                self.record(self.state.close_ticket(data.ticket_id), &event);
            }
            "user_authorized" => {
                let Some(data) = self.decode::<UserActionData>(&event) else {
                    return;
                };
                if !self.issuer_allowed(data.by.as_deref()) {
                    return;
                }
                self.record(self.state.authorize_user(&data.user).map(|_| ()), &event);
            }
            "user_revoked" => {
                let Some(data) = self.decode::<UserActionData>(&event) else {
                    return;
                };
                if !self.issuer_allowed(data.by.as_deref()) {
                    return;
                }
                self.record(self.state.revoke_user(&data.user).map(|_| ()), &event);
            }
            "user_banned" => {
                let Some(data) = self.decode::<BanData>(&event) else {
                    return;
                };
                if !self.issuer_allowed(data.by.as_deref()) {
                    return;
                }
                self.record(
                    self.state
                        .ban_user(&data.user, data.reason, data.by)
                        .map(|_| ()),
                    &event,
                );
            }
            "user_unbanned" => {
                let Some(data) = self.decode::<UserActionData>(&event) else {
                    return;
                };
                if !self.issuer_allowed(data.by.as_deref()) {
                    return;
                }
                self.record(self.state.unban_user(&data.user).map(|_| ()), &event);
            }
            "guild_config" => {
                let Some(data) = self.decode::<GuildConfigData>(&event) else {
                    return;
                };
                if !self.issuer_allowed(data.by.as_deref()) {
                    return;
                }
                let update = GuildChannels {
                    guild: data.guild,
                    reaction_channel: data.reaction_channel,
                    log_channel: data.log_channel,
                    support_channel: data.support_channel,
                };
                self.record(self.state.set_guild_channels(update), &event);
            }
            other => {
                debug!(kind = other, "ignoring unknown event kind");
            }
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(&self, event: &GatewayEvent) -> Option<T> {
        match serde_json::from_value(event.data.clone()) {
            Ok(data) => Some(data),
            Err(e) => {
                self.malformed.fetch_add(1, Ordering::Relaxed);
                warn!(kind = %event.kind, error = %e, "dropping malformed event payload");
                None
            }
        }
    }

    /// Admin commands require the issuer to already be an admin. The one
    /// exception: with no admins recorded yet, anyone may bootstrap.
    fn issuer_allowed(&self, by: Option<&str>) -> bool {
        if !self.state.has_admins() {
            return true;
        }
        match by {
            Some(user) if self.state.is_admin(user) => true,
            Some(user) => {
                warn!(user = %user, "rejecting admin command from non-admin");
                false
            }
            None => {
                warn!("rejecting admin command without an issuer");
                false
            }
        }
    }

    fn record(&self, result: Result<(), StateError>, event: &GatewayEvent) {
        if let Err(e) = result {
            self.reject(event, e);
        }
    }

    fn reject(&self, event: &GatewayEvent, error: StateError) {
        debug!(kind = %event.kind, error = %error, "event rejected by the aggregator");
    }
}

/// Spawn the single consumer task and hand back the producer side.
/// The task exits once every producer handle is dropped.
pub fn spawn_consumer(state: Arc<BotState>, capacity: usize) -> (IngestQueue, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel(capacity);
    let ingestor = EventIngestor::new(state);

    let handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            ingestor.apply(event);
        }
        debug!(
            malformed = ingestor.malformed_count(),
            "event consumer stopped"
        );
    });

    (IngestQueue { tx }, handle)
}
