//! State aggregator - sole owner of the bot's mutable state
//!
//! All mutations go through [`BotState`] and are serialized by a single
//! write lock, so no interleaved partial update is ever visible. Reads
//! (snapshots, membership checks) take the read lock and run in parallel
//! with each other. Every mutation fires a dirty-record notification to
//! the background flush worker; a slow or failing disk never delays the
//! next mutation.

mod error;
mod mutate;
mod snapshot;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::types::{
    BanRecord, BotStatus, GuildChannels, ReactionKey, RecordKind, RecordSet, StatsSnapshot,
    StatusRecord, Ticket,
};

pub use error::{StateError, StateResult};

/// In-memory authoritative state, guarded by the aggregator's lock
#[derive(Debug)]
pub(crate) struct StateInner {
    pub status: BotStatus,
    pub reactions: HashMap<ReactionKey, u64>,
    pub tickets: BTreeMap<u64, Ticket>,
    pub next_ticket_id: u64,
    /// user id -> added_at
    pub admins: BTreeMap<String, i64>,
    pub bans: HashMap<String, BanRecord>,
    pub guilds: HashMap<String, GuildChannels>,
}

impl Default for StateInner {
    fn default() -> Self {
        Self {
            status: BotStatus::default(),
            reactions: HashMap::new(),
            tickets: BTreeMap::new(),
            next_ticket_id: 1,
            admins: BTreeMap::new(),
            bans: HashMap::new(),
            guilds: HashMap::new(),
        }
    }
}

/// The state aggregator
///
/// Constructed once at startup from the loaded record set, shared as an
/// `Arc` with the ingest consumer, the flush worker and the HTTP layer,
/// and torn down at shutdown.
pub struct BotState {
    pub(crate) inner: RwLock<StateInner>,
    dirty_tx: mpsc::UnboundedSender<RecordKind>,
    shutting_down: AtomicBool,
    ready: AtomicBool,
    started: Instant,
}

impl BotState {
    /// Create an empty aggregator plus the dirty-record receiver the
    /// flush worker consumes
    pub fn empty() -> (Self, mpsc::UnboundedReceiver<RecordKind>) {
        Self::from_records(RecordSet::default())
    }

    /// Create an aggregator pre-populated from loaded records
    pub fn from_records(records: RecordSet) -> (Self, mpsc::UnboundedReceiver<RecordKind>) {
        let (dirty_tx, dirty_rx) = mpsc::unbounded_channel();

        let next_ticket_id = records.tickets.keys().max().map_or(1, |max| max + 1);
        let inner = StateInner {
            status: BotStatus {
                connected: false,
                latency_ms: 0.0,
                guild_count: records.status.guild_count,
                user_count: records.status.user_count,
            },
            reactions: records.reactions,
            tickets: records.tickets,
            next_ticket_id,
            admins: records.admins,
            bans: records.bans,
            guilds: records.guilds,
        };

        let state = Self {
            inner: RwLock::new(inner),
            dirty_tx,
            shutting_down: AtomicBool::new(false),
            ready: AtomicBool::new(false),
            started: Instant::now(),
        };
        (state, dirty_rx)
    }

    /// Mark the initial load as complete; `/health` reports ready from here on
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Reject mutations from here on; reads keep working
    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Seconds since the aggregator was constructed
    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub(crate) fn ensure_accepting(&self) -> StateResult<()> {
        if self.is_shutting_down() {
            Err(StateError::ShuttingDown)
        } else {
            Ok(())
        }
    }

    /// Notify the flush worker. Best effort: a missing worker (tests,
    /// teardown) just drops the notification.
    pub(crate) fn mark_dirty(&self, kind: RecordKind) {
        let _ = self.dirty_tx.send(kind);
    }
}

// Connection status and counters (from mutate.rs)
impl BotState {
    /// Record a connect/disconnect/heartbeat observation from the gateway
    pub fn record_connection(&self, connected: bool, latency_ms: f64) -> StateResult<()> {
        mutate::record_connection(self, connected, latency_ms)
    }

    /// Record the guild/member totals reported by the gateway
    pub fn record_guild_counts(&self, guild_count: u64, user_count: u64) -> StateResult<()> {
        mutate::record_guild_counts(self, guild_count, user_count)
    }

    /// Bump one reaction counter, creating it at zero first if absent.
    /// Returns the new count.
    pub fn increment_reaction(&self, key: ReactionKey) -> StateResult<u64> {
        mutate::increment_reaction(self, key)
    }
}

// Ticket lifecycle (from mutate.rs)
impl BotState {
    /// Open a ticket and return its id. One open ticket per opener per guild.
    pub fn open_ticket(&self, guild: &str, opener: &str) -> StateResult<u64> {
        mutate::open_ticket(self, guild, opener)
    }

    /// Close an open ticket. Closing is terminal.
    pub fn close_ticket(&self, ticket_id: u64) -> StateResult<()> {
        mutate::close_ticket(self, ticket_id)
    }

    /// Drop closed tickets older than `max_age_secs`; returns how many went
    pub fn prune_closed_tickets(&self, max_age_secs: i64) -> StateResult<usize> {
        mutate::prune_closed_tickets(self, max_age_secs)
    }

    pub fn ticket(&self, ticket_id: u64) -> Option<Ticket> {
        self.inner.read().tickets.get(&ticket_id).cloned()
    }
}

// Authorization and bans (from mutate.rs)
impl BotState {
    /// Grant elevated permissions; returns false if already granted
    pub fn authorize_user(&self, user: &str) -> StateResult<bool> {
        mutate::authorize_user(self, user)
    }

    /// Revoke elevated permissions; returns false if not granted
    pub fn revoke_user(&self, user: &str) -> StateResult<bool> {
        mutate::revoke_user(self, user)
    }

    /// Ban a user from the bot; returns false if already banned
    pub fn ban_user(
        &self,
        user: &str,
        reason: Option<String>,
        banned_by: Option<String>,
    ) -> StateResult<bool> {
        mutate::ban_user(self, user, reason, banned_by)
    }

    /// Lift a ban; returns false if the user was not banned
    pub fn unban_user(&self, user: &str) -> StateResult<bool> {
        mutate::unban_user(self, user)
    }

    pub fn is_admin(&self, user: &str) -> bool {
        self.inner.read().admins.contains_key(user)
    }

    pub fn has_admins(&self) -> bool {
        !self.inner.read().admins.is_empty()
    }

    pub fn is_banned(&self, user: &str) -> bool {
        self.inner.read().bans.contains_key(user)
    }
}

// Guild channel configuration (from mutate.rs)
impl BotState {
    /// Merge non-None channel assignments into the guild's config
    pub fn set_guild_channels(&self, update: GuildChannels) -> StateResult<()> {
        mutate::set_guild_channels(self, update)
    }

    pub fn guild_channels(&self, guild: &str) -> Option<GuildChannels> {
        self.inner.read().guilds.get(guild).cloned()
    }
}

// Snapshot publication and flush-worker views (from snapshot.rs)
impl BotState {
    /// Copy out a consistent statistics snapshot; never fails
    pub fn snapshot(&self) -> StatsSnapshot {
        snapshot::take(self)
    }

    /// Durable status fields as persisted to `status.json`
    pub fn status_record(&self) -> StatusRecord {
        snapshot::status_record(self)
    }

    pub fn reactions_view(&self) -> HashMap<ReactionKey, u64> {
        self.inner.read().reactions.clone()
    }

    pub fn tickets_view(&self) -> Vec<Ticket> {
        self.inner.read().tickets.values().cloned().collect()
    }

    pub fn admins_view(&self) -> BTreeMap<String, i64> {
        self.inner.read().admins.clone()
    }

    pub fn bans_view(&self) -> Vec<BanRecord> {
        self.inner.read().bans.values().cloned().collect()
    }

    pub fn guilds_view(&self) -> Vec<GuildChannels> {
        self.inner.read().guilds.values().cloned().collect()
    }

    /// Which record kinds currently hold any data; the flush worker's
    /// final shutdown pass rewrites these
    pub fn populated_kinds(&self) -> HashSet<RecordKind> {
        let inner = self.inner.read();
        let mut kinds = HashSet::new();
        kinds.insert(RecordKind::Status);
        if !inner.reactions.is_empty() {
            kinds.insert(RecordKind::Reactions);
        }
        if !inner.tickets.is_empty() {
            kinds.insert(RecordKind::Tickets);
        }
        if !inner.admins.is_empty() {
            kinds.insert(RecordKind::Admins);
        }
        if !inner.bans.is_empty() {
            kinds.insert(RecordKind::Bans);
        }
        if !inner.guilds.is_empty() {
            kinds.insert(RecordKind::Guilds);
        }
        kinds
    }
}

/// Spawn a periodic task that drops closed tickets older than
/// `max_age_secs`. The first pass runs immediately; the task exits on
/// its own once shutdown begins.
pub fn spawn_ticket_pruner(
    state: Arc<BotState>,
    period: Duration,
    max_age_secs: i64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            match state.prune_closed_tickets(max_age_secs) {
                Ok(0) => {}
                Ok(removed) => info!(removed, "pruned old closed tickets"),
                Err(_) => break,
            }
        }
        debug!("ticket pruner stopped");
    })
}
