//! Snapshot publication
//!
//! A snapshot is copied out under a single read lock, so every field
//! reflects the same logical instant. Readers never block writers beyond
//! that one lock acquisition and never alias live state.

use crate::types::{StatsSnapshot, StatusRecord};

use super::BotState;

pub fn take(state: &BotState) -> StatsSnapshot {
    let inner = state.inner.read();
    StatsSnapshot {
        online: inner.status.connected,
        latency_ms: inner.status.latency_ms,
        uptime_seconds: state.uptime_seconds(),
        guilds: inner.status.guild_count,
        users: inner.status.user_count,
        total_reactions: inner.reactions.values().sum(),
        open_tickets: inner.tickets.values().filter(|t| t.is_open()).count() as u64,
        authorized_users: inner.admins.len() as u64,
    }
}

pub fn status_record(state: &BotState) -> StatusRecord {
    let inner = state.inner.read();
    StatusRecord {
        guild_count: inner.status.guild_count,
        user_count: inner.status.user_count,
        uptime_seconds: state.uptime_seconds(),
    }
}

#[cfg(test)]
mod tests {
    use crate::state::BotState;
    use crate::types::ReactionKey;

    #[test]
    fn test_fresh_state_snapshots_to_zero_defaults() {
        let (state, _rx) = BotState::empty();
        let snapshot = state.snapshot();
        assert!(!snapshot.online);
        assert_eq!(snapshot.guilds, 0);
        assert_eq!(snapshot.total_reactions, 0);
        assert_eq!(snapshot.open_tickets, 0);
        assert_eq!(snapshot.authorized_users, 0);
    }

    #[test]
    fn test_snapshot_aggregates_counters() {
        let (state, _rx) = BotState::empty();
        state.record_connection(true, 25.0).unwrap();
        state.record_guild_counts(2, 150).unwrap();
        state
            .increment_reaction(ReactionKey::new("g1", "🛸", "m1"))
            .unwrap();
        state
            .increment_reaction(ReactionKey::new("g2", "🎉", "m2"))
            .unwrap();
        state.open_ticket("g1", "u1").unwrap();
        state.authorize_user("admin").unwrap();

        let snapshot = state.snapshot();
        assert!(snapshot.online);
        assert_eq!(snapshot.latency_ms, 25.0);
        assert_eq!(snapshot.guilds, 2);
        assert_eq!(snapshot.users, 150);
        assert_eq!(snapshot.total_reactions, 2);
        assert_eq!(snapshot.open_tickets, 1);
        assert_eq!(snapshot.authorized_users, 1);
    }

    #[test]
    fn test_closed_tickets_leave_the_open_count() {
        let (state, _rx) = BotState::empty();
        let id = state.open_ticket("g1", "u1").unwrap();
        assert_eq!(state.snapshot().open_tickets, 1);

        state.close_ticket(id).unwrap();
        assert_eq!(state.snapshot().open_tickets, 0);
    }
}
