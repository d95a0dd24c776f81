//! Mutation operations for the aggregator
//!
//! Each operation takes the write lock once, applies the whole change,
//! drops the lock, then notifies the flush worker. The notification is
//! fire and forget so disk latency never reaches the caller.

use crate::types::{now_ts, BanRecord, GuildChannels, ReactionKey, RecordKind, Ticket, TicketStatus};

use super::{BotState, StateError, StateResult};

pub fn record_connection(state: &BotState, connected: bool, latency_ms: f64) -> StateResult<()> {
    state.ensure_accepting()?;
    {
        let mut inner = state.inner.write();
        inner.status.connected = connected;
        inner.status.latency_ms = if connected { latency_ms } else { 0.0 };
    }
    // Latency is ephemeral, but the durable counters ride along with the
    // status record, so the record is flushed either way.
    state.mark_dirty(RecordKind::Status);
    Ok(())
}

pub fn record_guild_counts(state: &BotState, guild_count: u64, user_count: u64) -> StateResult<()> {
    state.ensure_accepting()?;
    {
        let mut inner = state.inner.write();
        inner.status.guild_count = guild_count;
        inner.status.user_count = user_count;
    }
    state.mark_dirty(RecordKind::Status);
    Ok(())
}

pub fn increment_reaction(state: &BotState, key: ReactionKey) -> StateResult<u64> {
    state.ensure_accepting()?;
    if key.guild.is_empty() || key.emoji.is_empty() {
        return Err(StateError::InvalidKey);
    }

    let count = {
        let mut inner = state.inner.write();
        let counter = inner.reactions.entry(key).or_insert(0);
        *counter += 1;
        *counter
    };
    state.mark_dirty(RecordKind::Reactions);
    Ok(count)
}

pub fn open_ticket(state: &BotState, guild: &str, opener: &str) -> StateResult<u64> {
    state.ensure_accepting()?;

    let id = {
        let mut inner = state.inner.write();
        let duplicate = inner
            .tickets
            .values()
            .any(|t| t.is_open() && t.guild == guild && t.opener == opener);
        if duplicate {
            return Err(StateError::DuplicateOpenTicket {
                guild: guild.to_string(),
                opener: opener.to_string(),
            });
        }

        let id = inner.next_ticket_id;
        inner.next_ticket_id += 1;
        inner.tickets.insert(id, Ticket::open(id, guild, opener));
        id
    };
    state.mark_dirty(RecordKind::Tickets);
    Ok(id)
}

pub fn close_ticket(state: &BotState, ticket_id: u64) -> StateResult<()> {
    state.ensure_accepting()?;
    {
        let mut inner = state.inner.write();
        let ticket = inner
            .tickets
            .get_mut(&ticket_id)
            .ok_or(StateError::TicketNotFound(ticket_id))?;
        if !ticket.is_open() {
            return Err(StateError::TicketAlreadyClosed(ticket_id));
        }
        ticket.status = TicketStatus::Closed;
        ticket.closed_at = Some(now_ts());
    }
    state.mark_dirty(RecordKind::Tickets);
    Ok(())
}

pub fn prune_closed_tickets(state: &BotState, max_age_secs: i64) -> StateResult<usize> {
    state.ensure_accepting()?;
    let cutoff = now_ts() - max_age_secs;

    let removed = {
        let mut inner = state.inner.write();
        let before = inner.tickets.len();
        inner
            .tickets
            .retain(|_, t| t.is_open() || t.closed_at.map_or(true, |closed| closed >= cutoff));
        before - inner.tickets.len()
    };
    if removed > 0 {
        state.mark_dirty(RecordKind::Tickets);
    }
    Ok(removed)
}

pub fn authorize_user(state: &BotState, user: &str) -> StateResult<bool> {
    state.ensure_accepting()?;
    let added = {
        let mut inner = state.inner.write();
        inner
            .admins
            .insert(user.to_string(), now_ts())
            .is_none()
    };
    if added {
        state.mark_dirty(RecordKind::Admins);
    }
    Ok(added)
}

pub fn revoke_user(state: &BotState, user: &str) -> StateResult<bool> {
    state.ensure_accepting()?;
    let removed = state.inner.write().admins.remove(user).is_some();
    if removed {
        state.mark_dirty(RecordKind::Admins);
    }
    Ok(removed)
}

pub fn ban_user(
    state: &BotState,
    user: &str,
    reason: Option<String>,
    banned_by: Option<String>,
) -> StateResult<bool> {
    state.ensure_accepting()?;
    let added = {
        let mut inner = state.inner.write();
        if inner.bans.contains_key(user) {
            false
        } else {
            inner.bans.insert(
                user.to_string(),
                BanRecord {
                    user: user.to_string(),
                    reason,
                    banned_by,
                    banned_at: now_ts(),
                },
            );
            true
        }
    };
    if added {
        state.mark_dirty(RecordKind::Bans);
    }
    Ok(added)
}

pub fn unban_user(state: &BotState, user: &str) -> StateResult<bool> {
    state.ensure_accepting()?;
    let removed = state.inner.write().bans.remove(user).is_some();
    if removed {
        state.mark_dirty(RecordKind::Bans);
    }
    Ok(removed)
}

pub fn set_guild_channels(state: &BotState, update: GuildChannels) -> StateResult<()> {
    state.ensure_accepting()?;
    {
        let mut inner = state.inner.write();
        let entry = inner
            .guilds
            .entry(update.guild.clone())
            .or_insert_with(|| GuildChannels {
                guild: update.guild.clone(),
                ..Default::default()
            });
        if update.reaction_channel.is_some() {
            entry.reaction_channel = update.reaction_channel;
        }
        if update.log_channel.is_some() {
            entry.log_channel = update.log_channel;
        }
        if update.support_channel.is_some() {
            entry.support_channel = update.support_channel;
        }
    }
    state.mark_dirty(RecordKind::Guilds);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_state() -> BotState {
        let (state, _rx) = BotState::empty();
        state
    }

    #[test]
    fn test_increment_creates_then_counts() {
        let state = new_state();
        let key = ReactionKey::new("g1", "🛸", "msg1");

        assert_eq!(state.increment_reaction(key.clone()).unwrap(), 1);
        assert_eq!(state.increment_reaction(key.clone()).unwrap(), 2);
        assert_eq!(state.increment_reaction(key).unwrap(), 3);
    }

    #[test]
    fn test_increment_rejects_empty_guild_or_emoji() {
        let state = new_state();
        assert_eq!(
            state.increment_reaction(ReactionKey::new("", "🛸", "m")),
            Err(StateError::InvalidKey)
        );
        assert_eq!(
            state.increment_reaction(ReactionKey::new("g1", "", "m")),
            Err(StateError::InvalidKey)
        );
    }

    #[test]
    fn test_one_open_ticket_per_opener_per_guild() {
        let state = new_state();
        let first = state.open_ticket("g1", "u1").unwrap();
        assert_eq!(first, 1);

        assert_eq!(
            state.open_ticket("g1", "u1"),
            Err(StateError::DuplicateOpenTicket {
                guild: "g1".to_string(),
                opener: "u1".to_string(),
            })
        );

        // Same opener in another guild is fine
        assert_eq!(state.open_ticket("g2", "u1").unwrap(), 2);

        // After closing, the pair may open again
        state.close_ticket(first).unwrap();
        assert_eq!(state.open_ticket("g1", "u1").unwrap(), 3);
    }

    #[test]
    fn test_close_is_terminal() {
        let state = new_state();
        let id = state.open_ticket("g1", "u1").unwrap();

        state.close_ticket(id).unwrap();
        let ticket = state.ticket(id).unwrap();
        assert_eq!(ticket.status, TicketStatus::Closed);
        assert!(ticket.closed_at.is_some());

        assert_eq!(
            state.close_ticket(id),
            Err(StateError::TicketAlreadyClosed(id))
        );
        assert_eq!(state.close_ticket(404), Err(StateError::TicketNotFound(404)));
    }

    #[test]
    fn test_authorize_and_revoke_are_idempotent() {
        let state = new_state();

        assert!(state.authorize_user("u1").unwrap());
        assert!(!state.authorize_user("u1").unwrap());
        assert!(state.is_admin("u1"));

        assert!(state.revoke_user("u1").unwrap());
        assert!(!state.revoke_user("u1").unwrap());
        assert!(!state.is_admin("u1"));
    }

    #[test]
    fn test_ban_reports_existing_ban() {
        let state = new_state();

        assert!(state
            .ban_user("u1", Some("spam".to_string()), Some("admin".to_string()))
            .unwrap());
        assert!(!state.ban_user("u1", None, None).unwrap());
        assert!(state.is_banned("u1"));

        assert!(state.unban_user("u1").unwrap());
        assert!(!state.unban_user("u1").unwrap());
    }

    #[test]
    fn test_guild_channel_updates_merge() {
        let state = new_state();
        state
            .set_guild_channels(GuildChannels {
                guild: "g1".to_string(),
                reaction_channel: Some("c1".to_string()),
                ..Default::default()
            })
            .unwrap();
        state
            .set_guild_channels(GuildChannels {
                guild: "g1".to_string(),
                support_channel: Some("c2".to_string()),
                ..Default::default()
            })
            .unwrap();

        let channels = state.guild_channels("g1").unwrap();
        assert_eq!(channels.reaction_channel.as_deref(), Some("c1"));
        assert_eq!(channels.support_channel.as_deref(), Some("c2"));
        assert!(channels.log_channel.is_none());
    }

    #[test]
    fn test_prune_only_touches_old_closed_tickets() {
        let state = new_state();
        let closed = state.open_ticket("g1", "u1").unwrap();
        state.close_ticket(closed).unwrap();
        let open = state.open_ticket("g1", "u2").unwrap();

        // Nothing is older than an hour yet
        assert_eq!(state.prune_closed_tickets(3600).unwrap(), 0);

        // A cutoff in the future prunes the closed ticket but not the open one
        assert_eq!(state.prune_closed_tickets(-3600).unwrap(), 1);
        assert!(state.ticket(closed).is_none());
        assert!(state.ticket(open).is_some());
    }

    #[test]
    fn test_disconnect_zeroes_latency() {
        let state = new_state();
        state.record_connection(true, 88.5).unwrap();
        assert_eq!(state.snapshot().latency_ms, 88.5);

        state.record_connection(false, 0.0).unwrap();
        let snapshot = state.snapshot();
        assert!(!snapshot.online);
        assert_eq!(snapshot.latency_ms, 0.0);
    }
}
