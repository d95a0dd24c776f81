//! Validation errors returned by aggregator mutations
//!
//! These are returned synchronously to the caller and never crash the
//! process; persistence failures are a separate, logged-only concern.

/// Result type for aggregator mutations
pub type StateResult<T> = Result<T, StateError>;

/// Errors a mutation can report to its caller
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("reaction key needs a non-empty guild and emoji")]
    InvalidKey,

    #[error("user {opener} already has an open ticket in guild {guild}")]
    DuplicateOpenTicket { guild: String, opener: String },

    #[error("ticket {0} not found")]
    TicketNotFound(u64),

    #[error("ticket {0} is already closed")]
    TicketAlreadyClosed(u64),

    #[error("shutting down, mutation rejected")]
    ShuttingDown,
}
