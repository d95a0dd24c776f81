//! Background flush worker
//!
//! Mutations push dirty-record kinds onto an unbounded channel; this
//! worker drains it, coalesces duplicates, clones the affected records
//! out of the aggregator and rewrites the matching file off the async
//! runtime. Write failures are logged and the file is retried the next
//! time its record type is dirtied.

use std::collections::BTreeSet;
use std::io;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::state::BotState;
use crate::types::{AdminRecord, ReactionRecord, RecordKind};

use super::{FileStore, StoreError, StoreResult};

/// Run until the dirty channel closes or the shutdown signal fires.
/// On shutdown every record type holding data is flushed once more.
pub async fn run_flush_worker(
    state: Arc<BotState>,
    store: Arc<FileStore>,
    mut dirty_rx: mpsc::UnboundedReceiver<RecordKind>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        let first = tokio::select! {
            kind = dirty_rx.recv() => match kind {
                Some(kind) => Some(kind),
                None => break,
            },
            _ = shutdown_rx.changed() => None,
        };

        // Coalesce whatever else queued up while we were waiting
        let mut kinds = BTreeSet::new();
        kinds.extend(first);
        while let Ok(kind) = dirty_rx.try_recv() {
            kinds.insert(kind);
        }
        if first.is_none() {
            // Final pass: rewrite every record type that holds data, not
            // just the ones with a pending notification
            kinds.extend(state.populated_kinds());
        }

        for kind in &kinds {
            if let Err(e) = flush(&state, &store, *kind).await {
                warn!(kind = %kind, error = %e, "flush failed, will retry on next change");
            }
        }

        if first.is_none() {
            // Shutdown: the pass above was the final best-effort flush
            break;
        }
    }
    debug!("flush worker stopped");
}

/// Write one record type. The records are cloned under the read lock,
/// then written on the blocking pool so the runtime never stalls on disk.
pub async fn flush(state: &BotState, store: &Arc<FileStore>, kind: RecordKind) -> StoreResult<()> {
    let store = Arc::clone(store);
    let task = match kind {
        RecordKind::Status => {
            let record = state.status_record();
            tokio::task::spawn_blocking(move || store.save_status(&record))
        }
        RecordKind::Reactions => {
            let records: Vec<ReactionRecord> = state
                .reactions_view()
                .iter()
                .map(|(key, count)| ReactionRecord::from_entry(key, *count))
                .collect();
            tokio::task::spawn_blocking(move || store.save_reactions(&records))
        }
        RecordKind::Tickets => {
            let tickets = state.tickets_view();
            tokio::task::spawn_blocking(move || store.save_tickets(&tickets))
        }
        RecordKind::Admins => {
            let admins: Vec<AdminRecord> = state
                .admins_view()
                .into_iter()
                .map(|(user, added_at)| AdminRecord { user, added_at })
                .collect();
            tokio::task::spawn_blocking(move || store.save_admins(&admins))
        }
        RecordKind::Bans => {
            let bans = state.bans_view();
            tokio::task::spawn_blocking(move || store.save_bans(&bans))
        }
        RecordKind::Guilds => {
            let guilds = state.guilds_view();
            tokio::task::spawn_blocking(move || store.save_guilds(&guilds))
        }
    };

    match task.await {
        Ok(result) => result,
        Err(e) => Err(StoreError::Io(io::Error::new(io::ErrorKind::Other, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreConfig;
    use crate::types::ReactionKey;
    use std::time::Duration;
    use tempfile::TempDir;

    fn new_fixture() -> (
        Arc<BotState>,
        Arc<FileStore>,
        mpsc::UnboundedReceiver<RecordKind>,
        TempDir,
    ) {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(FileStore::new(StoreConfig::new(temp_dir.path())));
        let (state, dirty_rx) = BotState::empty();
        (Arc::new(state), store, dirty_rx, temp_dir)
    }

    #[tokio::test]
    async fn test_worker_flushes_dirty_records() {
        let (state, store, dirty_rx, _dir) = new_fixture();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        state
            .increment_reaction(ReactionKey::new("g1", "🛸", "m1"))
            .unwrap();
        state.open_ticket("g1", "u1").unwrap();

        let worker = tokio::spawn(run_flush_worker(
            Arc::clone(&state),
            Arc::clone(&store),
            dirty_rx,
            shutdown_rx,
        ));

        // Give the worker a moment to drain, then stop it
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), worker)
            .await
            .unwrap()
            .unwrap();

        let records = store.load().unwrap();
        assert_eq!(
            records.reactions.get(&ReactionKey::new("g1", "🛸", "m1")),
            Some(&1)
        );
        assert_eq!(records.tickets.len(), 1);
    }

    #[tokio::test]
    async fn test_worker_drains_once_more_on_shutdown() {
        let (state, store, dirty_rx, _dir) = new_fixture();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // Dirty a record, then signal shutdown before starting the worker:
        // the notification must still reach disk.
        state.authorize_user("admin").unwrap();
        shutdown_tx.send(true).unwrap();

        run_flush_worker(Arc::clone(&state), Arc::clone(&store), dirty_rx, shutdown_rx).await;

        let records = store.load().unwrap();
        assert!(records.admins.contains_key("admin"));
    }

    #[tokio::test]
    async fn test_shutdown_flushes_populated_records_without_notifications() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(FileStore::new(StoreConfig::new(temp_dir.path())));

        // Records loaded at construction produce no dirty notifications;
        // the final shutdown pass must write them out regardless.
        let mut records = crate::types::RecordSet::default();
        records.tickets.insert(3, crate::types::Ticket::open(3, "g1", "u1"));
        let (state, dirty_rx) = BotState::from_records(records);
        let state = Arc::new(state);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();
        run_flush_worker(Arc::clone(&state), Arc::clone(&store), dirty_rx, shutdown_rx).await;

        let reloaded = store.load().unwrap();
        assert!(reloaded.tickets.contains_key(&3));
    }

    #[tokio::test]
    async fn test_flush_failure_does_not_poison_worker() {
        let temp_dir = TempDir::new().unwrap();
        // Point the store at a path that cannot be a directory
        let blocked = temp_dir.path().join("blocked");
        std::fs::write(&blocked, "file, not a dir").unwrap();
        let store = Arc::new(FileStore::new(StoreConfig::new(&blocked)));
        let (state, _rx) = BotState::empty();
        let state = Arc::new(state);

        state
            .increment_reaction(ReactionKey::new("g1", "🛸", "m1"))
            .unwrap();
        let result = flush(&state, &store, RecordKind::Reactions).await;
        assert!(result.is_err());

        // State is untouched and further mutations still work
        assert_eq!(
            state
                .increment_reaction(ReactionKey::new("g1", "🛸", "m1"))
                .unwrap(),
            2
        );
    }
}
