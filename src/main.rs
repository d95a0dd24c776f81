use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use sighting_bot::api::{create_router, AppState};
use sighting_bot::ingest::spawn_consumer;
use sighting_bot::state::spawn_ticket_pruner;
use sighting_bot::store::{run_flush_worker, FileStore, StoreConfig};
use sighting_bot::telemetry::{init_tracing, LogBuffer};
use sighting_bot::{BotState, Config};

const EVENT_QUEUE_CAPACITY: usize = 1024;
const TICKET_RETENTION_SECS: i64 = 30 * 24 * 60 * 60;
const TICKET_PRUNE_PERIOD: std::time::Duration = std::time::Duration::from_secs(24 * 60 * 60);

#[tokio::main]
async fn main() {
    let logs = LogBuffer::default();
    init_tracing(&logs);

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "configuration error");
            std::process::exit(1);
        }
    };
    info!(
        service = sighting_bot::NAME,
        version = sighting_bot::VERSION,
        port = config.dashboard_port,
        data_dir = %config.data_dir.display(),
        "starting"
    );
    debug!(token_len = config.bot_token.len(), "gateway credential loaded");

    let store = Arc::new(FileStore::new(StoreConfig::new(&config.data_dir)));
    let records = match store.load() {
        Ok(records) => records,
        Err(e) => {
            error!(error = %e, "failed to load record files");
            std::process::exit(1);
        }
    };
    info!(
        tickets = records.tickets.len(),
        reactions = records.reactions.len(),
        admins = records.admins.len(),
        "records loaded"
    );

    let (state, dirty_rx) = BotState::from_records(records);
    let state = Arc::new(state);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let flush_worker = tokio::spawn(run_flush_worker(
        Arc::clone(&state),
        Arc::clone(&store),
        dirty_rx,
        shutdown_rx,
    ));
    let (event_queue, consumer) = spawn_consumer(Arc::clone(&state), EVENT_QUEUE_CAPACITY);
    let pruner = spawn_ticket_pruner(Arc::clone(&state), TICKET_PRUNE_PERIOD, TICKET_RETENTION_SECS);

    state.mark_ready();

    let app_state = Arc::new(AppState::new(Arc::clone(&state), logs));
    let router = create_router(app_state);

    let addr = format!("0.0.0.0:{}", config.dashboard_port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %addr, error = %e, "failed to bind dashboard port");
            std::process::exit(1);
        }
    };
    info!(addr = %addr, "dashboard listening");

    let serve_result = axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await;
    if let Err(e) = serve_result {
        error!(error = %e, "dashboard server error");
    }

    // Orderly teardown: stop accepting mutations, let the consumer drain,
    // then give the flush worker one final pass.
    state.begin_shutdown();
    pruner.abort();
    drop(event_queue);
    if let Err(e) = consumer.await {
        warn!(error = %e, "event consumer ended abnormally");
    }

    let _ = shutdown_tx.send(true);
    match tokio::time::timeout(config.shutdown_grace, flush_worker).await {
        Ok(Ok(())) => info!("final flush complete"),
        Ok(Err(e)) => warn!(error = %e, "flush worker ended abnormally"),
        Err(_) => warn!("flush worker did not finish within the grace period"),
    }
}
