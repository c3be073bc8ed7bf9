use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pipeworks_events::{BusNotifier, EventBus};
use pipeworks_pipeline::AgentsClient;
use pipeworks_store::MemoryStore;
use pipeworks_worker::{BatchOptions, JobWorker};

/// Seconds between scheduler passes when the queue is idle.
const POLL_INTERVAL_SECS: u64 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pipeworks_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let agents_url =
        std::env::var("AGENTS_BASE_URL").unwrap_or_else(|_| "http://localhost:7700".to_string());
    tracing::info!(%agents_url, "Worker starting");

    let store = Arc::new(MemoryStore::new());
    let bus = Arc::new(EventBus::default());
    let worker = JobWorker::new(
        store.clone(),
        store.clone(),
        store,
        Arc::new(AgentsClient::new(agents_url)),
        Arc::new(BusNotifier::new(bus)),
    );

    let mut ticker = tokio::time::interval(Duration::from_secs(POLL_INTERVAL_SECS));
    loop {
        ticker.tick().await;
        if let Err(err) = worker.process_pending_jobs(None, BatchOptions::default()).await {
            tracing::error!(%err, "scheduler pass failed");
        }
    }
}
