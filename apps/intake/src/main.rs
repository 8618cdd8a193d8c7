mod application;
mod config;
mod contact;
mod db;
mod errors;
mod events;
mod extraction;
mod models;
mod notify;
mod pipeline;
mod routes;
mod state;
mod storage;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::application::ApplicationBuilder;
use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::events::queue::RedisEventQueue;
use crate::events::worker::{run_worker, WorkerOptions};
use crate::notify::{LogNotifier, SendGridNotifier};
use crate::pipeline::{Notifier, Pipeline};
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{build_s3_client, S3Storage};
use crate::store::PgRecordStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting intake v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;
    ensure_schema(&db).await?;
    let store = Arc::new(PgRecordStore::new(db));

    // Initialize Redis
    let redis = redis::Client::open(config.redis_url.clone())?;
    let queue = Arc::new(RedisEventQueue::new(redis, config.event_queue.clone()));
    info!("Redis event queue '{}' initialized", config.event_queue);

    // Initialize S3 / MinIO
    let storage = S3Storage::new(build_s3_client(&config).await);
    info!("S3 client initialized");

    let notifier: Arc<dyn Notifier> = match config.sendgrid.clone() {
        Some(sendgrid) => {
            info!("Confirmation emails via SendGrid from {}", sendgrid.from_email);
            Arc::new(SendGridNotifier::new(sendgrid)?)
        }
        None => {
            info!("SENDGRID_API_KEY or FROM_EMAIL not set; confirmations are logged only");
            Arc::new(LogNotifier)
        }
    };

    let pipeline = Arc::new(Pipeline::new(
        Arc::new(storage.clone()),
        store.clone(),
        notifier,
        ApplicationBuilder::new(config.storage_public_base_url.clone()),
    ));

    tokio::spawn(run_worker(
        queue.clone(),
        pipeline.clone(),
        WorkerOptions {
            concurrency: config.worker_concurrency,
            max_attempts: config.max_delivery_attempts,
        },
    ));

    // Build app state
    let state = AppState {
        pipeline,
        store,
        storage,
        queue,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
