use std::sync::Arc;

use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use hookline_core::config::Config;
use hookline_core::tracing::init_tracing;
use hookline_webhooks::config::WebhooksConfig;
use hookline_webhooks::delivery::pipeline::DeliveryPipeline;
use hookline_webhooks::delivery::queue::{DeliveryQueue, DeliveryWorkerPool};
use hookline_webhooks::delivery::recorder::AttemptRecorder;
use hookline_webhooks::infra::db::DbAttemptRepository;
use hookline_webhooks::infra::delivery::HttpDeliveryClient;
use hookline_webhooks::router::build_router;
use hookline_webhooks::state::AppState;
use hookline_webhooks_migration::Migrator;

#[tokio::main]
async fn main() {
    init_tracing();

    let config = WebhooksConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    if config.auto_migrate {
        Migrator::up(&db, None)
            .await
            .expect("failed to apply migrations");
    }

    let delivery_client = HttpDeliveryClient::new().expect("failed to build delivery client");

    let pipeline = Arc::new(DeliveryPipeline {
        delivery: delivery_client.clone(),
        recorder: AttemptRecorder::new(
            DbAttemptRepository { db: db.clone() },
            config.record_policy(),
        ),
        retry: config.retry_policy(),
        timeout: config.delivery_timeout(),
    });
    let (queue, receiver) = DeliveryQueue::bounded(config.delivery_queue_capacity, config.enqueue_timeout());
    let workers = DeliveryWorkerPool::spawn(
        pipeline,
        receiver,
        config.delivery_workers,
        CancellationToken::new(),
    );

    let addr = format!("0.0.0.0:{}", config.webhooks_port);
    let shutdown_grace = config.shutdown_grace();
    let state = AppState {
        db: db.clone(),
        delivery_client,
        queue,
        config: Arc::new(config),
    };

    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("webhooks service listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    if let Err(e) = workers.shutdown_graceful(shutdown_grace).await {
        error!(error = ?e, "delivery workers shut down uncleanly");
    }
    if let Err(e) = db.close().await {
        error!(error = %e, "failed to close database connection");
    }
    info!("webhooks service stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
