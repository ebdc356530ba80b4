//! Gateway server setup
//!
//! Routes, state wiring and the server runner.

mod extract;
mod handler;
mod notifications;
mod queue;
mod response;
mod state;

pub use handler::{chat_handler, notify_handler, ConnectParams};
pub use response::{ApiError, ApiResult};
pub use state::GatewayState;

use crate::broadcast::RedisEventSource;
use axum::{
    extract::State,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use totalk_common::{AppConfig, AppError};
use totalk_core::{MessageRepository, NotificationRepository, QueueRepository};
use totalk_db::{
    create_pool, run_migrations, InMemoryMessageRepository, InMemoryNotificationRepository,
    InMemoryQueueRepository, PgMessageRepository, PgNotificationRepository, PgQueueRepository,
};
use tower_http::trace::TraceLayer;

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/ws/notify", get(notify_handler))
        .route("/ws/chat/:chat_id", get(chat_handler))
        .route(
            "/events/:event_id/queue",
            post(queue::join_queue).get(queue::queue_status),
        )
        .route("/events/:event_id/queue/:user_id", delete(queue::leave_queue))
        .route(
            "/events/:event_id/queue/:user_id/position",
            get(queue::queue_position),
        )
        .route(
            "/events/:event_id/queue/:user_id/complete",
            post(queue::complete_entry),
        )
        // Kept off `/queue/` so no user id is shadowed by an action name
        .route("/events/:event_id/queue-actions/next", post(queue::process_next))
        .route("/events/:event_id/queue-actions/close", post(queue::close_queue))
        .route("/notifications", post(notifications::publish_notification))
        .route(
            "/notifications/:notification_id",
            get(notifications::get_notification).delete(notifications::cancel_notification),
        )
        .route("/health", get(health_check))
}

/// Health check endpoint
async fn health_check(State(state): State<GatewayState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "notify_sessions": state.notify_hub().len(),
        "chat_rooms": state.rooms().room_count(),
        "dispatcher_running": state.dispatcher().is_running(),
        "scheduler_running": state.notifications().is_running(),
    }))
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Initialize all dependencies and create `GatewayState`
///
/// Uses PostgreSQL when `database` is configured and in-memory repositories
/// otherwise. Starts the dispatcher, the notification scheduler and, when
/// `redis` is configured, the Pub/Sub event source.
pub async fn create_gateway_state(config: AppConfig) -> Result<GatewayState, AppError> {
    let (queue_repo, message_repo, notification_repo) = create_repositories(&config).await?;

    let state = GatewayState::new(config, queue_repo, message_repo, notification_repo);
    Arc::clone(state.dispatcher()).start();
    Arc::clone(state.notifications())
        .start_scheduler(state.config().notifications.schedule_interval());

    if let Some(redis) = &state.config().redis {
        tracing::info!(channel = %redis.channel, "Starting Redis event source");
        RedisEventSource::new(redis.clone(), state.dispatcher().sender()).spawn();
    }

    Ok(state)
}

type Repositories = (
    Arc<dyn QueueRepository>,
    Arc<dyn MessageRepository>,
    Arc<dyn NotificationRepository>,
);

async fn create_repositories(config: &AppConfig) -> Result<Repositories, AppError> {
    let Some(database) = &config.database else {
        tracing::info!("No database configured, state is kept in memory only");
        let in_memory: Repositories = (
            Arc::new(InMemoryQueueRepository::new()),
            Arc::new(InMemoryMessageRepository::new()),
            Arc::new(InMemoryNotificationRepository::new()),
        );
        return Ok(in_memory);
    };

    tracing::info!("Connecting to PostgreSQL...");
    let pool = create_pool(database)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    run_migrations(&pool, database.migrations_dir.as_deref())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    tracing::info!("PostgreSQL connection established");

    let postgres: Repositories = (
        Arc::new(PgQueueRepository::new(pool.clone())),
        Arc::new(PgMessageRepository::new(pool.clone())),
        Arc::new(PgNotificationRepository::new(pool)),
    );
    Ok(postgres)
}

/// Run the gateway server until ctrl-c
pub async fn run_server(listener: TcpListener, state: GatewayState) -> Result<(), AppError> {
    let app = create_app(state.clone());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal(state: GatewayState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutdown signal received");
    state.shutdown();
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig) -> Result<(), AppError> {
    let addr = config.gateway.address();
    let state = create_gateway_state(config).await?;

    tracing::info!("Starting Gateway server on {}", addr);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Gateway listening on http://{}", addr);
    run_server(listener, state).await
}
