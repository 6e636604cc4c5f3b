mod auth;
mod config;
mod middleware;

mod db;
mod error;
mod models;
mod queue;
mod routes;
mod store;

use std::sync::Arc;

use crate::{
    config::Config,
    models::AppState,
    queue::{QueueService, clock::SystemClock},
    store::PgStore,
};

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use axum::http::header;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cfg = Config::from_env()?;
    let pool = db::connect_pg(&cfg.database_url, cfg.db_max_connections).await?;

    let queue = QueueService::new(
        Arc::new(PgStore::new(pool.clone())),
        Arc::new(SystemClock),
        cfg.clinic_offset,
    );
    tracing::info!(offset = %cfg.clinic_offset, "clinic day configured");

    let state = AppState {
        db: pool,
        queue: Arc::new(queue),
        session_ttl_hours: cfg.session_ttl_hours,
    };

    // Browser dashboards are served from a different origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]);

    let app = routes::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on http://{}", cfg.bind_addr);
    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
