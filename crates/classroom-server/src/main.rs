mod config;
mod seed;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use classroom_api::{AppState, AppStateInner};

use crate::config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "classroom_server=debug,classroom_api=debug,classroom_db=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = ServerConfig::from_env()?;

    // Init database
    let db = classroom_db::Database::open(&config.db_path)?;
    if let Some(path) = &config.seed_users {
        seed::load_users(&db, path)?;
    }

    let state: AppState = Arc::new(AppStateInner { db });

    // The browser client is served from another origin
    let app = classroom_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("Classroom server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
