use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod error;
mod jwt;
mod media_store;
mod middleware;
mod models;
mod repositories;
mod response;
mod routes;
mod state;
mod validation;

use common::database::{DatabaseConfig, init_pool};
use tokio::net::TcpListener;

use crate::jwt::{JwtConfig, JwtService};
use crate::media_store::{MediaStore, MediaStoreConfig};
use crate::repositories::{UserRepository, VideoRepository};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting VidTube API service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Apply schema migrations before serving
    common::database::run_migrations(&pool).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    // Initialize the JWT service
    let jwt_config = JwtConfig::from_env()?;
    let jwt_service = JwtService::new(jwt_config);
    info!(
        "Token expiries: access {}s, refresh {}s",
        jwt_service.access_token_expiry(),
        jwt_service.refresh_token_expiry()
    );

    // Initialize the media store adapter
    let media_config = MediaStoreConfig::from_env();
    let media_store = MediaStore::new(media_config).await;

    // Initialize repositories
    let user_repository = UserRepository::new(pool.clone());
    let video_repository = VideoRepository::new(pool.clone());

    let app_state = AppState {
        jwt_service,
        media_store,
        user_repository,
        video_repository,
    };

    // Start the web server
    let app = routes::create_router(app_state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("VidTube API service listening on 0.0.0.0:{}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Teardown: drain the pool before exiting
    pool.close().await;
    info!("VidTube API service shut down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
