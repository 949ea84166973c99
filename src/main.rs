mod catalog;
mod config;
mod db;
mod entities;
mod error;
mod models;
mod routes;
mod slug;
mod store;
mod validation;

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{catalog::Catalog, config::Config};

pub struct AppState {
    pub catalog: Catalog,
    pub db: DatabaseConnection,
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Token for one request; cancelled together with the whole process.
    pub fn request_token(&self) -> CancellationToken {
        self.shutdown.child_token()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,movies=debug,sqlx=warn".to_string()),
        )
        .init();

    let config = Config::from_env()?;

    let db = db::connect_and_migrate(&config).await?;
    let shutdown = CancellationToken::new();

    let state = Arc::new(AppState {
        catalog: Catalog::new(db.clone()),
        db,
        shutdown: shutdown.clone(),
    });

    let app = routes::router(state)
        .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    tracing::info!(addr = %config.addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutting down");
            shutdown.cancel();
        })
        .await?;

    Ok(())
}
