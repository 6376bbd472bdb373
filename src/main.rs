//! CRUD + listing for a single payment resource over HTTP, backed by SQLite,
//! with a health check.
#![doc = include_str!("../README.md")]

use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use axum::Router;
use tracing_subscriber::EnvFilter;

mod db;
mod health;
/// Payment resource: model, validation, service policy and HTTP surface.
mod payment;
mod state;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(false)
        .init();

    match dotenvy::dotenv() {
        Ok(p) => tracing::info!(path = %p.display(), "Loaded environment variables from .env file"),
        Err(e) => tracing::warn!("Failed to environment variables from .env: {e}"),
    };

    let database_url = std::env::var("DATABASE_URL").expect("database url to be defined");
    let db = db::Db::connect(&database_url)
        .await
        .expect("database is not available");
    let state = state::AppState::new(db.clone());

    let path_prefix = std::env::var("PATH_PREFIX").unwrap_or_else(|_| "/v1".to_owned());
    let app = Router::new()
        .merge(health::router())
        .merge(payment::api::router(&path_prefix))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8081);
    let grace = Duration::from_secs(
        std::env::var("GRACEFUL_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10),
    );

    let listener = tokio::net::TcpListener::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port))
        .await
        .unwrap();

    tracing::info!("Serving on port {port} with prefix {path_prefix}");
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutting down");
                let _ = shutdown_tx.send(());
            })
            .await
    });

    match shutdown_rx.await {
        // In-flight requests get the grace period to drain, then the rest is
        // force-closed.
        Ok(()) => match tokio::time::timeout(grace, &mut server).await {
            Ok(result) => {
                if let Err(e) = result.expect("server task not to panic") {
                    tracing::error!("Http server error: {e}");
                }
            }
            Err(_) => {
                tracing::warn!("Grace period expired, aborting remaining connections");
                server.abort();
            }
        },
        // The server stopped before any signal was delivered.
        Err(_) => {
            if let Ok(Err(e)) = server.await {
                tracing::error!("Http server error: {e}");
            }
        }
    }
    db.close().await;
}
