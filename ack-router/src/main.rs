//! AckRouter Web Server - Slack webhook receiver.
//!
//! This binary provides a thin web server that:
//! - Verifies Slack request signatures
//! - Routes commands, interactions and events to registered handlers
//! - Answers with the handler's ack synchronously

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{
    routing::{any, get},
    Router,
};
use tokio::{net::TcpListener, signal};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ackrouter::web::{health, webhook, AppState};
use ackrouter::{Ack, App, Config, Payload, RouterBuilder};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("web_server_starting");

    // Load configuration
    let config = Config::from_env();
    info!(
        port = config.port,
        route_path = %config.route_path,
        signing_key_configured = config.signing_key.is_some(),
        signature_max_age = config.signature_max_age,
        "config_loaded"
    );

    let routes = RouterBuilder::new()
        .command("/ping", |_: &Payload| Ok(Ack::from("pong")))
        .build();

    let app = App::new(config.signing_key.clone(), routes).with_max_age(config.signature_max_age);
    let state = AppState::new(app);

    // Build the router
    let server = Router::new()
        .route("/health", get(health))
        .route(&config.route_path, any(webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "web_server_listening");

    // Run server with graceful shutdown
    axum::serve(listener, server)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("web_server_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("web_server_shutting_down");
}
