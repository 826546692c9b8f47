use std::sync::Arc;

use devportal_gateway::app::{app, AppState};
use devportal_gateway::config;
use devportal_gateway::session::InMemorySessionStore;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up APP_ENV, DEVPORTAL_PORT, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting DevPortal gateway in {:?} mode", config.environment);

    let state = AppState::new(Arc::new(InMemorySessionStore::new()))
        .expect("route whitelist failed to load");
    let app = app(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("DEVPORTAL_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    println!("🚀 DevPortal gateway listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}
