use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get};
use tracing::{info, warn};
use vttlink::config::Config;
use vttlink::server::AppState;
use vttlink::{scene, transport, ws};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Using default config: {e}");
        Config::default()
    });

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_filter()));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    if config.server.password == "changeme" {
        warn!("GM password is the default; set [server].password in config.toml");
    }

    let shared_state = Arc::new(AppState::new(config.clone()));

    scene::autosave::spawn(shared_state.registry.clone(), config.autosave.interval_ms);

    let app = Router::new()
        .route("/ws", get(ws::websocket_handler))
        .with_state(shared_state.clone())
        .merge(transport::http_server::router(shared_state))
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let address = SocketAddr::new(config.server.host.parse()?, config.server.port);
    info!("vttlink listening on {}", address);

    let listener = tokio::net::TcpListener::bind(address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
