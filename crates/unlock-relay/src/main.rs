//! Unlock relay - entry point.

use dhru_client::DhruClient;
use order_store::OrderStore;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use unlock_relay::api::{create_router_with_rate_limit, AppState, RateLimitState, RelayOptions};
use unlock_relay::config::Config;

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e:#}");
            std::process::exit(1);
        }
    };

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting unlock relay");

    // Initialize storage
    let store = if config.cache.persist {
        OrderStore::open(config.cache.path.clone()).await
    } else {
        info!("Persistence disabled, using in-memory storage");
        OrderStore::memory()
    };

    // Initialize the provider client
    let client = match DhruClient::new(
        &config.provider.base_url,
        &config.provider.username,
        &config.provider.api_key,
        config.provider.timeout,
    ) {
        Ok(c) => c.with_session_cookie(&config.provider.session_cookie),
        Err(e) => {
            error!("Failed to create provider client: {}", e);
            std::process::exit(1);
        }
    };

    // Create application state
    let state = AppState::new(client, store, RelayOptions::from_config(&config));

    // Create rate limiter from config
    let rate_limit = RateLimitState::new(config.rate_limit.global_per_minute);

    // Create router with rate limiting
    let app = create_router_with_rate_limit(state, rate_limit);

    // Bind to address
    let addr = SocketAddr::new(
        config
            .server
            .listen_addr
            .parse()
            .unwrap_or([0, 0, 0, 0].into()),
        config.server.port,
    );

    info!("Listening on {}", addr);

    let listener = match TcpListener::bind(addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
