//! HTTP API for the unlock relay.

mod handlers;
mod middleware;
mod types;

pub use middleware::{logging_middleware, rate_limit_middleware, RateLimitState};
pub use types::*;

use crate::config::Config;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use dhru_client::{AuthPlacement, DhruClient};
use order_store::OrderStore;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

/// Per-request relay behavior derived from the configuration.
#[derive(Debug, Clone)]
pub struct RelayOptions {
    pub service_details_path: String,
    pub auth_placement: AuthPlacement,
    pub services_ttl: Duration,
    pub profit_margin_percent: f64,
    pub allow_list: Vec<String>,
    pub block_list: Vec<String>,
    pub order_status_enabled: bool,
}

impl RelayOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            service_details_path: config.provider.service_details_path.clone(),
            auth_placement: config.provider.auth_placement,
            services_ttl: config.cache.services_ttl,
            profit_margin_percent: config.pricing.profit_margin_percent,
            allow_list: config.services_filter.allow_ids(),
            block_list: config.services_filter.block_ids(),
            order_status_enabled: config.provider.order_status_enabled,
        }
    }
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            service_details_path: "/widget/getServicedetailsIMEI".into(),
            auth_placement: AuthPlacement::AuthorizationBearer,
            services_ttl: Duration::from_secs(3600),
            profit_margin_percent: 0.0,
            allow_list: Vec::new(),
            block_list: Vec::new(),
            order_status_enabled: true,
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Provider-compatibility client
    pub client: DhruClient,
    /// Services cache and order log
    pub store: OrderStore,
    /// Relay behavior knobs
    pub relay: Arc<RelayOptions>,
}

impl AppState {
    /// Create new application state.
    pub fn new(client: DhruClient, store: OrderStore, relay: RelayOptions) -> Self {
        Self {
            client,
            store,
            relay: Arc::new(relay),
        }
    }
}

/// Create the API router with default rate limiting.
pub fn create_router(state: AppState) -> Router {
    create_router_with_rate_limit(state, RateLimitState::new(60))
}

/// Create the API router with custom rate limiting.
pub fn create_router_with_rate_limit(state: AppState, rate_limit: RateLimitState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Provider account
        .route("/v1/balance", get(handlers::balance))
        // Service catalog
        .route("/v1/services", get(handlers::list_services))
        .route("/v1/services/:id", get(handlers::service_details))
        // Orders
        .route(
            "/v1/orders",
            post(handlers::place_order).get(handlers::list_orders),
        )
        .route("/v1/orders/:id", get(handlers::order_status))
        // Diagnostics
        .route("/v1/provider/probe", get(handlers::provider_probe))
        .layer(axum_middleware::from_fn_with_state(
            rate_limit.clone(),
            rate_limit_middleware,
        ))
        .layer(axum_middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
