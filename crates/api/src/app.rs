use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use persistence::notify::ProfileNotifier;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{require_admin_key, trace_id};
use crate::routes::{admin, health, invites, requests};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    /// In-process fan-out for profile writes; sessions hosted in this
    /// process subscribe through it for live sync.
    pub notifier: ProfileNotifier,
}

pub fn create_app(config: Config, pool: PgPool) -> Router {
    let config = Arc::new(config);

    let state = AppState {
        pool,
        config: config.clone(),
        notifier: ProfileNotifier::new(),
    };

    // Build CORS layer based on configuration
    let cors = if config.security.cors_origins.is_empty() {
        // Default: allow any origin (for development)
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        // Production: only allow specified origins
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/api/requests", post(requests::submit_request))
        .route("/api/invites/send", post(invites::send_invite))
        .route(
            "/api/invites/validate/:token",
            get(invites::validate_invite),
        )
        .route("/api/invites/:token/redeem", post(invites::redeem_invite));

    // Admin routes (require the shared admin secret)
    let admin_routes = Router::new()
        .route("/api/requests", get(requests::list_requests))
        .route("/api/requests/:id/status", post(requests::set_status))
        .route("/api/requests/:id/approve", post(requests::approve_request))
        .route("/api/invites", get(invites::list_invites))
        .route("/api/admin/set-claim", post(admin::set_claim))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin_key,
        ));

    // Merge all routes
    Router::new()
        .merge(public_routes)
        .merge(admin_routes)
        // Global middleware (order matters: bottom layers run first)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
