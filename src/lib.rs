use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod services;

use auth::rate_limit::RateLimitState;
use auth::session::{build_session_store, SessionStore};
use config::Config;
use services::rules::RecommendationEngine;
use services::sentiment::SentimentAnalyzer;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,
    pub rate_limiter: RateLimitState,
    pub sessions: Arc<dyn SessionStore>,
    pub engine: Arc<RecommendationEngine>,
    pub analyzer: Arc<SentimentAnalyzer>,
}

impl AppState {
    /// Wires every collaborator from explicit configuration.
    pub fn new(db: PgPool, config: Config) -> anyhow::Result<Self> {
        let sessions = build_session_store(config.session_backend, db.clone());
        let engine = RecommendationEngine::from_config(&config.rules);
        let analyzer = SentimentAnalyzer::from_config(&config)?;

        Ok(Self {
            db,
            config: Arc::new(config),
            rate_limiter: RateLimitState::new(),
            sessions,
            engine: Arc::new(engine),
            analyzer: Arc::new(analyzer),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/api/v1/auth/register", post(handlers::auth::register))
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit_auth,
        ));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz))
        .merge(auth_routes);

    let protected_routes = Router::new()
        .route("/api/v1/auth/me", get(handlers::auth::me))
        .route("/api/v1/auth/logout", post(handlers::auth::logout))
        // Check-ins
        .route(
            "/api/v1/diary/checkins",
            get(handlers::checkins::list_checkins).post(handlers::checkins::create_checkin),
        )
        .route(
            "/api/v1/diary/checkins/:id",
            get(handlers::checkins::get_checkin),
        )
        // Diary
        .route(
            "/api/v1/diary",
            get(handlers::diary::list_entries).post(handlers::diary::create_entry),
        )
        .route(
            "/api/v1/diary/:id",
            get(handlers::diary::get_entry).put(handlers::diary::update_entry),
        )
        // Stats; the /diary/stats paths are kept for older clients.
        .route("/api/v1/stats/weekly", get(handlers::stats::get_weekly_stats))
        .route(
            "/api/v1/stats/recommendations",
            get(handlers::stats::get_recommendations),
        )
        .route(
            "/api/v1/diary/stats/weekly",
            get(handlers::stats::get_weekly_stats),
        )
        .route(
            "/api/v1/diary/stats/recommendations",
            get(handlers::stats::get_recommendations),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    let cors = cors_layer(&state.config);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(error::route_not_found)
        .layer(middleware::from_fn(error::method_not_allowed_body))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<axum::http::HeaderValue> = std::iter::once(&config.frontend_url)
        .chain(config.cors_extra_origins.iter())
        .filter_map(|origin| match origin.parse() {
            Ok(hv) => Some(hv),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true)
}

/// Periodically drops expired sessions and stale rate-limit windows.
pub fn spawn_maintenance_worker(state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            match state.sessions.purge_expired().await {
                Ok(purged) if purged > 0 => {
                    tracing::info!(purged, "Purged expired sessions");
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Session purge failed"),
            }
            let dropped = state.rate_limiter.cleanup().await;
            tracing::debug!(dropped, "Rate limiter cleanup");
        }
    });
}
