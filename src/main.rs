use anyhow::Context;

use mindjournal_api::{build_router, config::Config, db, spawn_maintenance_worker, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mindjournal_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Config::from_env()?;

    let db = db::create_pool(&config.database_url)
        .await
        .context("Failed to create database pool")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("Failed to run database migrations")?;

    tracing::info!("Database migrations applied");

    let addr = config.listen_addr();
    tracing::info!(
        session_backend = ?config.session_backend,
        demo_mode = config.demo_mode,
        extended_rules = config.rules.extended_rules_enabled,
        "Configuration loaded"
    );

    let state = AppState::new(db, config)?;
    spawn_maintenance_worker(state.clone());

    let app = build_router(state);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    // Connect info feeds the per-IP rate limiter.
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
