// src/main.rs

use gate_exam::config::Config;
use gate_exam::routes;
use gate_exam::state::AppState;
use gate_exam::store::{DocumentStore, MemoryStore, PgStore};
use gate_exam::utils::clock::{Clock, SystemClock};
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(database_url) => Arc::new(connect_postgres(database_url).await),
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store (data is lost on exit)");
            Arc::new(MemoryStore::new())
        }
    };
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let state = AppState::new(config.clone(), store, clock);

    // Seed Admin User
    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        if let Err(e) = state.users.seed_admin(email, password).await {
            tracing::error!("Failed to seed admin user: {:?}", e);
        }
    }

    // Create the Axum application router
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind {}: {}", config.bind_addr, e));
    tracing::info!("Listening on {}", config.bind_addr);

    // Start the server
    axum::serve(listener, app).await.expect("Server error");
}

/// Connects with retries, then applies migrations.
async fn connect_postgres(database_url: &str) -> PgStore {
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    let store = PgStore::new(pool);

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    store
        .migrate()
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    store
}
