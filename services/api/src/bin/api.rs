//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{HttpMailAdapter, LogMailAdapter, SheetStoreAdapter},
    config::Config,
    error::ApiError,
    web::{rest::ApiDoc, router, state::AppState},
};
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    Method,
};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tutoring_core::{InMemoryTabularStore, NotificationService, TabularStore};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

const MAIL_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to the Store & Run Migrations ---
    let store: Arc<dyn TabularStore> = match &config.database_url {
        Some(database_url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let sheets = SheetStoreAdapter::new(db_pool);
            info!("Running database migrations...");
            sheets.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(sheets)
        }
        None => {
            warn!("DATABASE_URL is not set; running in mock mode with an in-memory demo roster. Nothing will be persisted.");
            Arc::new(InMemoryTabularStore::with_demo_roster())
        }
    };

    // --- 3. Initialize the Mailer ---
    let notifier: Arc<dyn NotificationService> = match &config.mail {
        Some(mail) => {
            let client = reqwest::Client::builder()
                .timeout(MAIL_TIMEOUT)
                .build()
                .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {}", e)))?;
            info!(relay = %mail.api_url, "Sending clock-in emails through the mail relay");
            Arc::new(HttpMailAdapter::new(client, mail.clone()))
        }
        None => {
            warn!("MAIL_API_URL is not set; clock-in emails will only be logged.");
            Arc::new(LogMailAdapter)
        }
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(config.clone(), store, notifier));

    // --- 5. Create the Web Router ---
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    let app = Router::new()
        .merge(router(app_state))
        .layer(cors)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
