//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        Argon2Hasher, DbAdapter, GeminiResearchAdapter, InMemoryDb, JwtTokenAdapter,
        PdfReportRenderer,
    },
    config::Config,
    error::ApiError,
    web::{build_router, AppState},
};
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use libre_research_core::ports::DatabaseService;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    let db: Arc<dyn DatabaseService> = match &config.database_url {
        Some(url) => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
            let db_adapter = DbAdapter::new(db_pool);
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(db_adapter)
        }
        None => {
            warn!("DATABASE_URL is not set; using the in-memory store. Data will not survive a restart.");
            Arc::new(InMemoryDb::new())
        }
    };

    // --- 3. Initialize Service Adapters ---
    let client = GeminiResearchAdapter::client_for(&config.research_api_base, &config.gemini_api_key);
    let research = Arc::new(GeminiResearchAdapter::new(
        client,
        config.research_model.clone(),
        config.research_timeout,
    ));
    let tokens = Arc::new(JwtTokenAdapter::new(&config.jwt_secret, config.access_token_ttl));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState::new(
        db,
        research,
        Arc::new(PdfReportRenderer::new()),
        Arc::new(Argon2Hasher::new()),
        tokens,
    ));

    // --- 5. Create the Web Router ---
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);
    // A wildcard cannot be combined with credentials.
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins = config
            .cors_origins
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .map_err(|e| ApiError::Internal(format!("Invalid CORS origin '{}': {}", o, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        cors.allow_origin(origins).allow_credentials(true)
    };

    let app = build_router(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

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
