//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, GoogleBooksAdapter, OpenLibraryAdapter},
    config::Config,
    error::ApiError,
    web::{
        create_box_handler, feed_ws_handler, get_book_handler, list_books_handler,
        list_box_books_handler, list_boxes_handler, rest::ApiDoc, scan_ws_handler,
        state::AppState,
    },
};
use axum::http::{header::{ACCEPT, CONTENT_TYPE}, HeaderValue, Method};
use axum::{routing::get, Router};
use book_scanner_core::MetadataResolver;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Catalog Adapters ---
    let http_client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
    let resolver = MetadataResolver::new(
        Arc::new(OpenLibraryAdapter::new(
            http_client.clone(),
            config.open_library_url.clone(),
        )),
        Arc::new(GoogleBooksAdapter::new(
            http_client,
            config.google_books_url.clone(),
        )),
    );
    info!(
        global_rate = ?config.gate.global_rate,
        dedup_window = ?config.gate.dedup_window,
        post_accept_lock = ?config.gate.post_accept_lock,
        "Scan gate configured."
    );

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        config: config.clone(),
        resolver,
    });

    let cors_origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS_ORIGIN '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    let api_router = Router::new()
        .route("/boxes", get(list_boxes_handler).post(create_box_handler))
        .route("/boxes/{name}/books", get(list_box_books_handler))
        .route("/books", get(list_books_handler))
        .route("/books/{id}", get(get_book_handler))
        .route("/ws/scan", get(scan_ws_handler))
        .route("/ws/books", get(feed_ws_handler))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
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
