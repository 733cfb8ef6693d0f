// Graph status API server entry point

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http::{header, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use graph_status_api::clients::HttpStatusSource;
use graph_status_api::config::{ApiConfig, SourcesConfig};
use graph_status_api::handlers::{router, AppContext};
use graph_status_api::services::GraphStatusService;

fn load_env() {
    dotenv::dotenv().ok();
}

#[tokio::main]
async fn main() {
    load_env();
    // Configure logging with tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load API configuration from environment
    let config = ApiConfig::from_env();
    tracing::info!("Configuration loaded");

    let sources = SourcesConfig::load(&config.sources_path).expect("Failed to load sources file");
    tracing::info!(
        "Loaded {} sources ({} enabled) from {}",
        sources.sources.len(),
        sources.enabled_sources().len(),
        config.sources_path
    );

    let api_key = config
        .api_key_override
        .clone()
        .unwrap_or_else(|| sources.api_key.clone());
    if api_key.is_empty() {
        tracing::warn!("No Graph API key configured; gateway queries will be rejected");
    }

    let status_source =
        HttpStatusSource::new(&config, api_key).expect("Failed to create HTTP client");
    let status = Arc::new(GraphStatusService::new(Arc::new(status_source)));
    let app_state = Arc::new(AppContext { sources, status });

    // Configure CORS policy
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN])
        .expose_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    let app = router(app_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // Parse server address from config
    let addr: SocketAddr = config.server_addr().parse().expect("Invalid address");

    // Start HTTP server
    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
