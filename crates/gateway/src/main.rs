//! EnTrust API Gateway
//!
//! The single entry point for all external API requests.
//! Handles:
//! - Authentication and authorization
//! - Rate limiting
//! - Request routing
//! - Observability (logging, metrics)

mod handlers;
mod middleware;

use axum::{
    extract::FromRef,
    routing::{delete, get, patch, post, put},
    Router,
};
use entrust_common::{
    auth::JwtManager,
    config::AppConfig,
    db::DbPool,
    errors::AppError,
    llm::LlmClient,
    metrics,
    storage::StorageFactory,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub jwt: Arc<JwtManager>,
    pub llm: Arc<LlmClient>,
    pub storage: Arc<StorageFactory>,
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = EnvFilter::try_new(&config.observability.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if config.observability.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!("Starting EnTrust API Gateway v{}", entrust_common::VERSION);

    let config = Arc::new(config);

    // Initialize metrics
    metrics::register_metrics();
    let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| AppError::Configuration {
            message: format!("Failed to start metrics exporter: {}", e),
        })?;
    info!("Metrics exporter listening on {}", metrics_addr);

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;

    // JWT signing key is mandatory; there is no insecure default
    let jwt_secret = config
        .auth
        .jwt_secret
        .clone()
        .ok_or_else(|| AppError::Configuration {
            message: "APP__AUTH__JWT_SECRET must be set".to_string(),
        })?;
    let jwt = Arc::new(JwtManager::new(&jwt_secret, config.auth.jwt_expiration_secs));

    // LLM provider client and artifact storage
    let llm = Arc::new(LlmClient::new(&config.llm).await?);
    let storage = Arc::new(StorageFactory::new(&config.storage).await);

    // Create app state
    let state = AppState {
        config: config.clone(),
        db,
        jwt,
        llm,
        storage,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let api_routes = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Authentication
        .route("/auth/login", post(handlers::auth::login))
        // Customer endpoints
        .route("/customers", post(handlers::customers::create_customer))
        .route("/customers", get(handlers::customers::list_customers))
        .route("/customers/{code}", get(handlers::customers::get_customer))
        .route("/customers/{code}", patch(handlers::customers::update_customer))
        .route("/customers/{code}", delete(handlers::customers::delete_customer))
        // User endpoints
        .route("/users", post(handlers::users::create_user))
        .route("/users", get(handlers::users::list_users))
        .route("/users/{id}", patch(handlers::users::update_user))
        // Question and survey endpoints
        .route("/questions", get(handlers::surveys::list_questions))
        .route("/questions", post(handlers::surveys::create_question))
        .route("/surveys", post(handlers::surveys::create_survey))
        .route("/surveys/{id}", get(handlers::surveys::get_survey))
        .route("/surveys/{id}/responses", put(handlers::surveys::upsert_responses))
        .route("/surveys/{id}/submit", post(handlers::surveys::submit_survey))
        // LLM configuration endpoints (admin only)
        .route("/llm-configs", post(handlers::llm_configs::create_config))
        .route("/llm-configs", get(handlers::llm_configs::list_configs))
        .route(
            "/llm-configs/{id}/activate",
            post(handlers::llm_configs::activate_config),
        )
        // Standards knowledge base (admin only)
        .route("/standards", post(handlers::standards::ingest_standard))
        // Report endpoints
        .route(
            "/customers/{code}/reports",
            post(handlers::reports::generate_reports),
        )
        .route("/customers/{code}/reports", get(handlers::reports::list_reports))
        .route(
            "/customers/{code}/reports/{dimension}/{date}/download",
            get(handlers::reports::download_report),
        );

    // Compose the app
    let mut app = Router::new()
        .nest("/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(middleware::metrics::track_requests))
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id);

    if state.config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(
            state.config.rate_limit.requests_per_second,
            state.config.rate_limit.burst,
        );
        app = app.layer(axum::middleware::from_fn(move |request, next| {
            let limiter = limiter.clone();
            async move {
                middleware::rate_limit::rate_limit_middleware(request, next, limiter).await
            }
        }));
    }

    app.with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
