use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use configuration::Config;
use optimizer::Optimizer;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;

/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub optimizer: Optimizer,
}

/// Builds the application routes around an already configured optimizer.
pub fn router(state: Arc<AppState>, body_limit_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any());

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/run-model", post(handlers::run_model))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(body_limit_bytes))
}

/// Configures and runs the web server until the listener fails.
///
/// Tracing is initialized by the calling binary.
pub async fn run_server(addr: SocketAddr, config: &Config) -> anyhow::Result<()> {
    let optimizer = Optimizer::from_config(config);
    tracing::info!(solver = optimizer.solver_name(), "Optimizer ready.");

    let app = router(Arc::new(AppState { optimizer }), config.server.body_limit_bytes);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Resolves `server.host`/`server.port` into a bindable address.
pub fn listen_addr(config: &Config) -> anyhow::Result<SocketAddr> {
    let addr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    Ok(addr)
}
