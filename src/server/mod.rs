//! HTTP API over the [`Distiller`](crate::Distiller).
//!
//! | Route | Method | Handler |
//! |---|---|---|
//! | `/api/v1/extract-text` | POST | [`routes::summarize_handler`] |
//! | `/api/v1/summarize` | POST | [`routes::summarize_handler`] |
//! | `/api/v1/generate-questions` | POST | [`routes::generate_questions_handler`] |
//! | `/api/v1/academic-assistant` | POST | [`routes::academic_assistant_handler`] |
//! | `/api/v1/test` | GET | [`routes::test_handler`] |
//! | `/health` | GET | [`routes::health_handler`] |
//!
//! # Example
//!
//! ```ignore
//! use docdistill::server::{AppState, Server, ServerConfig};
//!
//! let state = AppState::new(distiller, ServerConfig::default());
//! Server::new(state).run().await?;
//! ```

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::{Profile, ServerConfig};
pub use error::{Result, ServerError};
pub use state::AppState;

use std::net::SocketAddr;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The docdistill HTTP server.
pub struct Server {
    state: AppState,
}

impl Server {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .route("/health", get(routes::health_handler))
            .nest("/api/v1", Self::api_routes())
            .layer(DefaultBodyLimit::max(self.state.config.max_upload_bytes))
            .layer(TraceLayer::new_for_http());

        if let Some(cors) = self.state.config.cors_layer() {
            router = router.layer(cors);
        }

        router.with_state(self.state.clone())
    }

    fn api_routes() -> Router<AppState> {
        Router::new()
            .route("/extract-text", post(routes::summarize_handler))
            .route("/summarize", post(routes::summarize_handler))
            .route("/generate-questions", post(routes::generate_questions_handler))
            .route("/academic-assistant", post(routes::academic_assistant_handler))
            .route("/test", get(routes::test_handler))
    }

    /// Serve until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        let addr = self.bind_address();
        let router = self.router();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind {}: {}", addr, e)))?;
        info!(
            "Listening on {} (profile: {})",
            addr, self.state.config.profile
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        info!("Server stopped");
        Ok(())
    }

    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
