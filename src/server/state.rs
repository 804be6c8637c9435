//! Application state shared across handlers.

use std::sync::Arc;

use super::config::ServerConfig;
use crate::distill::Distiller;

/// Application state shared across all handlers.
///
/// Everything is immutable after startup; handlers only clone the `Arc`s.
#[derive(Debug, Clone)]
pub struct AppState {
    pub distiller: Arc<Distiller>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(distiller: Distiller, config: ServerConfig) -> Self {
        Self {
            distiller: Arc::new(distiller),
            config: Arc::new(config),
        }
    }
}
