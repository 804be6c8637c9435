//! Server configuration.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// Default upload limit (25 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Deployment profile. Only affects the CORS default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Profile {
    #[default]
    Development,
    Testing,
    Production,
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Profile::Development),
            "testing" | "test" => Ok(Profile::Testing),
            "production" | "prod" => Ok(Profile::Production),
            other => Err(format!(
                "unknown profile '{other}' (expected development, testing or production)"
            )),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Profile::Development => "development",
            Profile::Testing => "testing",
            Profile::Production => "production",
        })
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Allowed CORS origin. `"*"` allows any origin.
    pub cors_origin: Option<String>,

    /// Maximum multipart body size in bytes.
    pub max_upload_bytes: usize,

    pub profile: Profile,

    /// Directory for staged uploads. `None` uses the system temp directory.
    pub upload_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 5678)),
            cors_origin: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            profile: Profile::default(),
            upload_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn new(bind_address: SocketAddr) -> Self {
        Self {
            bind_address,
            ..Self::default()
        }
    }

    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origin = Some(origin.into());
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = Some(dir.into());
        self
    }

    /// CORS layer for this configuration, or `None` when cross-origin
    /// requests are not allowed at all.
    ///
    /// Development and testing allow any origin unless one is configured.
    /// Production only allows the configured origin.
    pub fn cors_layer(&self) -> Option<CorsLayer> {
        match self.cors_origin.as_deref().map(str::trim) {
            Some("*") => Some(CorsLayer::permissive()),
            Some(origin) if !origin.is_empty() => match HeaderValue::from_str(origin) {
                Ok(value) => Some(
                    CorsLayer::new()
                        .allow_origin(value)
                        .allow_methods([Method::GET, Method::POST])
                        .allow_headers(Any),
                ),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin '{}'", origin);
                    self.profile_default_cors()
                }
            },
            _ => self.profile_default_cors(),
        }
    }

    fn profile_default_cors(&self) -> Option<CorsLayer> {
        match self.profile {
            Profile::Production => None,
            Profile::Development | Profile::Testing => Some(CorsLayer::permissive()),
        }
    }
}
