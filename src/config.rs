/// Configuration management for Clipstream
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub search: SearchConfig,
    pub staging: StagingConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Externally reachable base URL, used to build upload locations
    pub public_url: String,
    /// Deadline applied to every core operation invoked over HTTP
    pub request_timeout: Duration,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    pub object_directory: PathBuf,
    /// Lifetime of a signed upload location
    pub upload_url_ttl: Duration,
    /// HMAC key for upload location signatures
    pub upload_signing_secret: String,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// User ids treated as administrators without a stored role (comma-separated)
    pub admin_uids: Vec<String>,
}

/// Search index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub enabled: bool,
    pub base_url: String,
    pub videos_index: String,
    pub users_index: String,
    /// Deadline for a single detached index notification
    pub notify_timeout: Duration,
}

/// Staged upload lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingConfig {
    /// Staged rows older than this are considered abandoned
    pub ttl: Duration,
    pub sweep_interval: Duration,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_secs(key: &str, default: u64) -> Duration {
    Duration::from_secs(
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default),
    )
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env_or("CLIPSTREAM_HOSTNAME", "localhost");
        let port: u16 = env_or("CLIPSTREAM_PORT", "8080")
            .parse()
            .map_err(|_| AppError::InvalidArgument("Invalid port number".to_string()))?;
        let public_url = env::var("CLIPSTREAM_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", hostname, port));
        let request_timeout = env_secs("CLIPSTREAM_REQUEST_TIMEOUT_SECS", 10);

        let data_directory: PathBuf = env_or("CLIPSTREAM_DATA_DIRECTORY", "./data").into();
        let database = env::var("CLIPSTREAM_DATABASE_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("clipstream.sqlite"));
        let object_directory = env::var("CLIPSTREAM_OBJECT_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("objects"));
        let upload_url_ttl = env_secs("CLIPSTREAM_UPLOAD_URL_TTL_SECS", 20 * 60);
        let upload_signing_secret = env::var("CLIPSTREAM_UPLOAD_SIGNING_SECRET")
            .map_err(|_| AppError::InvalidArgument("Upload signing secret required".to_string()))?;

        let jwt_secret = env::var("CLIPSTREAM_JWT_SECRET")
            .map_err(|_| AppError::InvalidArgument("JWT secret required".to_string()))?;

        // Parse admin ids from comma-separated list
        let admin_uids = env_or("CLIPSTREAM_ADMIN_UIDS", "")
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<String>>();

        let search_enabled = env_or("CLIPSTREAM_SEARCH_ENABLED", "false")
            .parse()
            .unwrap_or(false);
        let search_base_url = env_or("CLIPSTREAM_SEARCH_URL", "http://localhost:9200");

        let log_level = env_or("RUST_LOG", "info");

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                public_url,
                request_timeout,
            },
            storage: StorageConfig {
                data_directory,
                database,
                object_directory,
                upload_url_ttl,
                upload_signing_secret,
            },
            authentication: AuthConfig {
                jwt_secret,
                admin_uids,
            },
            search: SearchConfig {
                enabled: search_enabled,
                base_url: search_base_url,
                videos_index: env_or("CLIPSTREAM_SEARCH_VIDEOS_INDEX", "videos"),
                users_index: env_or("CLIPSTREAM_SEARCH_USERS_INDEX", "users"),
                notify_timeout: env_secs("CLIPSTREAM_SEARCH_TIMEOUT_SECS", 15),
            },
            staging: StagingConfig {
                ttl: env_secs("CLIPSTREAM_STAGING_TTL_SECS", 24 * 3600),
                sweep_interval: env_secs("CLIPSTREAM_STAGING_SWEEP_INTERVAL_SECS", 3600),
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AppError::InvalidArgument("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(AppError::InvalidArgument(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if self.storage.upload_signing_secret.len() < 32 {
            return Err(AppError::InvalidArgument(
                "Upload signing secret must be at least 32 characters".to_string(),
            ));
        }

        if self.staging.sweep_interval.is_zero() || self.service.request_timeout.is_zero() {
            return Err(AppError::InvalidArgument(
                "Sweep interval and request timeout must be non-zero".to_string(),
            ));
        }

        // Staged rows must outlive the upload locations handed out for them
        if self.staging.ttl.is_zero() || self.staging.ttl < self.storage.upload_url_ttl {
            return Err(AppError::InvalidArgument(
                "Staging TTL must be at least the upload URL TTL".to_string(),
            ));
        }

        Ok(())
    }

    /// Configuration rooted at a scratch directory, for tests
    #[doc(hidden)]
    pub fn for_tests(data_directory: &std::path::Path) -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 8080,
                public_url: "http://localhost:8080".to_string(),
                request_timeout: Duration::from_secs(10),
            },
            storage: StorageConfig {
                data_directory: data_directory.to_path_buf(),
                database: data_directory.join("clipstream.sqlite"),
                object_directory: data_directory.join("objects"),
                upload_url_ttl: Duration::from_secs(20 * 60),
                upload_signing_secret: "test-upload-signing-secret-0123456789".to_string(),
            },
            authentication: AuthConfig {
                jwt_secret: "test-jwt-secret-0123456789abcdefghijkl".to_string(),
                admin_uids: vec!["root".to_string()],
            },
            search: SearchConfig {
                enabled: false,
                base_url: "http://localhost:9200".to_string(),
                videos_index: "videos".to_string(),
                users_index: "users".to_string(),
                notify_timeout: Duration::from_secs(1),
            },
            staging: StagingConfig {
                ttl: Duration::from_secs(24 * 3600),
                sweep_interval: Duration::from_secs(3600),
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
            },
        }
    }
}
