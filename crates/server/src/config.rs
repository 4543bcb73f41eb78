use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const DEFAULT_JWT_SECRET: &str = "change-me-in-production";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_expiry_hours: u64,
    /// How long the `is_admin` claim embedded in a token is trusted before
    /// the user row is consulted again
    #[serde(default = "default_claim_ttl")]
    pub claim_ttl_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Local,
    S3,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Root directory for the local backend
    #[serde(default = "default_storage_root")]
    pub root: String,
    /// Prefix of every public object URL
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom S3 endpoint (MinIO, R2, ...)
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i64,
    /// Exhausted jobs queued longer ago than this are dropped from the queue
    #[serde(default = "default_abandoned_retention_days")]
    pub abandoned_retention_days: i64,
}

fn default_claim_ttl() -> u64 { 60 }
fn default_storage_root() -> String { "./data/media".to_string() }
fn default_public_base_url() -> String { "http://localhost:8080/media".to_string() }
fn default_bucket() -> String { "session-media".to_string() }
fn default_region() -> String { "us-east-1".to_string() }
fn default_sweep_interval() -> u64 { 300 }
fn default_max_attempts() -> i64 { 5 }
fn default_abandoned_retention_days() -> i64 { 30 }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            root: default_storage_root(),
            public_base_url: default_public_base_url(),
            bucket: default_bucket(),
            region: default_region(),
            endpoint: None,
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval(),
            max_attempts: default_max_attempts(),
            abandoned_retention_days: default_abandoned_retention_days(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                path: "./data/flowstate.db".to_string(),
            },
            auth: AuthConfig {
                jwt_secret: DEFAULT_JWT_SECRET.to_string(),
                token_expiry_hours: 24,
                claim_ttl_secs: default_claim_ttl(),
            },
            storage: StorageConfig::default(),
            cleanup: CleanupConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;

        if let Ok(secret) = std::env::var("FLOWSTATE_JWT_SECRET") {
            config.auth.jwt_secret = secret;
        }
        if config.auth.jwt_secret == DEFAULT_JWT_SECRET {
            tracing::warn!("Using the default JWT secret, set FLOWSTATE_JWT_SECRET in production");
        }

        Ok(config)
    }

    fn load_file() -> Result<Self> {
        // Try to load from environment variable
        if let Ok(path) = std::env::var("FLOWSTATE_CONFIG") {
            return Self::load_from_path(&PathBuf::from(path));
        }

        let default_paths = vec![
            PathBuf::from("flowstate-server.toml"),
            PathBuf::from("config/flowstate-server.toml"),
            PathBuf::from("/etc/flowstate/server.toml"),
        ];

        for path in default_paths {
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        tracing::warn!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_path(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_file_fills_optional_sections() {
        let config: Config = toml::from_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [database]
            path = "/tmp/fs.db"

            [auth]
            jwt_secret = "s3cret"
            token_expiry_hours = 12
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.auth.claim_ttl_secs, 60);
        assert_eq!(config.storage.backend, StorageBackend::Local);
        assert_eq!(config.cleanup.max_attempts, 5);
        assert_eq!(config.cleanup.abandoned_retention_days, 30);
    }

    #[test]
    fn test_s3_backend_section() {
        let config: Config = toml::from_str(
            r#"
            [server]
            host = "0.0.0.0"
            port = 8080

            [database]
            path = "db.sqlite"

            [auth]
            jwt_secret = "x"
            token_expiry_hours = 1

            [storage]
            backend = "s3"
            bucket = "classes"
            public_base_url = "https://cdn.example.com"
            endpoint = "http://minio:9000"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.backend, StorageBackend::S3);
        assert_eq!(config.storage.bucket, "classes");
        assert_eq!(config.storage.endpoint.as_deref(), Some("http://minio:9000"));
        assert_eq!(config.storage.region, "us-east-1");
    }
}
