//! Application settings from environment variables (optionally a `.env` file).

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_PASSWORD_LENGTH: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

impl std::str::FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::Invalid {
                key: "APP_ENV",
                reason: format!("'{}' (expected Development or Production)", other),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    S3 { bucket: String },
}

#[derive(Clone, Debug)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Folder (under the web root for local storage, key prefix for S3) holding uploaded files.
    pub user_content_folder: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub environment: Environment,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    pub web_root: PathBuf,
    pub storage: StorageSettings,
    pub max_upload_bytes: usize,
    pub password_required_length: usize,
}

impl AppConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. `DATABASE_URL` is required; everything else has a default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::MissingConnectionString)?;

        let environment = match get("APP_ENV") {
            Some(v) => v.parse()?,
            None => Environment::Production,
        };

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.into())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let max_connections = parse_or("DATABASE_MAX_CONNECTIONS", get("DATABASE_MAX_CONNECTIONS"), DEFAULT_MAX_CONNECTIONS)?;
        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "DATABASE_MAX_CONNECTIONS",
                reason: "must be at least 1".into(),
            });
        }

        let web_root = PathBuf::from(get("WEB_ROOT").unwrap_or_else(|| "wwwroot".into()));
        let user_content_folder = get("USER_CONTENT_FOLDER").unwrap_or_else(|| "user-content".into());
        let backend = match get("STORAGE_BACKEND").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("local") => StorageBackend::Local,
            Some("s3") => StorageBackend::S3 {
                bucket: get("S3_BUCKET").ok_or(ConfigError::Missing("S3_BUCKET"))?,
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "STORAGE_BACKEND",
                    reason: format!("'{}' (expected local or s3)", other),
                })
            }
        };

        let max_upload_bytes = parse_or("MAX_UPLOAD_BYTES", get("MAX_UPLOAD_BYTES"), DEFAULT_MAX_UPLOAD_BYTES)?;
        let password_required_length =
            parse_or("PASSWORD_REQUIRED_LENGTH", get("PASSWORD_REQUIRED_LENGTH"), DEFAULT_PASSWORD_LENGTH)?;

        Ok(AppConfig {
            database_url,
            environment,
            bind_addr,
            max_connections,
            web_root,
            storage: StorageSettings {
                backend,
                user_content_folder,
            },
            max_upload_bytes,
            password_required_length,
        })
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(v) => v.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
    }
}
