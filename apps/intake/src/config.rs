use anyhow::{Context, Result};

/// Default public prefix for `cvUrl` values.
pub const DEFAULT_PUBLIC_BASE_URL: &str = "https://storage.googleapis.com";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    /// Prefix for `cvUrl` values; the bucket and object id are appended.
    pub storage_public_base_url: String,
    /// Email is only sent when both the API key and sender address are set.
    pub sendgrid: Option<SendGridConfig>,
    pub event_queue: String,
    pub worker_concurrency: usize,
    pub max_delivery_attempts: u32,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone)]
pub struct SendGridConfig {
    pub api_key: String,
    pub from_email: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let sendgrid = match (optional_env("SENDGRID_API_KEY"), optional_env("FROM_EMAIL")) {
            (Some(api_key), Some(from_email)) => Some(SendGridConfig {
                api_key,
                from_email,
            }),
            _ => None,
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            storage_public_base_url: optional_env("STORAGE_PUBLIC_BASE_URL")
                .unwrap_or_else(|| DEFAULT_PUBLIC_BASE_URL.to_string()),
            sendgrid,
            event_queue: optional_env("EVENT_QUEUE").unwrap_or_else(|| "cv-events".to_string()),
            worker_concurrency: parse_env("WORKER_CONCURRENCY", 4)?,
            max_delivery_attempts: parse_env("MAX_DELIVERY_ATTEMPTS", 5)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
