use std::{env, time::Duration};

use url::Url;

const HOST: &str = "0.0.0.0";
const PORT: u16 = 8080;
const BACKEND_API_URL: &str = "http://localhost:5000/api/";
const JWT_SECRET: &str = "default_secret";
const REQUEST_TIMEOUT_SECS: u64 = 15;
const NOTIFICATION_POLL_SECS: u64 = 30;

/// Where `rejected` bookings are counted on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RejectedBucket {
    /// Rejected bookings get their own counter.
    #[default]
    Separate,
    /// Rejected bookings are folded into the cancelled counter.
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a number, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("BACKEND_API_URL is not a valid url: {0}")]
    InvalidBackendUrl(#[from] url::ParseError),
    #[error("REJECTED_BUCKET must be `separate` or `cancelled`, got {0:?}")]
    InvalidRejectedBucket(String),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub backend_url: Url,
    pub jwt_secret: String,
    pub request_timeout: Duration,
    pub notification_poll_interval: Duration,
    pub rejected_bucket: RejectedBucket,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| HOST.to_string());
        let port = parse_number(&lookup, "PORT", PORT)?;

        // Url::join drops the last path segment unless the base ends with a slash
        let mut backend_url = lookup("BACKEND_API_URL").unwrap_or_else(|| BACKEND_API_URL.to_string());
        if !backend_url.ends_with('/') {
            backend_url.push('/');
        }
        let backend_url = Url::parse(&backend_url)?;

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| JWT_SECRET.to_string());
        let request_timeout = Duration::from_secs(parse_number(
            &lookup,
            "REQUEST_TIMEOUT_SECS",
            REQUEST_TIMEOUT_SECS,
        )?);
        let notification_poll_interval = Duration::from_secs(parse_number(
            &lookup,
            "NOTIFICATION_POLL_SECS",
            NOTIFICATION_POLL_SECS,
        )?);

        let rejected_bucket = match lookup("REJECTED_BUCKET") {
            None => RejectedBucket::default(),
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "separate" => RejectedBucket::Separate,
                "cancelled" => RejectedBucket::Cancelled,
                _ => return Err(ConfigError::InvalidRejectedBucket(value)),
            },
        };

        Ok(Self {
            host,
            port,
            backend_url,
            jwt_secret,
            request_timeout,
            notification_poll_interval,
            rejected_bucket,
        })
    }
}

fn parse_number<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { key, value }),
    }
}
