use std::time::Duration;

use anyhow::{Context, Result, anyhow};

use contacts_api::contacts::GatePolicy;
use contacts_api::media::CloudinaryConfig;

/// Which browser origins may call the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsPolicy {
    /// `*`: any origin, credentials not allowed.
    Any,
    /// Explicit origins, credentials allowed.
    Origins(Vec<String>),
}

/// Process configuration, read once at startup.
pub struct Config {
    pub host: String,
    pub port: u16,
    pub policy: GatePolicy,
    pub max_avatar_bytes: usize,
    pub cors: CorsPolicy,
    pub cloudinary: CloudinaryConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let secs = |key: &str, default: &str| -> Result<Duration> {
            let raw = var(key, default);
            let secs: u64 = raw
                .parse()
                .with_context(|| format!("{} is not a number of seconds: {:?}", key, raw))?;
            Ok(Duration::from_secs(secs))
        };
        let required = |key: &str| -> Result<String> {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| anyhow!("{} must be set", key))
        };

        let host = var("CONTACTS_HOST", "0.0.0.0");
        let port: u16 = var("CONTACTS_PORT", "8000")
            .parse()
            .context("CONTACTS_PORT is not a valid port")?;

        let policy = GatePolicy {
            throttle_period: secs("CONTACTS_THROTTLE_SECS", "60")?,
            cooldown_period: secs("CONTACTS_COOLDOWN_SECS", "60")?,
            upload_timeout: secs("CONTACTS_UPLOAD_TIMEOUT_SECS", "30")?,
        };

        let max_avatar_bytes: usize = var("CONTACTS_MAX_AVATAR_BYTES", "10485760")
            .parse()
            .context("CONTACTS_MAX_AVATAR_BYTES is not a byte count")?;

        let cors = parse_cors(&var("CONTACTS_CORS_ORIGINS", "*"));

        let cloudinary = CloudinaryConfig {
            cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
            api_key: required("CLOUDINARY_API_KEY")?,
            api_secret: required("CLOUDINARY_API_SECRET")?,
        };

        Ok(Self {
            host,
            port,
            policy,
            max_avatar_bytes,
            cors,
            cloudinary,
        })
    }
}

fn parse_cors(raw: &str) -> CorsPolicy {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_owned)
        .collect();

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        CorsPolicy::Any
    } else {
        CorsPolicy::Origins(origins)
    }
}
