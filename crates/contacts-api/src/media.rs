use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use thiserror::Error;
use tracing::{debug, warn};

/// Avatar file as received from the client. Not inspected or validated.
#[derive(Debug, Clone)]
pub struct Avatar {
    pub file_name: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Clone)]
pub struct UploadedMedia {
    pub secure_url: String,
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("media store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("media store returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed media store response: {0}")]
    MalformedResponse(String),
    #[error("media upload timed out after {0:?}")]
    Timeout(Duration),
}

/// External object store holding avatar images.
///
/// Implementations must not retry internally; a failed upload is reported
/// to the caller as-is.
#[async_trait]
pub trait MediaStore: Send + Sync + 'static {
    async fn upload(&self, avatar: Avatar) -> Result<UploadedMedia, MediaError>;
}

// ── Cloudinary ──────────────────────────────────────────────────────────

const CLOUDINARY_API: &str = "https://api.cloudinary.com/v1_1";

/// Credentials for signed Cloudinary uploads.
#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Deserialize)]
struct CloudinaryUploadResponse {
    secure_url: Option<String>,
}

/// Signed image upload to Cloudinary's REST API.
pub struct CloudinaryStore {
    client: Client,
    config: CloudinaryConfig,
    endpoint: String,
}

impl CloudinaryStore {
    pub fn new(config: CloudinaryConfig, timeout: Duration) -> Result<Self, MediaError> {
        let client = Client::builder().timeout(timeout).build()?;
        let endpoint = format!("{}/{}/image/upload", CLOUDINARY_API, config.cloud_name);
        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    /// Point uploads at a different base URL (e.g. a regional API host).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Cloudinary request signature: SHA-1 over the sorted signed parameters
/// followed by the API secret. Only `timestamp` is signed here.
pub fn upload_signature(timestamp: i64, api_secret: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("timestamp={}{}", timestamp, api_secret).as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl MediaStore for CloudinaryStore {
    async fn upload(&self, avatar: Avatar) -> Result<UploadedMedia, MediaError> {
        let timestamp = chrono::Utc::now().timestamp();
        let signature = upload_signature(timestamp, &self.config.api_secret);
        let size = avatar.data.len();

        // Cloudinary detects the image type from the bytes.
        let file = Part::bytes(avatar.data.to_vec())
            .file_name(avatar.file_name.unwrap_or_else(|| "avatar".into()));

        let form = Form::new()
            .part("file", file)
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp.to_string())
            .text("signature", signature);

        let resp = self.client.post(&self.endpoint).multipart(form).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("Cloudinary upload rejected ({}): {}", status, body);
            return Err(MediaError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: CloudinaryUploadResponse = resp
            .json()
            .await
            .map_err(|e| MediaError::MalformedResponse(e.to_string()))?;

        let secure_url = payload
            .secure_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| MediaError::MalformedResponse("missing secure_url".into()))?;

        debug!("Uploaded {} byte avatar to {}", size, secure_url);
        Ok(UploadedMedia { secure_url })
    }
}
