use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    extract::{ConnectInfo, Multipart, State},
};
use axum_extra::extract::WithRejection;
use tracing::{debug, info, warn};

use contacts_store::{CooldownGate, IdentityRegistry, RequestThrottle};
use contacts_types::api::ContactResponse;

use crate::error::ApiError;
use crate::media::{Avatar, MediaError, MediaStore};
use crate::state::AppState;

/// Periods for the two gates and the bound on the avatar upload.
#[derive(Debug, Clone, Copy)]
pub struct GatePolicy {
    /// Minimum spacing between gated requests from one origin.
    pub throttle_period: Duration,
    /// Minimum spacing between created contacts for one identity.
    pub cooldown_period: Duration,
    pub upload_timeout: Duration,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            throttle_period: Duration::from_secs(60),
            cooldown_period: Duration::from_secs(60),
            upload_timeout: Duration::from_secs(30),
        }
    }
}

/// Guard sequence in front of the avatar upload:
/// origin throttle, then verified identity, then identity cooldown.
///
/// A passed throttle or cooldown stays consumed if a later step fails.
pub struct ContactWorkflow {
    throttle: Arc<dyn RequestThrottle>,
    registry: Arc<dyn IdentityRegistry>,
    cooldown: Arc<dyn CooldownGate>,
    media: Arc<dyn MediaStore>,
    policy: GatePolicy,
}

impl ContactWorkflow {
    pub fn new(
        throttle: Arc<dyn RequestThrottle>,
        registry: Arc<dyn IdentityRegistry>,
        cooldown: Arc<dyn CooldownGate>,
        media: Arc<dyn MediaStore>,
        policy: GatePolicy,
    ) -> Self {
        Self {
            throttle,
            registry,
            cooldown,
            media,
            policy,
        }
    }

    /// Run the guards and upload the avatar. Returns the avatar's public URL.
    pub async fn create(
        &self,
        origin: IpAddr,
        email: &str,
        avatar: Avatar,
    ) -> Result<String, ApiError> {
        self.throttle.try_acquire(origin, self.policy.throttle_period)?;

        if !self.registry.is_verified(email) {
            debug!(email, origin = %origin, "Contact refused: identity not verified");
            return Err(ApiError::Unauthorized);
        }

        if !self.cooldown.try_acquire(email, self.policy.cooldown_period) {
            debug!(email, "Contact refused: cooldown active");
            return Err(ApiError::RateLimited { retry_after: None });
        }

        // No store lock is held past this point.
        let timeout = self.policy.upload_timeout;
        let uploaded = match tokio::time::timeout(timeout, self.media.upload(avatar)).await {
            Ok(Ok(uploaded)) => uploaded,
            Ok(Err(e)) => {
                warn!("Avatar upload for {} failed: {}", email, e);
                return Err(e.into());
            }
            Err(_) => {
                warn!("Avatar upload for {} timed out after {:?}", email, timeout);
                return Err(MediaError::Timeout(timeout).into());
            }
        };

        info!(email, avatar_url = %uploaded.secure_url, "Contact created");
        Ok(uploaded.secure_url)
    }
}

/// Pull `email` and the `avatar` file out of the multipart body.
async fn read_contact_form(mut multipart: Multipart) -> Result<(String, Avatar), ApiError> {
    let mut email = None;
    let mut avatar = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "email" => email = Some(field.text().await?),
            "avatar" => {
                let file_name = field.file_name().map(str::to_owned);
                let data = field.bytes().await?;
                avatar = Some(Avatar { file_name, data });
            }
            _ => {}
        }
    }

    let email = email.ok_or_else(|| ApiError::BadRequest("missing form field `email`".into()))?;
    let avatar =
        avatar.ok_or_else(|| ApiError::BadRequest("missing form field `avatar`".into()))?;
    Ok((email, avatar))
}

/// POST /create_contact — multipart `email` + `avatar`.
pub async fn create_contact(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    WithRejection(multipart, _): WithRejection<Multipart, ApiError>,
) -> Result<Json<ContactResponse>, ApiError> {
    let (email, avatar) = read_contact_form(multipart).await?;
    let avatar_url = state.contacts.create(peer.ip(), &email, avatar).await?;

    Ok(Json(ContactResponse {
        message: "Contact created successfully".into(),
        avatar_url,
    }))
}
