use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
};
use axum_extra::extract::WithRejection;
use tracing::{debug, info};

use contacts_store::IdentityRegistry;
use contacts_types::api::{MessageResponse, RegisterRequest, VerifyParams};
use contacts_types::email::is_valid_email;
use contacts_types::models::IdentityStatus;

use crate::error::ApiError;
use crate::notify::NotificationDispatcher;
use crate::state::AppState;

/// Drives `Unregistered -> Unverified -> Verified` and hands new tokens to
/// the notification worker.
pub struct VerificationWorkflow {
    registry: Arc<dyn IdentityRegistry>,
    dispatcher: NotificationDispatcher,
}

impl VerificationWorkflow {
    pub fn new(registry: Arc<dyn IdentityRegistry>, dispatcher: NotificationDispatcher) -> Self {
        Self {
            registry,
            dispatcher,
        }
    }

    /// Register (or re-register) `email`. Delivery of the token is queued
    /// and never affects the result.
    pub fn register(&self, email: &str) -> Result<(), ApiError> {
        if !is_valid_email(email) {
            debug!(email, "Rejected registration with malformed email");
            return Err(ApiError::InvalidEmail);
        }

        let token = self.registry.register(email);
        self.dispatcher.dispatch(email, token);

        info!(email, "User registered");
        Ok(())
    }

    pub fn verify(&self, email: &str, token: &str) -> Result<(), ApiError> {
        self.registry.verify(email, token).map_err(|e| {
            debug!(email, "Verification failed");
            ApiError::from(e)
        })?;

        info!(email, "Email verified");
        Ok(())
    }

    pub fn status(&self, email: &str) -> IdentityStatus {
        self.registry.status(email)
    }
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.verification.register(&req.email)?;
    Ok(Json(MessageResponse::new(
        "User registered successfully. Verification email sent.",
    )))
}

/// POST /verify?email=..&token=..
pub async fn verify(
    State(state): State<AppState>,
    WithRejection(Query(params), _): WithRejection<Query<VerifyParams>, ApiError>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.verification.verify(&params.email, &params.token)?;
    Ok(Json(MessageResponse::new("Email verified successfully")))
}
