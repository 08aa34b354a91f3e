use std::time::Duration;

use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    extract::multipart::{MultipartError, MultipartRejection},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use contacts_store::{InvalidCredential, RetryAfter};
use contacts_types::api::ErrorBody;

use crate::media::MediaError;

/// Every failure a client can observe. Each variant maps to one stable
/// `error` kind and status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid email address")]
    InvalidEmail,
    #[error("Invalid email or token")]
    InvalidCredential,
    #[error("User not registered or not verified")]
    Unauthorized,
    #[error("Too many requests")]
    RateLimited { retry_after: Option<Duration> },
    #[error("Avatar storage is unavailable")]
    UpstreamUnavailable(#[from] MediaError),
    #[error("{0}")]
    BadRequest(String),
    #[error("Request body too large")]
    PayloadTooLarge,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidEmail | ApiError::InvalidCredential | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidEmail => "InvalidEmail",
            ApiError::InvalidCredential => "InvalidCredential",
            ApiError::Unauthorized => "Unauthorized",
            ApiError::RateLimited { .. } => "RateLimited",
            ApiError::UpstreamUnavailable(_) => "UpstreamUnavailable",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::PayloadTooLarge => "PayloadTooLarge",
        }
    }

    /// Body-reading failures: an overflow of the configured body limit keeps
    /// its 413, anything else is the client's malformed input.
    fn from_body_error(status: StatusCode, text: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::BadRequest(text)
        }
    }

    /// Client-facing text. Upstream failure details stay in the logs.
    pub fn detail(&self) -> String {
        match self {
            ApiError::RateLimited {
                retry_after: Some(wait),
            } => format!(
                "Too Many Requests. Try again in {} seconds.",
                wait.as_secs_f64()
            ),
            ApiError::RateLimited { retry_after: None } => {
                "Too Many Requests. Try again later.".into()
            }
            other => other.to_string(),
        }
    }
}

impl From<InvalidCredential> for ApiError {
    fn from(_: InvalidCredential) -> Self {
        ApiError::InvalidCredential
    }
}

impl From<RetryAfter> for ApiError {
    fn from(wait: RetryAfter) -> Self {
        ApiError::RateLimited {
            retry_after: Some(wait.duration()),
        }
    }
}

// Extractor rejections surface as `BadRequest` (or `PayloadTooLarge`) so
// every error shares one body shape.

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::from_body_error(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::from_body_error(err.status(), err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.kind().into(),
            detail: self.detail(),
        });
        let mut response = (self.status(), body).into_response();

        if let ApiError::RateLimited {
            retry_after: Some(wait),
        } = self
        {
            let secs = RetryAfter(wait).as_header_secs();
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::InvalidEmail.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidCredential.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::RateLimited { retry_after: None }.status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::UpstreamUnavailable(MediaError::Timeout(Duration::from_secs(1))).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::PayloadTooLarge.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn test_body_limit_overflow_is_payload_too_large() {
        let err = ApiError::from_body_error(StatusCode::PAYLOAD_TOO_LARGE, "length limit".into());
        assert!(matches!(err, ApiError::PayloadTooLarge));
        assert_eq!(err.kind(), "PayloadTooLarge");

        let err = ApiError::from_body_error(StatusCode::BAD_REQUEST, "bad field".into());
        assert!(matches!(&err, ApiError::BadRequest(text) if text == "bad field"));
    }

    #[test]
    fn test_retry_after_header_only_when_known() {
        let limited: ApiError = RetryAfter(Duration::from_millis(1_500)).into();
        let response = limited.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "2");

        let cooldown = ApiError::RateLimited { retry_after: None }.into_response();
        assert!(cooldown.headers().get(header::RETRY_AFTER).is_none());
    }

    #[test]
    fn test_upstream_detail_is_not_leaked() {
        let err = ApiError::UpstreamUnavailable(MediaError::Status {
            status: 500,
            body: "internal stack trace".into(),
        });
        assert_eq!(err.detail(), "Avatar storage is unavailable");
    }

    #[test]
    fn test_rate_limited_detail_has_subsecond_wait() {
        let err = ApiError::RateLimited {
            retry_after: Some(Duration::from_millis(2_250)),
        };
        assert_eq!(err.detail(), "Too Many Requests. Try again in 2.25 seconds.");
    }
}
