use serde::{Deserialize, Serialize};

// -- Registration --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
}

/// Query parameters of `POST /verify`.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    pub email: String,
    pub token: String,
}

/// Plain acknowledgement returned by `/register` and `/verify`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// -- Contacts --

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactResponse {
    pub message: String,
    pub avatar_url: String,
}

// -- Errors --

/// Body of every non-2xx response. `error` is the stable kind, `detail` is
/// meant for humans.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
}
