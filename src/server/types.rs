//! Data service wire types

use serde::Serialize;

/// Acknowledgement for a successful write
#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub success: bool,
    pub message: String,
}

impl SaveResponse {
    pub fn saved() -> Self {
        Self {
            success: true,
            message: "Data saved successfully".to_string(),
        }
    }
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

/// API error detail
#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: "BAD_REQUEST".to_string(),
                message: message.into(),
            },
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: "INTERNAL_ERROR".to_string(),
                message: message.into(),
            },
        }
    }
}
