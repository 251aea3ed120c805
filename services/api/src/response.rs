//! Uniform success envelope for API responses
//!
//! Every successful endpoint wraps its payload as
//! `{"status": <code>, "data": <payload>, "message": <text>}` alongside the
//! literal HTTP status code.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Success envelope carried by every 2xx (and the empty-list 404) response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: u16,
    pub data: T,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create an envelope for an arbitrary status code
    pub fn new(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            data,
            message: message.into(),
        }
    }

    /// 200 OK envelope
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, data, message)
    }

    /// 201 Created envelope
    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CREATED, data, message)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        // status was built from a StatusCode, so the round trip cannot fail
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let response = ApiResponse::ok(vec![1, 2, 3], "Fetched");
        let value = serde_json::to_value(&response).expect("serialization failed");

        assert_eq!(value["status"], 200);
        assert_eq!(value["data"], serde_json::json!([1, 2, 3]));
        assert_eq!(value["message"], "Fetched");
    }

    #[test]
    fn test_created_status() {
        let response = ApiResponse::created((), "User registered successfully");
        assert_eq!(response.status, 201);
    }
}
