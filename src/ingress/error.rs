// src/ingress/error.rs

//! Error type for webhook responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Body of every 404 response.
pub const NOT_FOUND_MESSAGE: &str = "Resource not found on this server";

/// A request the ingress refused, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum IngressError {
    /// Wrong path or method.
    NotFound,
    /// Missing header, bad signature or malformed body.
    BadRequest(String),
    /// The runtime is no longer accepting events.
    Internal(String),
}

impl IngressError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::NotFound => NOT_FOUND_MESSAGE.to_string(),
            Self::BadRequest(msg) => msg.clone(),
            Self::Internal(msg) => format!("Internal server error: {msg}"),
        }
    }
}

impl IntoResponse for IngressError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message() });
        (self.status(), Json(body)).into_response()
    }
}
