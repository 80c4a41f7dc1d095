// HTTP error types for the gateway's own responses
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

/// Gateway error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum GatewayError {
    // 400 Bad Request
    BadRequest(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 502 Bad Gateway (upstream unreachable or misbehaving)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl GatewayError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::BadRequest(_) => 400,
            GatewayError::NotFound(_) => 404,
            GatewayError::InternalServerError(_) => 500,
            GatewayError::BadGateway(_) => 502,
            GatewayError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            GatewayError::BadRequest(msg) => msg,
            GatewayError::NotFound(msg) => msg,
            GatewayError::InternalServerError(msg) => msg,
            GatewayError::BadGateway(msg) => msg,
            GatewayError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            GatewayError::BadRequest(_) => "BAD_REQUEST",
            GatewayError::NotFound(_) => "NOT_FOUND",
            GatewayError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            GatewayError::BadGateway(_) => "BAD_GATEWAY",
            GatewayError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "error": true,
            "message": self.message(),
            "code": self.error_code()
        })
    }
}

// Static constructor methods
impl GatewayError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        GatewayError::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        GatewayError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        GatewayError::InternalServerError(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        GatewayError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        GatewayError::ServiceUnavailable(message.into())
    }
}

// Standard error trait implementations
impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for GatewayError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}
