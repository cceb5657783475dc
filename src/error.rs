// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message. Internal detail is suppressed outside
    /// development mode.
    pub fn message(&self) -> String {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg) => msg.clone(),
            ApiError::InternalServerError(msg) => {
                if crate::is_development!() {
                    msg.clone()
                } else {
                    "An error occurred while processing your request".to_string()
                }
            }
            ApiError::ServiceUnavailable(msg) => {
                if crate::is_development!() {
                    msg.clone()
                } else {
                    "Service temporarily unavailable".to_string()
                }
            }
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        json!({
            "success": false,
            "error": self.message(),
            "code": self.error_code()
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

// Convert component error types to ApiError
impl From<crate::database::manager::DatabaseError> for ApiError {
    fn from(err: crate::database::manager::DatabaseError) -> Self {
        use crate::database::manager::DatabaseError;
        match err {
            DatabaseError::InvalidTenantName(name) => {
                ApiError::bad_request(format!("Invalid tenant name: {}", name))
            }
            DatabaseError::ConfigMissing(what) => {
                tracing::error!("Missing configuration: {}", what);
                ApiError::service_unavailable(format!("missing configuration: {}", what))
            }
            other => {
                tracing::error!("Database error: {}", other);
                ApiError::internal_server_error(other.to_string())
            }
        }
    }
}

impl From<crate::sites::directory::DirectoryError> for ApiError {
    fn from(err: crate::sites::directory::DirectoryError) -> Self {
        tracing::error!("Site directory error: {}", err);
        ApiError::internal_server_error(err.to_string())
    }
}

impl From<crate::sites::publisher::PublishError> for ApiError {
    fn from(err: crate::sites::publisher::PublishError) -> Self {
        use crate::sites::publisher::PublishError;
        match err {
            PublishError::MissingTemplate => ApiError::bad_request(err.to_string()),
            PublishError::Directory(e) => e.into(),
        }
    }
}

impl From<crate::sites::domain::DomainError> for ApiError {
    fn from(err: crate::sites::domain::DomainError) -> Self {
        use crate::sites::domain::DomainError;
        match err {
            DomainError::SiteNotFound(slug) => {
                ApiError::not_found(format!("Site not found: {}", slug))
            }
            DomainError::NotOwner => ApiError::forbidden("Not the owner of this site"),
            DomainError::InvalidDomain(msg) => {
                ApiError::bad_request(format!("Invalid domain: {}", msg))
            }
            DomainError::Directory(e) => e.into(),
        }
    }
}

impl From<crate::render::pipeline::RenderError> for ApiError {
    fn from(err: crate::render::pipeline::RenderError) -> Self {
        use crate::render::pipeline::RenderError;
        match err {
            // A missing view is a plain not-found, never a generic failure
            RenderError::ViewNotFound { template, page } => {
                ApiError::not_found(format!("Page not found: {}/{}", template, page))
            }
            other => {
                tracing::error!("Render error: {}", other);
                ApiError::internal_server_error(other.to_string())
            }
        }
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(ApiError::not_found("x").status_code(), 404);
        assert_eq!(ApiError::forbidden("x").status_code(), 403);
        assert_eq!(ApiError::bad_request("x").status_code(), 400);
        assert_eq!(ApiError::internal_server_error("x").status_code(), 500);
    }

    #[test]
    fn missing_view_maps_to_not_found() {
        let err: ApiError = crate::render::pipeline::RenderError::ViewNotFound {
            template: "modern".into(),
            page: "nope".into(),
        }
        .into();
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn forbidden_domain_bind_maps_to_403() {
        let err: ApiError = crate::sites::domain::DomainError::NotOwner.into();
        assert_eq!(err.status_code(), 403);
    }
}
