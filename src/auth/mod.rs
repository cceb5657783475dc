//! Owner identity extraction.
//!
//! Authentication itself is an upstream concern: the gateway in front of
//! this service validates credentials and forwards the verified identity in
//! headers. Handlers that need a caller identity take `OwnerIdentity` as an
//! extractor; missing or malformed headers reject with 401.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::ApiError;
use crate::sites::record::OwnerType;

pub const OWNER_ID_HEADER: &str = "x-owner-id";
pub const OWNER_TYPE_HEADER: &str = "x-owner-type";
pub const OWNER_NAME_HEADER: &str = "x-owner-name";

/// The verified caller: one broker or company operator.
#[derive(Debug, Clone)]
pub struct OwnerIdentity {
    pub id: Uuid,
    pub owner_type: OwnerType,
    pub display_name: String,
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for OwnerIdentity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let id = header(OWNER_ID_HEADER)
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or_else(|| ApiError::unauthorized("Missing or invalid owner identity"))?;
        let owner_type = header(OWNER_TYPE_HEADER)
            .and_then(OwnerType::parse)
            .ok_or_else(|| ApiError::unauthorized("Missing or invalid owner type"))?;
        let display_name = header(OWNER_NAME_HEADER)
            .ok_or_else(|| ApiError::unauthorized("Missing owner name"))?
            .to_string();

        Ok(OwnerIdentity {
            id,
            owner_type,
            display_name,
        })
    }
}
