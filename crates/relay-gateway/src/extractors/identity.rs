//! Caller identity extractor
//!
//! Authentication happens upstream; the gateway receives the resolved
//! member id in the `x-member-id` header. Browsers cannot set headers on a
//! WebSocket upgrade, so the `member_id` query parameter is accepted too.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use relay_core::Snowflake;
use serde::Deserialize;

use crate::response::ApiError;

pub const MEMBER_ID_HEADER: &str = "x-member-id";

/// Member on whose behalf the request is made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberIdentity {
    pub member_id: Snowflake,
}

#[derive(Debug, Deserialize)]
struct IdentityQuery {
    member_id: Option<String>,
}

impl MemberIdentity {
    fn from_parts(parts: &Parts) -> Result<Self, ApiError> {
        let raw = match parts.headers.get(MEMBER_ID_HEADER) {
            Some(value) => value
                .to_str()
                .map_err(|_| ApiError::InvalidIdentity("header is not valid text".to_string()))?
                .to_string(),
            None => Query::<IdentityQuery>::try_from_uri(&parts.uri)
                .ok()
                .and_then(|Query(query)| query.member_id)
                .ok_or(ApiError::MissingIdentity)?,
        };

        let member_id = Snowflake::parse(&raw).map_err(|e| ApiError::InvalidIdentity(e.to_string()))?;
        Ok(Self { member_id })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MemberIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_parts(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(request: Request<()>) -> Parts {
        request.into_parts().0
    }

    #[test]
    fn test_header_identity() {
        let parts = parts(
            Request::builder()
                .uri("/api/v1/rooms/1")
                .header(MEMBER_ID_HEADER, "42")
                .body(())
                .unwrap(),
        );
        assert_eq!(
            MemberIdentity::from_parts(&parts).unwrap().member_id,
            Snowflake::new(42)
        );
    }

    #[test]
    fn test_query_identity_for_upgrades() {
        let parts = parts(Request::builder().uri("/ws/rooms/1?member_id=7").body(()).unwrap());
        assert_eq!(
            MemberIdentity::from_parts(&parts).unwrap().member_id,
            Snowflake::new(7)
        );
    }

    #[test]
    fn test_header_wins_over_query() {
        let parts = parts(
            Request::builder()
                .uri("/ws/rooms/1?member_id=7")
                .header(MEMBER_ID_HEADER, "8")
                .body(())
                .unwrap(),
        );
        assert_eq!(
            MemberIdentity::from_parts(&parts).unwrap().member_id,
            Snowflake::new(8)
        );
    }

    #[test]
    fn test_missing_and_invalid_identity() {
        let missing = parts(Request::builder().uri("/api/v1/rooms/1").body(()).unwrap());
        assert!(matches!(
            MemberIdentity::from_parts(&missing),
            Err(ApiError::MissingIdentity)
        ));

        let invalid = parts(
            Request::builder()
                .uri("/api/v1/rooms/1")
                .header(MEMBER_ID_HEADER, "alice")
                .body(())
                .unwrap(),
        );
        assert!(matches!(
            MemberIdentity::from_parts(&invalid),
            Err(ApiError::InvalidIdentity(_))
        ));
    }
}
