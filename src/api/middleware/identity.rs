//! Caller identity middleware.
//!
//! Reads `X-User-Id` and `X-User-Role`, set by the gateway in front of this
//! service, and injects an [`Identity`] into request extensions. Requests
//! without a usable identity are rejected with 401.

use std::str::FromStr;

use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::api::error::ApiError;
use crate::api::types::{Identity, USER_ID_HEADER, USER_ROLE_HEADER};
use crate::models::UserRole;

pub async fn require_identity(mut req: Request<axum::body::Body>, next: Next) -> Response {
    match identity_from_headers(req.headers()) {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(err) => err.into_response(),
    }
}

pub fn identity_from_headers(headers: &HeaderMap) -> Result<Identity, ApiError> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let user_id = header(USER_ID_HEADER).ok_or(ApiError::Unauthorized)?;
    let role = header(USER_ROLE_HEADER)
        .and_then(|r| UserRole::from_str(&r.to_ascii_lowercase()).ok())
        .ok_or(ApiError::Unauthorized)?;

    Ok(Identity {
        user_id: user_id.to_string(),
        role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn parses_identity() {
        let identity =
            identity_from_headers(&headers(&[("x-user-id", "u1"), ("x-user-role", "Doctor")]))
                .unwrap();
        assert_eq!(identity.user_id, "u1");
        assert_eq!(identity.role, UserRole::Doctor);
    }

    #[test]
    fn missing_or_unknown_values_are_unauthorized() {
        assert!(identity_from_headers(&headers(&[("x-user-role", "patient")])).is_err());
        assert!(identity_from_headers(&headers(&[("x-user-id", "u1")])).is_err());
        assert!(identity_from_headers(&headers(&[
            ("x-user-id", " "),
            ("x-user-role", "patient")
        ]))
        .is_err());
        assert!(matches!(
            identity_from_headers(&headers(&[("x-user-id", "u1"), ("x-user-role", "nurse")])),
            Err(ApiError::Unauthorized)
        ));
    }
}
