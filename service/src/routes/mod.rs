//! Request handlers.

pub mod admin;
pub mod contact;

use std::net::SocketAddr;

use axum::extract::rejection::JsonRejection;
use axum::http::HeaderMap;
use axum::Json;

use crate::ApiError;

pub async fn healthz() -> &'static str {
    "ok"
}

/// Origin used for rate limiting: the peer address, or the first
/// `X-Forwarded-For` hop when the deployment sits behind a trusted proxy.
pub fn client_origin(headers: &HeaderMap, peer: SocketAddr, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty());
        if let Some(hop) = forwarded {
            return hop.to_string();
        }
    }
    peer.ip().to_string()
}

/// Unwrap a JSON body, mapping extractor rejections to a 400.
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected request body");
        ApiError::BadRequest("Invalid request body")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> SocketAddr {
        SocketAddr::from(([192, 0, 2, 10], 51234))
    }

    #[test]
    fn peer_address_by_default() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.5"));
        assert_eq!(client_origin(&headers, peer(), false), "192.0.2.10");
    }

    #[test]
    fn first_forwarded_hop_when_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 203.0.113.5 , 10.0.0.1"),
        );
        assert_eq!(client_origin(&headers, peer(), true), "203.0.113.5");
        assert_eq!(client_origin(&HeaderMap::new(), peer(), true), "192.0.2.10");
    }
}
