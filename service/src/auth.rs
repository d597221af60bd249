//! HTTP Basic authentication for the admin surface.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use scoreazy_core::config::AdminConfig;
use sha2::{Digest, Sha256};

use crate::{ApiError, AppState};

/// The configured admin credential pair, held as digests.
#[derive(Clone)]
pub struct AdminCredentials {
    username: [u8; 32],
    password: [u8; 32],
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AdminCredentials(<redacted>)")
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

impl AdminCredentials {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            username: digest(username),
            password: digest(password),
        }
    }

    /// `None` unless both username and password are set and non-empty.
    pub fn from_config(cfg: &AdminConfig) -> Option<Self> {
        match (&cfg.username, &cfg.password) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {
                Some(Self::new(user, pass))
            }
            _ => None,
        }
    }

    /// Check an `Authorization` header value.
    pub fn verify(&self, authorization: Option<&str>) -> Result<(), ApiError> {
        let encoded = authorization
            .and_then(|value| value.strip_prefix("Basic "))
            .ok_or(ApiError::Unauthorized("Basic authentication required"))?;

        let (user, pass) = decode_basic(encoded.trim())
            .ok_or(ApiError::Unauthorized("Invalid credentials"))?;

        // Evaluate both comparisons regardless of the first result.
        let user_ok = digest(&user) == self.username;
        let pass_ok = digest(&pass) == self.password;
        if user_ok & pass_ok {
            Ok(())
        } else {
            Err(ApiError::Unauthorized("Invalid credentials"))
        }
    }
}

fn decode_basic(encoded: &str) -> Option<(String, String)> {
    let bytes = STANDARD.decode(encoded).ok()?;
    let decoded = String::from_utf8(bytes).ok()?;
    let (user, pass) = decoded.split_once(':')?;
    Some((user.to_string(), pass.to_string()))
}

/// Middleware guarding every admin route.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(credentials) = state.credentials.as_deref() else {
        tracing::warn!(
            path = %request.uri().path(),
            "Admin request rejected: no credentials configured"
        );
        return Err(ApiError::Unauthorized("Admin access is not configured"));
    };

    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if let Err(err) = credentials.verify(authorization) {
        tracing::warn!(path = %request.uri().path(), "Admin authentication failed");
        return Err(err);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(user: &str, pass: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")))
    }

    #[test]
    fn accepts_matching_pair() {
        let creds = AdminCredentials::new("admin", "s3cret:with:colons");
        assert!(creds.verify(Some(&basic("admin", "s3cret:with:colons"))).is_ok());
    }

    #[test]
    fn rejects_missing_malformed_and_wrong() {
        let creds = AdminCredentials::new("admin", "s3cret");
        assert!(matches!(
            creds.verify(None),
            Err(ApiError::Unauthorized("Basic authentication required"))
        ));
        assert!(matches!(
            creds.verify(Some("Bearer abc")),
            Err(ApiError::Unauthorized("Basic authentication required"))
        ));
        assert!(matches!(
            creds.verify(Some("Basic !!!")),
            Err(ApiError::Unauthorized("Invalid credentials"))
        ));
        assert!(creds.verify(Some(&basic("admin", "wrong"))).is_err());
        assert!(creds.verify(Some(&basic("root", "s3cret"))).is_err());
    }

    #[test]
    fn incomplete_config_yields_no_credentials() {
        let cfg = AdminConfig {
            username: Some("admin".to_string()),
            password: Some(String::new()),
        };
        assert!(AdminCredentials::from_config(&cfg).is_none());
        assert!(AdminCredentials::from_config(&AdminConfig::default()).is_none());
    }
}
