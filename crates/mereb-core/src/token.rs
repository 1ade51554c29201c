//! Bearer token inspection.
//!
//! Tokens are JWTs issued by the user service. The client never verifies the
//! signature; it only reads the payload to learn who is signed in. All
//! functions here are pure and fail soft: an undecodable token yields `None`.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

/// Payload claims the client cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiry, seconds since epoch
    #[serde(default)]
    pub exp: Option<i64>,
}

impl Claims {
    /// True when an `exp` claim exists and lies at or before `now_secs`.
    pub fn is_expired_at(&self, now_secs: i64) -> bool {
        self.exp.is_some_and(|exp| exp <= now_secs)
    }
}

/// Decodes the payload segment of a JWT.
pub fn claims(token: &str) -> Option<Claims> {
    let payload = token.split('.').nth(1)?;
    let decoded = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    serde_json::from_slice(&decoded).ok()
}

/// Returns the subject claim of `token`, the signed-in username.
pub fn subject(token: &str) -> Option<String> {
    claims(token)?.sub.filter(|s| !s.is_empty())
}

/// Returns true if `token` carries an `exp` claim in the past.
///
/// Undecodable tokens and tokens without `exp` are not considered expired.
pub fn is_expired(token: &str) -> bool {
    let now = chrono::Utc::now().timestamp();
    claims(token).is_some_and(|c| c.is_expired_at(now))
}

/// Short form of a token that is safe to log or print.
pub fn redact(token: &str) -> String {
    let head: String = token.chars().take(8).collect();
    if token.chars().count() <= 8 {
        "***".to_string()
    } else {
        format!("{head}...")
    }
}
