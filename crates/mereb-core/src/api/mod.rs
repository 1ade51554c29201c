//! HTTP clients for the user, post and control backends.
//!
//! All calls are plain JSON over HTTP. Nothing here retries: a failed call is
//! reported once and the caller decides whether to try again.

use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use url::Url;

use mereb_types::ErrorBody;

use crate::config::Config;

mod authed;
mod control;
mod identity;

pub use authed::AuthedClient;
pub use control::ControlClient;
pub use identity::IdentityClient;

/// Failure of a single backend call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No session token, so the request was never sent.
    #[error("Not logged in")]
    NotAuthenticated,

    /// Session token present but no username could be derived from it.
    #[error("Signed-in user is unknown (token carries no subject)")]
    UnknownIdentity,

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Connection, TLS or timeout failure.
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx answer.
    #[error("HTTP {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status {
        status: StatusCode,
        message: Option<String>,
    },

    /// 2xx answer whose body did not have the expected shape.
    #[error("Malformed response: {0}")]
    Decode(String),

    /// 2xx answer carrying an `error` field.
    #[error("{0}")]
    Backend(String),
}

impl ApiError {
    /// Message the server attached to the failure, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status {
                message: Some(message),
                ..
            }
            | ApiError::Backend(message) => Some(message),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(err) => err.status(),
            _ => None,
        }
    }
}

/// A response body that may or may not be JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(serde_json::Value),
    Text(String),
}

/// Builds the shared HTTP client.
///
/// # Errors
/// Returns an error if the TLS backend cannot be initialized.
pub fn http_client(config: &Config) -> Result<reqwest::Client, ApiError> {
    let mut builder = reqwest::Client::builder().user_agent(concat!(
        "mereb/",
        env!("CARGO_PKG_VERSION")
    ));
    if let Some(timeout) = config.timeout() {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// Appends path segments to a base URL, percent-encoding each segment.
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<Url, ApiError> {
    let invalid = |reason: String| ApiError::InvalidUrl {
        url: base.to_string(),
        reason,
    };

    let mut url = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|()| invalid("cannot be a base".to_string()))?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}

/// Reads a JSON body, mapping non-2xx answers and `{error}` bodies to errors.
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ApiError> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        return Err(status_error(status, &bytes));
    }

    if let Ok(ErrorBody {
        error: Some(error), ..
    }) = serde_json::from_slice::<ErrorBody>(&bytes)
    {
        return Err(ApiError::Backend(error));
    }

    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Reads a body as JSON when the server says it is JSON, else as text.
pub(crate) async fn read_body(response: reqwest::Response) -> Result<Body, ApiError> {
    let status = response.status();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"));
    let bytes = response.bytes().await?;

    if !status.is_success() {
        return Err(status_error(status, &bytes));
    }

    if is_json && !bytes.is_empty() {
        serde_json::from_slice(&bytes)
            .map(Body::Json)
            .map_err(|e| ApiError::Decode(e.to_string()))
    } else {
        Ok(Body::Text(String::from_utf8_lossy(&bytes).into_owned()))
    }
}

fn status_error(status: StatusCode, body: &[u8]) -> ApiError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.text().map(str::to_string))
        .or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            (!text.is_empty() && text.len() <= 200 && !text.starts_with('<')).then_some(text)
        });
    ApiError::Status { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_and_encodes() {
        let url = endpoint("http://host:8082/api/users", &["login"]).unwrap();
        assert_eq!(url.as_str(), "http://host:8082/api/users/login");

        let url = endpoint("http://host:8082/api/users/", &["a b"]).unwrap();
        assert_eq!(url.as_str(), "http://host:8082/api/users/a%20b");

        let url = endpoint("http://host:8083/api/posts", &[]).unwrap();
        assert_eq!(url.as_str(), "http://host:8083/api/posts");

        let url = endpoint("http://host:5000", &["get-env"]).unwrap();
        assert_eq!(url.as_str(), "http://host:5000/get-env");
    }

    #[test]
    fn test_endpoint_rejects_bad_base() {
        let err = endpoint("not a url", &["x"]).unwrap_err();
        assert!(matches!(err, ApiError::InvalidUrl { .. }));
    }

    #[test]
    fn test_status_error_extracts_message() {
        let err = status_error(
            StatusCode::UNAUTHORIZED,
            br#"{"message":"Bad credentials","status":401}"#,
        );
        assert_eq!(err.server_message(), Some("Bad credentials"));
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert_eq!(err.to_string(), "HTTP 401 Unauthorized: Bad credentials");

        let err = status_error(StatusCode::BAD_GATEWAY, b"<html>oops</html>");
        assert_eq!(err.server_message(), None);
        assert_eq!(err.to_string(), "HTTP 502 Bad Gateway");

        let err = status_error(StatusCode::FORBIDDEN, b"denied");
        assert_eq!(err.server_message(), Some("denied"));
    }
}
