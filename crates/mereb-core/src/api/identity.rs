//! Credential exchange against the user service.

use mereb_types::{Credentials, Registration, TokenResponse};
use tracing::debug;

use super::{ApiError, endpoint, read_json};

/// Unauthenticated client for `/login` and `/register`.
#[derive(Debug, Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    users_url: String,
}

impl IdentityClient {
    pub fn new(http: reqwest::Client, users_url: impl Into<String>) -> Self {
        Self {
            http,
            users_url: users_url.into(),
        }
    }

    /// Exchanges a username/password pair for a bearer token.
    ///
    /// # Errors
    /// Returns an error on transport failure, non-2xx status or a body
    /// without a token.
    pub async fn login(&self, credentials: &Credentials) -> Result<String, ApiError> {
        self.exchange("login", credentials).await
    }

    /// Registers a new account and returns its bearer token.
    ///
    /// # Errors
    /// Returns an error on transport failure, non-2xx status or a body
    /// without a token.
    pub async fn register(&self, registration: &Registration) -> Result<String, ApiError> {
        self.exchange("register", registration).await
    }

    async fn exchange<B: serde::Serialize + ?Sized>(
        &self,
        action: &str,
        body: &B,
    ) -> Result<String, ApiError> {
        let url = endpoint(&self.users_url, &[action])?;
        debug!(%url, "credential exchange");

        let response = self.http.post(url).json(body).send().await?;
        let TokenResponse { token } = read_json(response).await?;

        if token.trim().is_empty() {
            return Err(ApiError::Decode("empty token".to_string()));
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> IdentityClient {
        IdentityClient::new(
            reqwest::Client::new(),
            format!("{}/api/users", server.uri()),
        )
    }

    #[tokio::test]
    async fn test_login_returns_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/login"))
            .and(body_json(serde_json::json!({"username": "alice", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": "t-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let token = client(&server)
            .login(&Credentials::new("alice", "pw"))
            .await
            .unwrap();
        assert_eq!(token, "t-1");
    }

    #[tokio::test]
    async fn test_register_sends_camel_case_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/register"))
            .and(body_json(serde_json::json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "username": "ada",
                "email": "ada@example.com",
                "password": "secret1",
                "role": "USER"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"token": "t-2"})))
            .mount(&server)
            .await;

        let registration = Registration {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "secret1".to_string(),
            role: "USER".to_string(),
        };
        let token = client(&server).register(&registration).await.unwrap();
        assert_eq!(token, "t-2");
    }

    #[tokio::test]
    async fn test_login_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"message": "Bad credentials"})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .login(&Credentials::new("bob", "wrong"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(reqwest::StatusCode::UNAUTHORIZED));
        assert_eq!(err.server_message(), Some("Bad credentials"));
    }

    #[tokio::test]
    async fn test_login_error_field_in_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/login"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"error": "locked"})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .login(&Credentials::new("bob", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Backend(ref m) if m == "locked"));
    }

    #[tokio::test]
    async fn test_login_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let err = client(&server)
            .login(&Credentials::new("bob", "pw"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
