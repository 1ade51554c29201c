//! Docker control backend: env file, compose file and the deploy script.
//!
//! These endpoints are unauthenticated.

use mereb_types::{ComposeFile, EnvVars, MessageResponse};
use tracing::debug;

use super::{ApiError, endpoint, read_json};

#[derive(Debug, Clone)]
pub struct ControlClient {
    http: reqwest::Client,
    base_url: String,
}

impl ControlClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// # Errors
    /// Returns an error on transport, status or decode failure.
    pub async fn get_env(&self) -> Result<EnvVars, ApiError> {
        self.get("get-env").await
    }

    /// Replaces the whole env file with `vars`.
    ///
    /// # Errors
    /// Returns an error on transport, status or decode failure.
    pub async fn update_env(&self, vars: &EnvVars) -> Result<String, ApiError> {
        self.post("update-env", Some(vars)).await
    }

    /// # Errors
    /// Returns an error on transport, status or decode failure.
    pub async fn get_compose(&self) -> Result<String, ApiError> {
        let ComposeFile { docker_compose } = self.get("get-docker-compose").await?;
        Ok(docker_compose)
    }

    /// # Errors
    /// Returns an error on transport, status or decode failure.
    pub async fn update_compose(&self, contents: &str) -> Result<String, ApiError> {
        let body = ComposeFile {
            docker_compose: contents.to_string(),
        };
        self.post("update-docker-compose", Some(&body)).await
    }

    /// Triggers the build-and-deploy script and returns the backend message.
    ///
    /// # Errors
    /// Returns an error on transport, status or decode failure.
    pub async fn run_script(&self) -> Result<String, ApiError> {
        self.post::<()>("run-script", None).await
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, action: &str) -> Result<T, ApiError> {
        let url = endpoint(&self.base_url, &[action])?;
        debug!(%url, "control get");
        let response = self.http.get(url).send().await?;
        read_json(response).await
    }

    async fn post<B: serde::Serialize>(
        &self,
        action: &str,
        body: Option<&B>,
    ) -> Result<String, ApiError> {
        let url = endpoint(&self.base_url, &[action])?;
        debug!(%url, "control post");
        let mut request = self.http.post(url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let MessageResponse { message } = read_json(request.send().await?).await?;
        Ok(message)
    }
}
