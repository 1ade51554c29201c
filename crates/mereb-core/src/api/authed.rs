//! Calls to protected resources (profile, posts).
//!
//! The token is read from the session handle on every call, so a sign-out is
//! honored by the very next request.

use mereb_types::{NewPost, Post, UserProfile};
use reqwest::header::AUTHORIZATION;
use tracing::debug;

use super::{ApiError, Body, endpoint, read_body, read_json};
use crate::session::SessionHandle;

#[derive(Debug, Clone)]
pub struct AuthedClient {
    http: reqwest::Client,
    users_url: String,
    posts_url: String,
    session: SessionHandle,
}

impl AuthedClient {
    pub fn new(
        http: reqwest::Client,
        users_url: impl Into<String>,
        posts_url: impl Into<String>,
        session: SessionHandle,
    ) -> Self {
        Self {
            http,
            users_url: users_url.into(),
            posts_url: posts_url.into(),
            session,
        }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    fn bearer(&self) -> Result<String, ApiError> {
        self.session
            .token()
            .map(|token| format!("Bearer {token}"))
            .ok_or(ApiError::NotAuthenticated)
    }

    /// Fetches the profile of the signed-in user.
    ///
    /// # Errors
    /// `NotAuthenticated` / `UnknownIdentity` without sending anything;
    /// otherwise any transport, status or decode failure.
    pub async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        let auth = self.bearer()?;
        let username = self.session.username().ok_or(ApiError::UnknownIdentity)?;
        let url = endpoint(&self.users_url, &[&username])?;
        debug!(%url, "fetch profile");

        let response = self.http.get(url).header(AUTHORIZATION, auth).send().await?;
        read_json(response).await
    }

    /// # Errors
    /// `NotAuthenticated` without sending anything; otherwise any transport,
    /// status or decode failure.
    pub async fn list_posts(&self) -> Result<Vec<Post>, ApiError> {
        let auth = self.bearer()?;
        let url = endpoint(&self.posts_url, &[])?;
        debug!(%url, "list posts");

        let response = self.http.get(url).header(AUTHORIZATION, auth).send().await?;
        read_json(response).await
    }

    /// Creates a post and returns the stored version.
    ///
    /// # Errors
    /// `NotAuthenticated` without sending anything; otherwise any transport,
    /// status or decode failure.
    pub async fn create_post(&self, post: &NewPost) -> Result<Post, ApiError> {
        let auth = self.bearer()?;
        let url = endpoint(&self.posts_url, &[])?;
        debug!(%url, "create post");

        let response = self
            .http
            .post(url)
            .header(AUTHORIZATION, auth)
            .json(post)
            .send()
            .await?;
        read_json(response).await
    }

    /// Deletes a post. The service answers with an empty or text body.
    ///
    /// # Errors
    /// `NotAuthenticated` without sending anything; otherwise any transport
    /// or status failure.
    pub async fn delete_post(&self, id: i64) -> Result<Body, ApiError> {
        let auth = self.bearer()?;
        let url = endpoint(&self.posts_url, &[&id.to_string()])?;
        debug!(%url, "delete post");

        let response = self
            .http
            .delete(url)
            .header(AUTHORIZATION, auth)
            .send()
            .await?;
        read_body(response).await
    }
}
