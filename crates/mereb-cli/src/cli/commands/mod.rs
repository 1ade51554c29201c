//! CLI command handlers.

use std::sync::Arc;

use anyhow::{Context, Result};
use mereb_core::api::{self, AuthedClient, ControlClient, IdentityClient};
use mereb_core::config::Config;
use mereb_core::guard::{NavigationGuard, Route};
use mereb_core::session::SessionManager;
use mereb_core::store::FileTokenStore;
use tracing::debug;

pub mod auth;
pub mod config;
pub mod control;
pub mod posts;
pub mod profile;

/// Everything a command needs: config, one HTTP client and the restored
/// session.
pub struct App {
    config: Config,
    http: reqwest::Client,
    session: SessionManager,
}

impl App {
    /// Builds the clients and restores the persisted session.
    pub async fn open(config: Config) -> Result<Self> {
        let http = api::http_client(&config).context("build HTTP client")?;
        let store = Arc::new(FileTokenStore::default_location());
        let identity = IdentityClient::new(http.clone(), config.endpoints.users_url.clone());

        let mut session = SessionManager::new(store, identity);
        session.restore().await;

        Ok(Self {
            config,
            http,
            session,
        })
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionManager {
        &mut self.session
    }

    /// Fails unless the guard lets the current session open `route`.
    pub fn require(&self, route: Route) -> Result<()> {
        match NavigationGuard::protect(route, &self.session.session()) {
            Route::SignIn if route != Route::SignIn => {
                debug!(?route, "guard sent command to sign-in");
                anyhow::bail!("Not logged in. Run `mereb login --username <USERNAME>` first.")
            }
            _ => Ok(()),
        }
    }

    pub fn authed(&self) -> AuthedClient {
        AuthedClient::new(
            self.http.clone(),
            self.config.endpoints.users_url.clone(),
            self.config.endpoints.posts_url.clone(),
            self.session.handle(),
        )
    }

    pub fn control(&self) -> ControlClient {
        ControlClient::new(self.http.clone(), self.config.endpoints.control_url.clone())
    }
}
