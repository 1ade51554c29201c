//! Session lifecycle: restore, sign in, sign up, sign out.
//!
//! [`SessionManager`] is the only writer of session state. Everything else
//! reads it through a cloned [`SessionHandle`], which always yields the
//! current value, never a copy taken earlier.
//!
//! ```text
//! Unknown (restoring) --restore--> Anonymous | Authenticated
//! Anonymous --sign_in/sign_up ok--> Authenticated
//! Anonymous --sign_in/sign_up err--> Anonymous (error set)
//! Authenticated --sign_out--> Anonymous
//! ```

use std::sync::Arc;

use anyhow::Context;
use mereb_types::{Credentials, Registration};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiError, IdentityClient};
use crate::store::TokenStore;
use crate::token;

/// Shown when a credential exchange fails without a server explanation.
pub const SIGN_IN_FAILED: &str = "Error logging in! try again!";
pub const ALREADY_SIGNED_IN: &str = "Already signed in";
pub const MISSING_CREDENTIALS: &str = "Username and password are required";

/// Coarse position in the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Persisted token not read yet.
    Unknown,
    Anonymous,
    Authenticated,
}

/// Snapshot of session state.
///
/// `username` is derived from `token` and has no setter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    username: Option<String>,
    restoring: bool,
    error: Option<String>,
    generation: u64,
}

impl Session {
    /// State at process start, before the persisted token is read.
    pub fn restoring() -> Self {
        Self {
            token: None,
            username: None,
            restoring: true,
            error: None,
            generation: 0,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            restoring: false,
            ..Self::restoring()
        }
    }

    #[cfg(test)]
    pub(crate) fn authenticated(token: impl Into<String>) -> Self {
        let mut session = Self::anonymous();
        session.replace_token(Some(token.into()));
        session
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Subject claim of the token; `None` if there is no token or it cannot
    /// be decoded.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn is_restoring(&self) -> bool {
        self.restoring
    }

    /// Token presence alone decides this; see [`token::is_expired`] for the
    /// restore-time expiry check.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Last user-visible error from a session operation.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Bumped on every token change. Lets consumers detect that an outstanding
    /// call was started under a different session.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> SessionState {
        match (self.restoring, self.token.is_some()) {
            (true, _) => SessionState::Unknown,
            (false, true) => SessionState::Authenticated,
            (false, false) => SessionState::Anonymous,
        }
    }

    fn replace_token(&mut self, token: Option<String>) {
        self.username = token.as_deref().and_then(token::subject);
        self.token = token;
        self.generation += 1;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::restoring()
    }
}

/// Read access to the current session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    rx: watch::Receiver<Session>,
}

impl SessionHandle {
    /// A handle whose session never changes.
    #[cfg(test)]
    pub(crate) fn fixed(session: Session) -> Self {
        let (_tx, rx) = watch::channel(session);
        Self { rx }
    }

    pub fn snapshot(&self) -> Session {
        self.rx.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.rx.borrow().token.clone()
    }

    pub fn username(&self) -> Option<String> {
        self.rx.borrow().username.clone()
    }

    pub fn is_restoring(&self) -> bool {
        self.rx.borrow().restoring
    }

    pub fn is_authenticated(&self) -> bool {
        self.rx.borrow().is_authenticated()
    }

    pub fn generation(&self) -> u64 {
        self.rx.borrow().generation
    }

    /// Waits for the next change. Returns false once the manager is gone.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Owner and single writer of the session.
pub struct SessionManager {
    tx: watch::Sender<Session>,
    store: Arc<dyn TokenStore>,
    identity: IdentityClient,
}

impl SessionManager {
    /// Creates a manager in the restoring state. Call [`Self::restore`] once.
    pub fn new(store: Arc<dyn TokenStore>, identity: IdentityClient) -> Self {
        let (tx, _rx) = watch::channel(Session::restoring());
        Self {
            tx,
            store,
            identity,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            rx: self.tx.subscribe(),
        }
    }

    pub fn session(&self) -> Session {
        self.tx.borrow().clone()
    }

    /// Reads the persisted token. Only the first call does anything.
    ///
    /// A token whose `exp` claim has passed is discarded and removed from the
    /// store. Storage failures are logged and treated as "no session".
    pub async fn restore(&mut self) {
        if !self.tx.borrow().restoring {
            return;
        }

        let mut loaded = match self.with_store(|store| store.load()).await {
            Ok(token) => token,
            Err(e) => {
                warn!("failed to read persisted session: {e:#}");
                None
            }
        };

        if loaded.as_deref().is_some_and(token::is_expired) {
            info!("persisted session token has expired; discarding");
            loaded = None;
            if let Err(e) = self.with_store(|store| store.clear()).await {
                warn!("failed to remove expired session: {e:#}");
            }
        }

        self.tx.send_modify(|session| {
            session.restoring = false;
            if session.token.is_none() && loaded.is_some() {
                session.replace_token(loaded);
            }
        });

        let session = self.tx.borrow();
        match session.username() {
            Some(user) => info!(user, "session restored"),
            None if session.is_authenticated() => info!("session restored (unknown subject)"),
            None => debug!("no persisted session"),
        }
    }

    /// Signs in with username and password.
    ///
    /// Never returns an error: failures land in [`Session::error`] and leave
    /// the token untouched. Does nothing on the network when a session exists
    /// or either argument is empty.
    pub async fn sign_in(&mut self, username: &str, password: &str) {
        if !self.precondition(username, password) {
            return;
        }

        let result = self
            .identity
            .login(&Credentials::new(username, password))
            .await;
        self.complete("sign-in", result).await;
    }

    /// Registers a new account and signs in with it. Same contract as
    /// [`Self::sign_in`].
    pub async fn sign_up(&mut self, registration: &Registration) {
        if !self.precondition(&registration.username, &registration.password) {
            return;
        }

        let result = self.identity.register(registration).await;
        self.complete("sign-up", result).await;
    }

    /// Clears the token and removes it from storage.
    ///
    /// Returns whether a session existed. Calling it again is a no-op.
    pub async fn sign_out(&mut self) -> bool {
        if let Err(e) = self.with_store(|store| store.clear()).await {
            warn!("failed to remove persisted session: {e:#}");
        }

        let had_session = self.tx.borrow().is_authenticated();
        if had_session {
            self.tx.send_modify(|session| {
                session.replace_token(None);
                session.error = None;
            });
            info!("signed out");
        }
        had_session
    }

    fn precondition(&mut self, username: &str, password: &str) -> bool {
        let rejection = if self.tx.borrow().is_authenticated() {
            Some(ALREADY_SIGNED_IN)
        } else if username.is_empty() || password.is_empty() {
            Some(MISSING_CREDENTIALS)
        } else {
            None
        };

        match rejection {
            Some(message) => {
                debug!(reason = message, "credential exchange rejected locally");
                self.set_error(message.to_string());
                false
            }
            None => true,
        }
    }

    async fn complete(&mut self, action: &str, result: Result<String, ApiError>) {
        match result {
            Ok(token) => {
                let saved = token.clone();
                if let Err(e) = self.with_store(move |store| store.save(&saved)).await {
                    warn!("failed to persist session: {e:#}");
                }
                self.tx.send_modify(|session| {
                    session.replace_token(Some(token));
                    session.error = None;
                    session.restoring = false;
                });
                let session = self.tx.borrow();
                info!(action, user = session.username().unwrap_or("?"), "signed in");
            }
            Err(e) => {
                warn!(action, "credential exchange failed: {e}");
                let message = e.server_message().unwrap_or(SIGN_IN_FAILED).to_string();
                self.set_error(message);
            }
        }
    }

    fn set_error(&self, message: String) {
        self.tx.send_modify(|session| session.error = Some(message));
    }

    /// Runs a store operation on the blocking pool; stores may touch disk.
    async fn with_store<T, F>(&self, op: F) -> anyhow::Result<T>
    where
        F: FnOnce(&dyn TokenStore) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(&*store))
            .await
            .context("session store task failed")?
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::guard::{GuardDecision, NavigationGuard, Route};
    use crate::store::{FileTokenStore, MemoryTokenStore};
    use crate::token::test_tokens::{for_user, jwt};

    fn manager(server: &MockServer, store: Arc<dyn TokenStore>) -> SessionManager {
        let identity =
            IdentityClient::new(reqwest::Client::new(), format!("{}/api/users", server.uri()));
        SessionManager::new(store, identity)
    }

    async fn mock_login(server: &MockServer, status: u16, body: serde_json::Value, hits: u64) {
        Mock::given(method("POST"))
            .and(path("/api/users/login"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .expect(hits)
            .mount(server)
            .await;
    }

    #[test]
    fn test_username_follows_token() {
        let session = Session::authenticated(for_user("alice"));
        assert_eq!(session.username(), Some("alice"));
        assert_eq!(session.state(), SessionState::Authenticated);

        let session = Session::authenticated("opaque");
        assert!(session.is_authenticated());
        assert_eq!(session.username(), None);

        let session = Session::anonymous();
        assert_eq!(session.username(), None);
        assert_eq!(session.state(), SessionState::Anonymous);
        assert_eq!(Session::default().state(), SessionState::Unknown);
    }

    #[tokio::test]
    async fn test_sign_in_success_persists_and_derives_username() {
        let server = MockServer::start().await;
        let token = for_user("alice");
        mock_login(&server, 200, serde_json::json!({"token": token}), 1).await;

        let store = Arc::new(MemoryTokenStore::default());
        let mut mgr = manager(&server, Arc::clone(&store) as Arc<dyn TokenStore>);
        mgr.restore().await;
        mgr.sign_in("alice", "pw").await;

        let session = mgr.session();
        assert!(session.is_authenticated());
        assert_eq!(session.username(), Some("alice"));
        assert_eq!(session.error(), None);
        assert_eq!(store.load().unwrap(), Some(token));
    }

    #[tokio::test]
    async fn test_sign_in_401_leaves_session_unchanged() {
        let server = MockServer::start().await;
        mock_login(&server, 401, serde_json::json!({"status": 401}), 1).await;

        let store = Arc::new(MemoryTokenStore::default());
        let mut mgr = manager(&server, Arc::clone(&store) as Arc<dyn TokenStore>);
        mgr.restore().await;
        let before = mgr.session().generation();

        mgr.sign_in("bob", "wrong").await;

        let session = mgr.session();
        assert!(!session.is_authenticated());
        assert_eq!(session.error(), Some(SIGN_IN_FAILED));
        assert_eq!(session.generation(), before);
        assert_eq!(store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_sign_in_surfaces_server_message() {
        let server = MockServer::start().await;
        mock_login(&server, 401, serde_json::json!({"message": "Bad credentials"}), 1).await;

        let mut mgr = manager(&server, Arc::new(MemoryTokenStore::default()));
        mgr.restore().await;
        mgr.sign_in("bob", "wrong").await;
        assert_eq!(mgr.session().error(), Some("Bad credentials"));
    }

    #[tokio::test]
    async fn test_sign_in_while_authenticated_makes_no_call() {
        let server = MockServer::start().await;
        mock_login(&server, 200, serde_json::json!({"token": for_user("x")}), 0).await;

        let existing = for_user("alice");
        let mut mgr = manager(&server, Arc::new(MemoryTokenStore::with_token(existing.clone())));
        mgr.restore().await;
        let before = mgr.session();

        mgr.sign_in("mallory", "pw").await;
        mgr.sign_up(&Registration {
            first_name: "M".to_string(),
            last_name: "M".to_string(),
            username: "mallory".to_string(),
            email: "m@example.com".to_string(),
            password: "pw".to_string(),
            role: "USER".to_string(),
        })
        .await;

        let after = mgr.session();
        assert_eq!(after.token(), Some(existing.as_str()));
        assert_eq!(after.username(), Some("alice"));
        assert_eq!(after.generation(), before.generation());
        assert_eq!(after.error(), Some(ALREADY_SIGNED_IN));
    }

    #[tokio::test]
    async fn test_empty_credentials_make_no_call() {
        let server = MockServer::start().await;
        mock_login(&server, 200, serde_json::json!({"token": for_user("x")}), 0).await;

        let mut mgr = manager(&server, Arc::new(MemoryTokenStore::default()));
        mgr.restore().await;
        mgr.sign_in("", "pw").await;
        assert_eq!(mgr.session().error(), Some(MISSING_CREDENTIALS));
        mgr.sign_in("alice", "").await;
        assert!(!mgr.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_success_clears_previous_error() {
        let server = MockServer::start().await;
        mock_login(&server, 200, serde_json::json!({"token": for_user("alice")}), 1).await;

        let mut mgr = manager(&server, Arc::new(MemoryTokenStore::default()));
        mgr.restore().await;
        mgr.sign_in("", "").await;
        assert!(mgr.session().error().is_some());

        mgr.sign_in("alice", "pw").await;
        assert_eq!(mgr.session().error(), None);
    }

    #[tokio::test]
    async fn test_sign_up_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/register"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"token": for_user("ada")})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut mgr = manager(&server, Arc::new(MemoryTokenStore::default()));
        mgr.restore().await;
        mgr.sign_up(&Registration {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password: "secret1".to_string(),
            role: Registration::DEFAULT_ROLE.to_string(),
        })
        .await;

        assert_eq!(mgr.session().username(), Some("ada"));
    }

    #[tokio::test]
    async fn test_sign_out_is_idempotent() {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryTokenStore::with_token(for_user("alice")));
        let mut mgr = manager(&server, Arc::clone(&store) as Arc<dyn TokenStore>);
        mgr.restore().await;

        assert!(mgr.sign_out().await);
        let once = mgr.session();
        assert!(!mgr.sign_out().await);
        let twice = mgr.session();

        assert_eq!(once, twice);
        assert_eq!(twice.token(), None);
        assert_eq!(twice.username(), None);
        assert_eq!(store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_restore_round_trips_username() {
        let server = MockServer::start().await;
        let token = for_user("alice");
        let before = Session::authenticated(token.clone());

        let store = Arc::new(MemoryTokenStore::default());
        store.save(&token).unwrap();
        let mut mgr = manager(&server, store);
        assert!(mgr.session().is_restoring());

        mgr.restore().await;

        let after = mgr.session();
        assert!(!after.is_restoring());
        assert_eq!(after.username(), before.username());
    }

    #[tokio::test]
    async fn test_restore_runs_once() {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryTokenStore::default());
        let mut mgr = manager(&server, Arc::clone(&store) as Arc<dyn TokenStore>);
        mgr.restore().await;
        assert_eq!(mgr.session().state(), SessionState::Anonymous);

        store.save(&for_user("late")).unwrap();
        mgr.restore().await;
        assert_eq!(mgr.session().state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_restore_drops_expired_token() {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryTokenStore::with_token(jwt(r#"{"sub":"old","exp":1}"#)));
        let mut mgr = manager(&server, Arc::clone(&store) as Arc<dyn TokenStore>);
        mgr.restore().await;

        assert_eq!(mgr.session().state(), SessionState::Anonymous);
        assert_eq!(store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_restore_keeps_undecodable_token() {
        let server = MockServer::start().await;
        let mut mgr = manager(&server, Arc::new(MemoryTokenStore::with_token("opaque-token")));
        mgr.restore().await;

        let session = mgr.session();
        assert!(session.is_authenticated());
        assert_eq!(session.username(), None);
    }

    #[tokio::test]
    async fn test_handle_sees_changes() {
        let server = MockServer::start().await;
        let mut mgr = manager(&server, Arc::new(MemoryTokenStore::with_token(for_user("alice"))));
        let mut handle = mgr.handle();
        assert!(handle.is_restoring());

        mgr.restore().await;
        assert!(handle.changed().await);
        assert_eq!(handle.username(), Some("alice".to_string()));

        let generation = handle.generation();
        mgr.sign_out().await;
        assert!(handle.changed().await);
        assert_eq!(handle.token(), None);
        assert!(handle.generation() > generation);

        drop(mgr);
        assert!(!handle.changed().await);
    }

    #[tokio::test]
    async fn test_failed_sign_in_does_not_redirect() {
        let server = MockServer::start().await;
        mock_login(&server, 401, serde_json::json!({"status": 401}), 1).await;

        let mut mgr = manager(&server, Arc::new(MemoryTokenStore::default()));
        let mut guard = NavigationGuard::new();
        guard.mount();
        assert_eq!(guard.evaluate(&mgr.session()), GuardDecision::Loading);

        mgr.restore().await;
        assert_eq!(
            guard.evaluate(&mgr.session()),
            GuardDecision::Redirect(Route::SignIn)
        );

        mgr.sign_in("bob", "wrong").await;
        assert_eq!(mgr.session().error(), Some(SIGN_IN_FAILED));
        assert_eq!(guard.evaluate(&mgr.session()), GuardDecision::Stay);
    }

    #[tokio::test]
    async fn test_sign_in_then_out_with_file_store() {
        let server = MockServer::start().await;
        let token = for_user("alice");
        mock_login(&server, 200, serde_json::json!({"token": token}), 1).await;

        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileTokenStore::new(dir.path().join("session.json")));
        let mut mgr = manager(&server, Arc::clone(&store) as Arc<dyn TokenStore>);
        mgr.restore().await;

        mgr.sign_in("alice", "pw").await;
        assert_eq!(store.load().unwrap(), Some(token));

        assert!(mgr.sign_out().await);
        assert_eq!(store.load().unwrap(), None);
    }
}
