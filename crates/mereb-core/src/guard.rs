//! Navigation gating on session state.
//!
//! The guard is owned by the top-level view. It never redirects before the
//! view is mounted or while the persisted session is still being read, and it
//! issues at most one redirect per target.

use crate::session::Session;

/// Places a user can be sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    SignIn,
    SignUp,
    /// Main area: the post feed.
    Main,
    Profile,
}

impl Route {
    pub fn requires_auth(self) -> bool {
        matches!(self, Route::Main | Route::Profile)
    }

    /// Landing route for the given session.
    pub fn home_for(session: &Session) -> Route {
        if session.is_authenticated() {
            Route::Main
        } else {
            Route::SignIn
        }
    }
}

/// Outcome of one guard evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Owning view not mounted yet; render nothing, do nothing.
    Pending,
    /// Persisted session still loading; show a loading indicator.
    Loading,
    Redirect(Route),
    /// Already where this state belongs.
    Stay,
}

#[derive(Debug, Default)]
pub struct NavigationGuard {
    mounted: bool,
    last_redirect: Option<Route>,
}

impl NavigationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the owning view as attached. Redirects are only issued afterwards.
    pub fn mount(&mut self) {
        self.mounted = true;
    }

    /// Detaches the view and forgets the last redirect.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.last_redirect = None;
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Decides what to do for the current session. Repeated evaluation of an
    /// unchanged state yields [`GuardDecision::Stay`].
    pub fn evaluate(&mut self, session: &Session) -> GuardDecision {
        if session.is_restoring() {
            return GuardDecision::Loading;
        }
        if !self.mounted {
            return GuardDecision::Pending;
        }

        let target = Route::home_for(session);
        if self.last_redirect == Some(target) {
            GuardDecision::Stay
        } else {
            self.last_redirect = Some(target);
            GuardDecision::Redirect(target)
        }
    }

    /// Resolves a direct navigation request: protected routes without a
    /// session go to sign-in, everything else is allowed as requested.
    pub fn protect(requested: Route, session: &Session) -> Route {
        if requested.requires_auth() && !session.is_authenticated() {
            Route::SignIn
        } else {
            requested
        }
    }
}
