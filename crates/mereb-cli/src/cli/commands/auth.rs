//! Auth command handlers.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Result, bail};
use mereb_core::guard::{GuardDecision, NavigationGuard, Route};
use mereb_core::session::SIGN_IN_FAILED;
use mereb_core::store::FileTokenStore;
use mereb_core::token;
use mereb_types::Registration;

use super::App;

/// Returns `password`, or reads one line from stdin when it is absent.
pub fn password_or_stdin(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    let stdin = io::stdin();
    if stdin.is_terminal() {
        eprint!("Password: ");
        io::stderr().flush()?;
    }
    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub async fn login(app: &mut App, username: &str, password: &str) -> Result<()> {
    app.session_mut().sign_in(username, password).await;
    report_sign_in(app)
}

pub async fn register(app: &mut App, registration: &Registration) -> Result<()> {
    app.session_mut().sign_up(registration).await;
    report_sign_in(app)
}

fn report_sign_in(app: &App) -> Result<()> {
    let session = app.session().session();
    if let Some(error) = session.error() {
        bail!("{error}");
    }
    let Some(token) = session.token() else {
        bail!("{SIGN_IN_FAILED}");
    };

    match session.username() {
        Some(user) => println!("✓ Signed in as {user}"),
        None => println!("✓ Signed in"),
    }
    println!("  Token: {}", token::redact(token));
    println!(
        "  Session saved to: {}",
        FileTokenStore::default_location().path().display()
    );
    Ok(())
}

pub async fn logout(app: &mut App) {
    if app.session_mut().sign_out().await {
        println!("✓ Logged out");
    } else {
        println!("Not logged in (no session found).");
    }
}

/// Prints where the navigation guard would land the current session.
pub fn status(app: &App) {
    let session = app.session().session();
    let mut guard = NavigationGuard::new();
    guard.mount();

    match guard.evaluate(&session) {
        GuardDecision::Redirect(Route::Main) => match session.username() {
            Some(user) => println!("Signed in as {user}"),
            None => println!("Signed in (token carries no username)"),
        },
        GuardDecision::Redirect(_) => println!("Not logged in"),
        GuardDecision::Loading | GuardDecision::Pending | GuardDecision::Stay => {
            println!("Session state unknown");
        }
    }
}
