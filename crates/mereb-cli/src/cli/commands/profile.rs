//! Profile command handler.

use anyhow::{Result, bail};
use mereb_core::api::ApiError;
use mereb_core::feed::PROFILE_FAILED;
use mereb_core::guard::Route;
use tracing::warn;

use super::App;

pub async fn show(app: &App) -> Result<()> {
    app.require(Route::Profile)?;

    let profile = match app.authed().fetch_profile().await {
        Ok(profile) => profile,
        Err(e @ (ApiError::NotAuthenticated | ApiError::UnknownIdentity)) => return Err(e.into()),
        Err(e) => {
            warn!("fetching profile failed: {e}");
            bail!("{PROFILE_FAILED}");
        }
    };

    println!("{}", profile.full_name());
    println!("  Username: {}", profile.username);
    println!("  Email:    {}", profile.email);
    println!("  Role:     {}", profile.role);
    Ok(())
}
