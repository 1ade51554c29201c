//! Docker control command handlers.
//!
//! The control backend has no auth, so none of these consult the session.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use super::App;

pub async fn env_show(app: &App) -> Result<()> {
    let vars = app.control().get_env().await.context("fetch env")?;
    if vars.is_empty() {
        println!("No variables set.");
    }
    for (key, value) in vars.iter() {
        println!("{key}={value}");
    }
    Ok(())
}

/// Fetches the env file, sets one variable and pushes the whole file back.
pub async fn env_set(app: &App, key: &str, value: &str) -> Result<()> {
    let control = app.control();
    let mut vars = control.get_env().await.context("fetch env")?;

    if vars.get(key).is_some() {
        vars.set(key, value);
    } else if !vars.insert_new(key, value) {
        bail!("Both KEY and VALUE must be non-empty");
    }

    let message = control.update_env(&vars).await.context("update env")?;
    println!("✓ {message}");
    Ok(())
}

pub async fn env_unset(app: &App, key: &str) -> Result<()> {
    let control = app.control();
    let mut vars = control.get_env().await.context("fetch env")?;

    if vars.remove(key).is_none() {
        bail!("No variable named '{key}'");
    }

    let message = control.update_env(&vars).await.context("update env")?;
    println!("✓ {message}");
    Ok(())
}

pub async fn compose_show(app: &App) -> Result<()> {
    let contents = app
        .control()
        .get_compose()
        .await
        .context("fetch docker-compose file")?;
    print!("{contents}");
    if !contents.ends_with('\n') {
        println!();
    }
    Ok(())
}

pub async fn compose_push(app: &App, file: &Path) -> Result<()> {
    let contents = fs::read_to_string(file)
        .with_context(|| format!("read {}", file.display()))?;
    let message = app
        .control()
        .update_compose(&contents)
        .await
        .context("update docker-compose file")?;
    println!("✓ {message}");
    Ok(())
}

pub async fn run_script(app: &App) -> Result<()> {
    println!("Running deploy script...");
    let message = app.control().run_script().await.context("run script")?;
    println!("✓ {message}");
    Ok(())
}
