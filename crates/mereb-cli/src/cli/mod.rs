//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mereb_core::config::{self, paths};
use mereb_core::logging;
use mereb_types::Registration;

mod commands;

#[derive(Parser)]
#[command(name = "mereb")]
#[command(version)]
#[command(about = "Client for the mereb social app and its Docker control backend")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sign in with username and password
    Login {
        #[arg(short, long)]
        username: String,
        /// Read from stdin when omitted
        #[arg(short, long, env = "MEREB_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and sign in with it
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(short, long, env = "MEREB_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        #[arg(long, default_value = Registration::DEFAULT_ROLE)]
        role: String,
    },

    /// Sign out and remove the stored session
    Logout,

    /// Show who is signed in
    Status,

    /// Show the signed-in user's profile
    Profile,

    /// Read and write posts
    Posts {
        #[command(subcommand)]
        command: PostCommands,
    },

    /// Edit the deployment env file
    Env {
        #[command(subcommand)]
        command: EnvCommands,
    },

    /// Show or replace the docker-compose file
    Compose {
        #[command(subcommand)]
        command: ComposeCommands,
    },

    /// Run the build-and-deploy script
    RunScript,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum PostCommands {
    /// List all posts
    List,
    /// Publish a post
    Create {
        #[arg(value_name = "CONTENT")]
        content: String,
    },
    /// Delete a post by id
    Delete {
        #[arg(value_name = "ID")]
        id: i64,
    },
}

#[derive(clap::Subcommand)]
enum EnvCommands {
    /// Print all variables
    Show,
    /// Add or replace a variable (comma-separated values become a list)
    Set {
        #[arg(value_name = "KEY")]
        key: String,
        #[arg(value_name = "VALUE")]
        value: String,
    },
    /// Remove a variable
    Unset {
        #[arg(value_name = "KEY")]
        key: String,
    },
}

#[derive(clap::Subcommand)]
enum ComposeCommands {
    /// Print the current compose file
    Show,
    /// Replace the compose file with the contents of FILE
    Push {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = logging::init(&paths::logs_dir());

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;
    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Login { username, password } => {
            let password = commands::auth::password_or_stdin(password)?;
            commands::auth::login(&mut open_app().await?, &username, &password).await
        }
        Commands::Register {
            first_name,
            last_name,
            username,
            email,
            password,
            role,
        } => {
            let registration = Registration {
                first_name,
                last_name,
                username,
                email,
                password: commands::auth::password_or_stdin(password)?,
                role,
            };
            commands::auth::register(&mut open_app().await?, &registration).await
        }
        Commands::Logout => {
            commands::auth::logout(&mut open_app().await?).await;
            Ok(())
        }
        Commands::Status => {
            commands::auth::status(&open_app().await?);
            Ok(())
        }
        Commands::Profile => commands::profile::show(&open_app().await?).await,

        Commands::Posts { command } => {
            let app = open_app().await?;
            match command {
                PostCommands::List => commands::posts::list(&app).await,
                PostCommands::Create { content } => commands::posts::create(&app, &content).await,
                PostCommands::Delete { id } => commands::posts::delete(&app, id).await,
            }
        }

        Commands::Env { command } => {
            let app = open_app().await?;
            match command {
                EnvCommands::Show => commands::control::env_show(&app).await,
                EnvCommands::Set { key, value } => {
                    commands::control::env_set(&app, &key, &value).await
                }
                EnvCommands::Unset { key } => commands::control::env_unset(&app, &key).await,
            }
        }

        Commands::Compose { command } => {
            let app = open_app().await?;
            match command {
                ComposeCommands::Show => commands::control::compose_show(&app).await,
                ComposeCommands::Push { file } => {
                    commands::control::compose_push(&app, &file).await
                }
            }
        }

        Commands::RunScript => commands::control::run_script(&open_app().await?).await,

        // no session or config load, so these work with a broken config file
        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
    }
}

async fn open_app() -> Result<commands::App> {
    let config = config::Config::load().context("load config")?;
    commands::App::open(config).await
}
