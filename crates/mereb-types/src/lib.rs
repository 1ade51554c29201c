//! Wire types shared by the mereb crates.
//!
//! Field names follow the backends' JSON (camelCase for the user and post
//! services, `snake_case` for the control backend).

pub mod auth;
pub mod control;
pub mod post;
pub mod user;

pub use auth::{Credentials, Registration, TokenResponse};
pub use control::{ComposeFile, EnvValue, EnvVars, ErrorBody, MessageResponse};
pub use post::{NewPost, Post};
pub use user::UserProfile;
