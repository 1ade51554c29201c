//! Core mereb library (session, navigation guard, API clients, config).

pub mod api;
pub mod config;
pub mod feed;
pub mod guard;
pub mod logging;
pub mod session;
pub mod store;
pub mod token;
