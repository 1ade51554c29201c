//! Post service payloads.

use serde::{Deserialize, Serialize};

/// A post as returned by `GET /posts` and `POST /posts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    /// Server timestamp, kept verbatim.
    pub created_at: String,
}

/// Body of `POST /posts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPost {
    pub content: String,
    /// Local time, `YYYY-MM-DDTHH:MM`.
    pub created_at: String,
}
