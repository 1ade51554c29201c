//! Local list of posts kept in sync with the post service.
//!
//! Every failure is reduced to a short retryable message in
//! [`PostFeed::error`]; the list itself is only touched by successful calls.
//! Results of calls that were started under a different session generation
//! are dropped.

use mereb_types::{NewPost, Post};
use tracing::{debug, warn};

use crate::api::AuthedClient;

pub const FETCH_FAILED: &str = "Error fetching data";
pub const POST_FAILED: &str = "Error posting data";
pub const DELETE_FAILED: &str = "Error deleting post";
/// Shown when the signed-in user's profile cannot be loaded.
pub const PROFILE_FAILED: &str = "Failed to load user data.";

/// Timestamp layout the post service accepts from clients.
const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M";

pub struct PostFeed {
    client: AuthedClient,
    posts: Vec<Post>,
    error: Option<String>,
    loading: bool,
    generation: u64,
}

impl PostFeed {
    pub fn new(client: AuthedClient) -> Self {
        let generation = client.session().generation();
        Self {
            client,
            posts: Vec::new(),
            error: None,
            loading: false,
            generation,
        }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Replaces the local list with the server's.
    pub async fn refresh(&mut self) {
        let Some(generation) = self.begin() else {
            return;
        };

        let result = self.client.list_posts().await;
        if !self.finish(generation) {
            return;
        }
        match result {
            Ok(posts) => {
                debug!(count = posts.len(), "posts fetched");
                self.posts = posts;
                self.error = None;
            }
            Err(e) => {
                warn!("fetching posts failed: {e}");
                self.error = Some(FETCH_FAILED.to_string());
            }
        }
    }

    /// Publishes a post and appends the stored version. Blank content is
    /// ignored without a request.
    pub async fn create(&mut self, content: &str) {
        if content.trim().is_empty() {
            return;
        }
        let Some(generation) = self.begin() else {
            return;
        };

        let body = NewPost {
            content: content.to_string(),
            created_at: chrono::Local::now().format(CREATED_AT_FORMAT).to_string(),
        };
        let result = self.client.create_post(&body).await;
        if !self.finish(generation) {
            return;
        }
        match result {
            Ok(post) => {
                debug!(id = post.id, "post created");
                self.posts.push(post);
                self.error = None;
            }
            Err(e) => {
                warn!("creating post failed: {e}");
                self.error = Some(POST_FAILED.to_string());
            }
        }
    }

    /// Deletes a post and removes exactly the local entries with that id.
    pub async fn delete(&mut self, id: i64) {
        let Some(generation) = self.begin() else {
            return;
        };

        let result = self.client.delete_post(id).await;
        if !self.finish(generation) {
            return;
        }
        match result {
            Ok(_) => {
                debug!(id, "post deleted");
                self.posts.retain(|post| post.id != id);
                self.error = None;
            }
            Err(e) => {
                warn!("deleting post {id} failed: {e}");
                self.error = Some(DELETE_FAILED.to_string());
            }
        }
    }

    /// Drops state from an earlier session and returns the generation the
    /// call runs under, or `None` when there is no session to call with.
    fn begin(&mut self) -> Option<u64> {
        let session = self.client.session();
        let generation = session.generation();
        if generation != self.generation {
            self.posts.clear();
            self.error = None;
            self.generation = generation;
        }
        if !session.is_authenticated() {
            return None;
        }
        self.loading = true;
        Some(generation)
    }

    /// Returns false, and drops everything cached, when the session changed
    /// while the call was outstanding.
    fn finish(&mut self, generation: u64) -> bool {
        self.loading = false;
        let current = self.client.session().generation();
        if current == generation {
            return true;
        }
        debug!(started = generation, current, "session changed; discarding result");
        self.posts.clear();
        self.error = None;
        self.generation = current;
        false
    }
}
