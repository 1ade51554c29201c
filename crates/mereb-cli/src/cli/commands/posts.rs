//! Post command handlers.

use anyhow::{Result, bail};
use mereb_core::feed::PostFeed;
use mereb_core::guard::Route;
use mereb_types::Post;

use super::App;

fn feed(app: &App) -> Result<PostFeed> {
    app.require(Route::Main)?;
    Ok(PostFeed::new(app.authed()))
}

fn check(feed: &PostFeed) -> Result<()> {
    match feed.error() {
        Some(error) => bail!("{error}"),
        None => Ok(()),
    }
}

fn print_post(post: &Post) {
    println!("#{:<6} {}  {}", post.id, post.created_at, post.content);
}

pub async fn list(app: &App) -> Result<()> {
    let mut feed = feed(app)?;
    feed.refresh().await;
    check(&feed)?;

    if feed.posts().is_empty() {
        println!("No posts yet.");
    }
    for post in feed.posts() {
        print_post(post);
    }
    Ok(())
}

pub async fn create(app: &App, content: &str) -> Result<()> {
    if content.trim().is_empty() {
        bail!("Post content cannot be empty");
    }

    let mut feed = feed(app)?;
    feed.create(content).await;
    check(&feed)?;

    if let Some(post) = feed.posts().last() {
        print!("✓ Posted ");
        print_post(post);
    }
    Ok(())
}

pub async fn delete(app: &App, id: i64) -> Result<()> {
    let mut feed = feed(app)?;
    feed.delete(id).await;
    check(&feed)?;

    println!("✓ Deleted post {id}");
    Ok(())
}
