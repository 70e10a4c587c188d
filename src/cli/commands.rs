use std::sync::Arc;

use url::Url;

use crate::app::{AppContext, GatorError, Result};
use crate::domain::Feed;
use crate::scheduler::{parse_interval, spawn_signal_listener, Scheduler};
use crate::store::Store;

const SEPARATOR: &str = "--------------------------------";

pub fn register(ctx: &mut AppContext, name: &str) -> Result<()> {
    let user = ctx.store.create_user(name)?;
    ctx.set_current_user(&user.name)?;

    println!("User was created: {} (id {})", user.name, user.id);
    println!("Created at {}", user.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    Ok(())
}

pub fn login(ctx: &mut AppContext, name: &str) -> Result<()> {
    let user = ctx
        .store
        .get_user(name)?
        .ok_or_else(|| GatorError::UserNotFound(name.to_string()))?;
    ctx.set_current_user(&user.name)?;

    println!("User has been set: {}", user.name);
    Ok(())
}

pub fn reset(ctx: &AppContext) -> Result<()> {
    let removed = ctx.store.delete_all_users()?;
    println!("Users table cleared ({} removed)", removed);
    Ok(())
}

pub fn list_users(ctx: &AppContext) -> Result<()> {
    let users = ctx.store.get_users()?;

    if users.is_empty() {
        println!("No users");
        return Ok(());
    }

    let current = ctx.config.current_user_name.as_deref();
    for user in users {
        if Some(user.name.as_str()) == current {
            println!("* {} (current)", user.name);
        } else {
            println!("* {}", user.name);
        }
    }
    Ok(())
}

/// Run the aggregation loop until SIGINT/SIGTERM.
///
/// The interval is validated before anything else happens.
pub async fn aggregate(ctx: Arc<AppContext>, time_between_reqs: &str) -> Result<()> {
    let interval = parse_interval(time_between_reqs)?;

    let scheduler = Scheduler::new(ctx, interval);
    spawn_signal_listener(scheduler.shutdown_handle());
    scheduler.run().await
}

pub fn add_feed(ctx: &AppContext, name: &str, url: &str) -> Result<()> {
    let user = ctx.current_user()?;
    validate_feed_url(url)?;

    let feed = ctx
        .store
        .create_feed(&Feed::new(name.to_string(), url.to_string(), user.id))?;
    ctx.store.create_feed_follow(user.id, feed.id)?;

    println!("Added feed: {}", feed.display_name());
    println!("  {}", feed.url);
    println!("{} is now following {}", user.name, feed.display_name());
    Ok(())
}

pub fn list_feeds(ctx: &AppContext) -> Result<()> {
    let feeds = ctx.store.list_feeds()?;

    if feeds.is_empty() {
        println!("No feeds");
        return Ok(());
    }

    println!("Feeds in database:");
    println!("{}", SEPARATOR);
    for feed in feeds {
        let owner = ctx
            .store
            .get_user_by_id(feed.user_id)?
            .map(|u| u.name)
            .unwrap_or_else(|| "(unknown)".to_string());
        println!("{}", feed.display_name());
        println!("{}", feed.url);
        println!("added by {}, last fetched {}", owner, fetched_label(&feed));
        println!("{}", SEPARATOR);
    }
    Ok(())
}

pub fn follow(ctx: &AppContext, url: &str) -> Result<()> {
    let user = ctx.current_user()?;
    let feed = ctx
        .store
        .get_feed_by_url(url)?
        .ok_or_else(|| GatorError::FeedNotFound(url.to_string()))?;

    let follow = ctx
        .store
        .create_feed_follow(user.id, feed.id)
        .map_err(|e| match e {
            GatorError::AlreadyFollowing(_) => GatorError::AlreadyFollowing(url.to_string()),
            other => other,
        })?;

    println!("{} is now following {}", follow.user_name, follow.feed_name);
    Ok(())
}

pub fn following(ctx: &AppContext) -> Result<()> {
    let user = ctx.current_user()?;
    let follows = ctx.store.get_feed_follows_for_user(user.id)?;

    if follows.is_empty() {
        println!("{} is not following any feeds", user.name);
        return Ok(());
    }

    println!("{} is following:", user.name);
    for follow in follows {
        println!("* {}", follow.feed_name);
    }
    Ok(())
}

pub fn unfollow(ctx: &AppContext, url: &str) -> Result<()> {
    let user = ctx.current_user()?;

    if ctx.store.delete_feed_follow(user.id, url)? {
        println!("{} unfollowed {}", user.name, url);
    } else {
        println!("{} was not following {}", user.name, url);
    }
    Ok(())
}

pub fn browse(ctx: &AppContext, limit: usize) -> Result<()> {
    let user = ctx.current_user()?;
    let posts = ctx.store.get_posts_for_user(user.id, limit)?;

    println!("Found {} posts for user {}:", posts.len(), user.name);
    for entry in posts {
        let post = &entry.post;
        println!(
            "{} from {}",
            post.published_at.format("%a %b %e"),
            entry.feed_name
        );
        println!("--- {} ---", post.display_title());
        println!("    {}", post.display_description());
        println!("Link: {}", post.url);
        println!("=====================================");
    }
    Ok(())
}

fn fetched_label(feed: &Feed) -> String {
    feed.last_fetched_at
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "never".to_string())
}

/// Feeds must be absolute http(s) URLs.
fn validate_feed_url(url: &str) -> Result<()> {
    let parsed = Url::parse(url)?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(GatorError::Usage(format!(
            "Unsupported URL scheme '{}': feeds must be http or https",
            other
        ))),
    }
}
