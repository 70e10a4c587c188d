pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::{Feed, FeedFollow, InsertOutcome, NewPost, Post, PostWithFeed, User};

pub use sqlite::SqliteStore;

pub trait Store {
    // User operations
    fn create_user(&self, name: &str) -> Result<User>;
    fn get_user(&self, name: &str) -> Result<Option<User>>;
    fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;
    fn get_users(&self) -> Result<Vec<User>>;
    fn delete_all_users(&self) -> Result<usize>;

    // Feed operations
    fn create_feed(&self, feed: &Feed) -> Result<Feed>;
    fn get_feed(&self, id: i64) -> Result<Option<Feed>>;
    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>>;
    fn list_feeds(&self) -> Result<Vec<Feed>>;
    /// The feed with the oldest `last_fetched_at`, never-fetched feeds first.
    fn get_next_feed_to_fetch(&self) -> Result<Option<Feed>>;
    /// Advances `last_fetched_at`; an older timestamp than the stored one is ignored.
    fn mark_feed_fetched(&self, id: i64, fetched_at: DateTime<Utc>) -> Result<()>;

    // Follow operations
    fn create_feed_follow(&self, user_id: i64, feed_id: i64) -> Result<FeedFollow>;
    fn get_feed_follows_for_user(&self, user_id: i64) -> Result<Vec<FeedFollow>>;
    fn delete_feed_follow(&self, user_id: i64, feed_url: &str) -> Result<bool>;

    // Post operations
    fn insert_post(&self, post: &NewPost) -> Result<InsertOutcome>;
    fn get_posts_for_feed(&self, feed_id: i64) -> Result<Vec<Post>>;
    fn get_posts_for_user(&self, user_id: i64, limit: usize) -> Result<Vec<PostWithFeed>>;
}
