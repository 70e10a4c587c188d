pub mod feed;
pub mod post;
pub mod user;

pub use feed::Feed;
pub use post::{InsertOutcome, NewPost, Post, PostWithFeed};
pub use user::{FeedFollow, User};
