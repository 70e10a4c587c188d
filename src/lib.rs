//! # Gator
//!
//! A multi-user RSS aggregator backed by SQLite.
//!
//! ## Architecture
//!
//! One feed is polled per tick of a fixed interval:
//!
//! ```text
//! Store (least-recently-fetched) → Fetcher → Normalizer → Store (dedup by link)
//! ```
//!
//! - [`scheduler`]: the aggregation loop and its shutdown handle
//! - [`fetcher`]: HTTP download and RSS parsing
//! - [`normalizer`]: publish-date parsing, raw items to insertable posts
//! - [`store`]: SQLite persistence layer
//!
//! ## Quick Start
//!
//! ```bash
//! gator register alice
//! gator addfeed "Rust Blog" https://blog.rust-lang.org/feed.xml
//! gator agg 1m
//! gator browse 10
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// store, fetcher, normalizer and the loaded config.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// `config.toml`: database path and the logged-in user.
pub mod config;

/// Core domain models.
///
/// - [`Feed`](domain::Feed): a subscribed RSS source and its fetch bookkeeping
/// - [`Post`](domain::Post): one stored entry, unique by link
/// - [`User`](domain::User) and [`FeedFollow`](domain::FeedFollow)
pub mod domain;

/// HTTP fetching and RSS parsing.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for feed fetching
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// Publish-date parsing and item normalization.
pub mod normalizer;

/// The periodic aggregation loop.
pub mod scheduler;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
