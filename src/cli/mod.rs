pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub const DEFAULT_BROWSE_LIMIT: usize = 2;

#[derive(Parser)]
#[command(name = "gator")]
#[command(about = "An RSS feed aggregator", long_about = None)]
pub struct Cli {
    /// Path of the config file (default: ~/.config/gator/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path of the SQLite database, overriding the config file
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a user and log in as them
    Register {
        /// Name of the new user
        name: String,
    },
    /// Switch the current user
    Login {
        /// Name of an existing user
        name: String,
    },
    /// Delete every user together with their feeds, follows and posts
    Reset,
    /// List users
    Users,
    /// Fetch feeds forever, one feed per interval
    Agg {
        /// Time between requests (e.g. "30s", "1m", "1h30m")
        time_between_reqs: String,
    },
    /// Add a feed and follow it
    Addfeed {
        /// Display name of the feed
        name: String,
        /// URL of the RSS feed
        url: String,
    },
    /// List all feeds
    Feeds,
    /// Follow an existing feed
    Follow {
        /// URL of the feed
        url: String,
    },
    /// List feeds the current user follows
    Following,
    /// Stop following a feed
    Unfollow {
        /// URL of the feed
        url: String,
    },
    /// Show the newest posts from followed feeds
    Browse {
        /// Maximum number of posts to show
        #[arg(default_value_t = DEFAULT_BROWSE_LIMIT)]
        limit: usize,
    },
}
