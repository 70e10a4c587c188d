use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{GatorError, Result};
use crate::domain::{Feed, FeedFollow, InsertOutcome, NewPost, Post, PostWithFeed, User};
use crate::store::Store;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const FEED_COLUMNS: &str =
    "id, name, url, user_id, created_at, updated_at, last_fetched_at";

const POST_COLUMNS: &str =
    "p.id, p.feed_id, p.title, p.url, p.description, p.published_at, p.created_at, p.updated_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        // Other gator invocations may hold the file while the aggregator runs.
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;

        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| GatorError::Migration(e.to_string()))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            GatorError::Store(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    /// Fixed-width UTC form so that text comparison in SQL is chronological.
    fn format_utc(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn utc_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
        Ok(row
            .get::<_, String>(idx)
            .ok()
            .and_then(|s| Self::parse_datetime(&s))
            .unwrap_or_else(Utc::now))
    }

    fn feed_from_row(row: &Row<'_>) -> rusqlite::Result<Feed> {
        Ok(Feed {
            id: row.get(0)?,
            name: row.get(1)?,
            url: row.get(2)?,
            user_id: row.get(3)?,
            created_at: Self::utc_column(row, 4)?,
            updated_at: Self::utc_column(row, 5)?,
            last_fetched_at: row
                .get::<_, Option<String>>(6)?
                .and_then(|s| Self::parse_datetime(&s)),
        })
    }

    fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: Self::utc_column(row, 2)?,
            updated_at: Self::utc_column(row, 3)?,
        })
    }

    fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
        let published: String = row.get(5)?;
        let published_at = DateTime::<FixedOffset>::parse_from_rfc3339(&published)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?;

        Ok(Post {
            id: row.get(0)?,
            feed_id: row.get(1)?,
            title: row.get(2)?,
            url: row.get(3)?,
            description: row.get(4)?,
            published_at,
            created_at: Self::utc_column(row, 6)?,
            updated_at: Self::utc_column(row, 7)?,
        })
    }

    fn follow_by_id(conn: &Connection, id: i64) -> Result<FeedFollow> {
        let follow = conn.query_row(
            "SELECT ff.id, ff.user_id, ff.feed_id, u.name, f.name, ff.created_at
             FROM feed_follows ff
             JOIN users u ON u.id = ff.user_id
             JOIN feeds f ON f.id = ff.feed_id
             WHERE ff.id = ?1",
            params![id],
            Self::follow_from_row,
        )?;
        Ok(follow)
    }

    fn follow_from_row(row: &Row<'_>) -> rusqlite::Result<FeedFollow> {
        Ok(FeedFollow {
            id: row.get(0)?,
            user_id: row.get(1)?,
            feed_id: row.get(2)?,
            user_name: row.get(3)?,
            feed_name: row.get(4)?,
            created_at: Self::utc_column(row, 5)?,
        })
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

impl Store for SqliteStore {
    fn create_user(&self, name: &str) -> Result<User> {
        let conn = self.conn()?;
        let now = Utc::now();

        let inserted = conn.execute(
            "INSERT INTO users (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![name, Self::format_utc(&now)],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(GatorError::UserExists(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        }

        Ok(User {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    fn get_user(&self, name: &str) -> Result<Option<User>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                "SELECT id, name, created_at, updated_at FROM users WHERE name = ?1",
                params![name],
                Self::user_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                "SELECT id, name, created_at, updated_at FROM users WHERE id = ?1",
                params![id],
                Self::user_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn get_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;

        let mut stmt =
            conn.prepare("SELECT id, name, created_at, updated_at FROM users ORDER BY name")?;
        let users = stmt
            .query_map([], Self::user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    fn delete_all_users(&self) -> Result<usize> {
        let conn = self.conn()?;
        Ok(conn.execute("DELETE FROM users", [])?)
    }

    fn create_feed(&self, feed: &Feed) -> Result<Feed> {
        let conn = self.conn()?;

        let inserted = conn.execute(
            "INSERT INTO feeds (name, url, user_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                feed.name,
                feed.url,
                feed.user_id,
                Self::format_utc(&feed.created_at),
                Self::format_utc(&feed.updated_at)
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(GatorError::FeedExists(feed.url.clone()))
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Feed {
            id: conn.last_insert_rowid(),
            last_fetched_at: None,
            ..feed.clone()
        })
    }

    fn get_feed(&self, id: i64) -> Result<Option<Feed>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                &format!("SELECT {FEED_COLUMNS} FROM feeds WHERE id = ?1"),
                params![id],
                Self::feed_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                &format!("SELECT {FEED_COLUMNS} FROM feeds WHERE url = ?1"),
                params![url],
                Self::feed_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn list_feeds(&self) -> Result<Vec<Feed>> {
        let conn = self.conn()?;

        let mut stmt =
            conn.prepare(&format!("SELECT {FEED_COLUMNS} FROM feeds ORDER BY name, url"))?;
        let feeds = stmt
            .query_map([], Self::feed_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(feeds)
    }

    fn get_next_feed_to_fetch(&self) -> Result<Option<Feed>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                &format!(
                    "SELECT {FEED_COLUMNS} FROM feeds
                     ORDER BY last_fetched_at IS NOT NULL, last_fetched_at, id
                     LIMIT 1"
                ),
                [],
                Self::feed_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn mark_feed_fetched(&self, id: i64, fetched_at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;
        let ts = Self::format_utc(&fetched_at);

        let changed = conn.execute(
            "UPDATE feeds SET last_fetched_at = ?1, updated_at = ?1
             WHERE id = ?2 AND (last_fetched_at IS NULL OR last_fetched_at < ?1)",
            params![ts, id],
        )?;

        if changed == 0 {
            let exists: i64 = conn.query_row(
                "SELECT COUNT(*) FROM feeds WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )?;
            if exists == 0 {
                return Err(GatorError::FeedNotFound(id.to_string()));
            }
        }

        Ok(())
    }

    fn create_feed_follow(&self, user_id: i64, feed_id: i64) -> Result<FeedFollow> {
        let conn = self.conn()?;
        let now = Self::format_utc(&Utc::now());

        let inserted = conn.execute(
            "INSERT INTO feed_follows (user_id, feed_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            params![user_id, feed_id, now],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(GatorError::AlreadyFollowing(feed_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        }

        Self::follow_by_id(&conn, conn.last_insert_rowid())
    }

    fn get_feed_follows_for_user(&self, user_id: i64) -> Result<Vec<FeedFollow>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT ff.id, ff.user_id, ff.feed_id, u.name, f.name, ff.created_at
             FROM feed_follows ff
             JOIN users u ON u.id = ff.user_id
             JOIN feeds f ON f.id = ff.feed_id
             WHERE ff.user_id = ?1
             ORDER BY ff.created_at, ff.id",
        )?;
        let follows = stmt
            .query_map(params![user_id], Self::follow_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(follows)
    }

    fn delete_feed_follow(&self, user_id: i64, feed_url: &str) -> Result<bool> {
        let conn = self.conn()?;

        let removed = conn.execute(
            "DELETE FROM feed_follows
             WHERE user_id = ?1 AND feed_id = (SELECT id FROM feeds WHERE url = ?2)",
            params![user_id, feed_url],
        )?;

        Ok(removed > 0)
    }

    fn insert_post(&self, post: &NewPost) -> Result<InsertOutcome> {
        let conn = self.conn()?;
        let now = Self::format_utc(&Utc::now());

        // Only the url uniqueness conflict is swallowed; other constraint
        // failures (unknown feed, NOT NULL) still surface.
        let inserted = conn.execute(
            "INSERT INTO posts (feed_id, title, url, description, published_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT(url) DO NOTHING",
            params![
                post.feed_id,
                post.title,
                post.url,
                post.description,
                post.published_at.to_rfc3339_opts(SecondsFormat::AutoSi, false),
                now
            ],
        )?;

        Ok(if inserted == 0 {
            InsertOutcome::AlreadyExists
        } else {
            InsertOutcome::Inserted
        })
    }

    fn get_posts_for_feed(&self, feed_id: i64) -> Result<Vec<Post>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {POST_COLUMNS} FROM posts p
             WHERE p.feed_id = ?1
             ORDER BY julianday(p.published_at) DESC, p.id DESC"
        ))?;
        let posts = stmt
            .query_map(params![feed_id], Self::post_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(posts)
    }

    fn get_posts_for_user(&self, user_id: i64, limit: usize) -> Result<Vec<PostWithFeed>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {POST_COLUMNS}, f.name FROM posts p
             JOIN feeds f ON f.id = p.feed_id
             JOIN feed_follows ff ON ff.feed_id = p.feed_id
             WHERE ff.user_id = ?1
             ORDER BY julianday(p.published_at) DESC, p.id DESC
             LIMIT ?2"
        ))?;
        let posts = stmt
            .query_map(params![user_id, limit as i64], |row| {
                Ok(PostWithFeed {
                    post: Self::post_from_row(row)?,
                    feed_name: row.get(8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(posts)
    }
}
