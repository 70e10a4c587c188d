//! The aggregation loop.
//!
//! Every tick the scheduler picks the single least-recently-fetched feed,
//! stamps its `last_fetched_at` *before* fetching, downloads and parses it,
//! and inserts any posts whose link is not stored yet. A feed that fails is
//! still stamped, so an unreachable feed rotates to the back of the queue
//! instead of being retried every tick.

pub mod interval;

pub use interval::{format_interval, parse_interval};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Utc};
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;

use crate::app::{AppContext, GatorError, Result};
use crate::domain::{Feed, InsertOutcome};
use crate::store::Store;

/// Cloneable stop switch shared between the loop and whoever shuts it down.
#[derive(Clone, Default)]
pub struct ShutdownHandle {
    stopped: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
    }

    /// Resolves once [`stop`](Self::stop) has been called.
    pub async fn stopped(&self) {
        loop {
            let notified = self.notify.notified();
            if !self.is_running() {
                return;
            }
            notified.await;
        }
    }
}

/// Summary of one polling cycle that reached the fetch stage successfully.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub feed_id: i64,
    pub feed_name: String,
    pub feed_url: String,
    pub items: usize,
    pub inserted: usize,
    pub duplicates: usize,
}

impl CycleReport {
    fn new(feed: &Feed, items: usize) -> Self {
        Self {
            feed_id: feed.id,
            feed_name: feed.display_name().to_string(),
            feed_url: feed.url.clone(),
            items,
            inserted: 0,
            duplicates: 0,
        }
    }
}

pub struct Scheduler {
    ctx: Arc<AppContext>,
    interval: Duration,
    shutdown: ShutdownHandle,
}

impl Scheduler {
    pub fn new(ctx: Arc<AppContext>, interval: Duration) -> Self {
        Self {
            ctx,
            interval,
            shutdown: ShutdownHandle::new(),
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Run cycles until the shutdown handle is stopped.
    ///
    /// The first cycle starts immediately. Errors from a cycle are reported
    /// and never end the loop.
    pub async fn run(&self) -> Result<()> {
        self.log(&format!(
            "Collecting feeds every {}",
            format_interval(self.interval)
        ));

        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while self.shutdown.is_running() {
            tokio::select! {
                _ = timer.tick() => {}
                _ = self.shutdown.stopped() => break,
            }

            if !self.shutdown.is_running() {
                break;
            }

            match self.run_cycle().await {
                Ok(Some(report)) => self.log(&format!(
                    "  {} new posts, {} already stored ({} items in feed)",
                    report.inserted, report.duplicates, report.items
                )),
                Ok(None) => self.log("No feeds to fetch"),
                Err(GatorError::Cancelled) => break,
                Err(e) => self.log_error(&format!("  Error: {}", e)),
            }
        }

        self.log("Aggregator shutting down...");
        Ok(())
    }

    /// Run a single polling cycle.
    ///
    /// Returns `Ok(None)` when there are no feeds. Items are inserted one by
    /// one; a bad publish date stops the remaining items of this feed but
    /// keeps what was already inserted.
    pub async fn run_cycle(&self) -> Result<Option<CycleReport>> {
        let store = &self.ctx.store;

        let Some(feed) = store.get_next_feed_to_fetch()? else {
            return Ok(None);
        };

        store.mark_feed_fetched(feed.id, Utc::now())?;
        self.log(&format!("Fetching {} <{}>", feed.display_name(), feed.url));

        let result = self.fetch_and_store(&feed).await;
        if let Err(e) = &result {
            tracing::warn!(feed_id = feed.id, url = %feed.url, error = %e, "feed cycle failed");
        }
        result.map(Some)
    }

    async fn fetch_and_store(&self, feed: &Feed) -> Result<CycleReport> {
        let rss = tokio::select! {
            fetched = self.ctx.fetcher.fetch(&feed.url) => fetched?,
            _ = self.shutdown.stopped() => return Err(GatorError::Cancelled),
        };

        let mut report = CycleReport::new(feed, rss.channel.items.len());

        for item in &rss.channel.items {
            let post = self.ctx.normalizer.normalize(feed.id, item)?;
            match self.ctx.store.insert_post(&post)? {
                InsertOutcome::Inserted => {
                    tracing::debug!(feed_id = feed.id, url = %post.url, "inserted post");
                    report.inserted += 1;
                }
                InsertOutcome::AlreadyExists => report.duplicates += 1,
            }
        }

        tracing::info!(
            feed_id = feed.id,
            url = %feed.url,
            inserted = report.inserted,
            duplicates = report.duplicates,
            "feed cycle complete"
        );

        Ok(report)
    }

    fn log(&self, msg: &str) {
        println!("[{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), msg);
    }

    fn log_error(&self, msg: &str) {
        eprintln!("[{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), msg);
    }
}

/// Stop `handle` on SIGINT/SIGTERM (Ctrl-C elsewhere).
pub fn spawn_signal_listener(handle: ShutdownHandle) {
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("shutdown signal received");
        handle.stop();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {},
                _ = sigint.recv() => {},
            }
        }
        _ => ctrl_c().await,
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c().await
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C; only an external kill will stop the aggregator");
        std::future::pending::<()>().await;
    }
}
