//! Scheduler cycles against a mock HTTP server and an in-memory store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gator::app::{AppContext, GatorError};
use gator::domain::Feed;
use gator::fetcher::HttpFetcher;
use gator::scheduler::Scheduler;
use gator::store::Store;

const FEED_A: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>Feed A</title>
    <link>https://a.example</link>
    <atom:link href="https://a.example/rss" rel="self" type="application/rss+xml"/>
    <description>First feed</description>
    <item>
      <title>Tom &amp;amp; Jerry</title>
      <link>https://a.example/posts/1</link>
      <description>Cats &amp;amp; mice</description>
      <pubDate>Mon, 02 Jan 2006 15:04:05 MST</pubDate>
    </item>
    <item>
      <title>Second</title>
      <link>https://a.example/posts/2</link>
      <description><![CDATA[<p>Hello</p>]]></description>
      <pubDate>03 Jan 2006</pubDate>
    </item>
  </channel>
</rss>"#;

const FEED_B: &str = r#"<rss version="2.0"><channel>
  <title>Feed B</title>
  <item><title>Only</title><link>https://b.example/posts/1</link><pubDate>2024-05-01T10:00:00Z</pubDate></item>
</channel></rss>"#;

struct Harness {
    ctx: Arc<AppContext>,
    server: MockServer,
    user_id: i64,
    _dir: TempDir,
}

impl Harness {
    async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(HttpFetcher::new().unwrap());
        let ctx = AppContext::in_memory(fetcher, dir.path().join("config.toml")).unwrap();
        let user_id = ctx.store.create_user("alice").unwrap().id;

        Self {
            ctx: Arc::new(ctx),
            server: MockServer::start().await,
            user_id,
            _dir: dir,
        }
    }

    async fn serve(&self, route: &str, response: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }

    fn add_feed(&self, name: &str, route: &str) -> Feed {
        let url = format!("{}{}", self.server.uri(), route);
        self.ctx
            .store
            .create_feed(&Feed::new(name.to_string(), url, self.user_id))
            .unwrap()
    }

    fn scheduler(&self) -> Scheduler {
        Scheduler::new(self.ctx.clone(), Duration::from_millis(20))
    }
}

#[tokio::test]
async fn test_cycle_stores_unescaped_posts() {
    let h = Harness::start().await;
    h.serve("/a.xml", ResponseTemplate::new(200).set_body_string(FEED_A))
        .await;
    let feed = h.add_feed("A", "/a.xml");

    let report = h.scheduler().run_cycle().await.unwrap().unwrap();
    assert_eq!(report.feed_id, feed.id);
    assert_eq!(report.inserted, 2);

    let posts = h.ctx.store.get_posts_for_feed(feed.id).unwrap();
    let first = posts
        .iter()
        .find(|p| p.url == "https://a.example/posts/1")
        .unwrap();
    assert_eq!(first.title, "Tom & Jerry");
    assert_eq!(first.description.as_deref(), Some("Cats & mice"));
    assert_eq!(
        first.published_at.to_rfc3339(),
        "2006-01-02T15:04:05-07:00"
    );

    let second = posts
        .iter()
        .find(|p| p.url == "https://a.example/posts/2")
        .unwrap();
    assert_eq!(second.description.as_deref(), Some("<p>Hello</p>"));
}

#[tokio::test]
async fn test_repeated_cycles_do_not_duplicate_posts() {
    let h = Harness::start().await;
    h.serve("/a.xml", ResponseTemplate::new(200).set_body_string(FEED_A))
        .await;
    let feed = h.add_feed("A", "/a.xml");
    let scheduler = h.scheduler();

    for _ in 0..3 {
        scheduler.run_cycle().await.unwrap();
    }

    let report = scheduler.run_cycle().await.unwrap().unwrap();
    assert_eq!((report.inserted, report.duplicates), (0, 2));
    assert_eq!(h.ctx.store.get_posts_for_feed(feed.id).unwrap().len(), 2);
}

#[tokio::test]
async fn test_least_recently_fetched_rotation() {
    let h = Harness::start().await;
    h.serve("/a.xml", ResponseTemplate::new(200).set_body_string(FEED_A))
        .await;
    h.serve("/b.xml", ResponseTemplate::new(200).set_body_string(FEED_B))
        .await;

    let b = h.add_feed("B", "/b.xml");
    let a = h.add_feed("A", "/a.xml");
    h.ctx
        .store
        .mark_feed_fetched(b.id, Utc::now() - ChronoDuration::hours(1))
        .unwrap();

    let scheduler = h.scheduler();
    assert_eq!(scheduler.run_cycle().await.unwrap().unwrap().feed_id, a.id);
    assert_eq!(scheduler.run_cycle().await.unwrap().unwrap().feed_id, b.id);
    assert_eq!(scheduler.run_cycle().await.unwrap().unwrap().feed_id, a.id);
}

#[tokio::test]
async fn test_http_failure_still_marks_feed() {
    let h = Harness::start().await;
    h.serve("/down.xml", ResponseTemplate::new(500)).await;
    let feed = h.add_feed("Down", "/down.xml");

    let err = h.scheduler().run_cycle().await.unwrap_err();
    assert!(matches!(err, GatorError::Network(_)));

    let stored = h.ctx.store.get_feed(feed.id).unwrap().unwrap();
    assert!(stored.last_fetched_at.is_some());
    assert!(h.ctx.store.get_posts_for_feed(feed.id).unwrap().is_empty());
}

#[tokio::test]
async fn test_unparsable_body_still_marks_feed() {
    let h = Harness::start().await;
    h.serve(
        "/broken.xml",
        ResponseTemplate::new(200).set_body_string("<rss><channel><title>cut off"),
    )
    .await;
    let feed = h.add_feed("Broken", "/broken.xml");

    let err = h.scheduler().run_cycle().await.unwrap_err();
    assert!(matches!(err, GatorError::Parse(_)));

    let stored = h.ctx.store.get_feed(feed.id).unwrap().unwrap();
    assert!(stored.last_fetched_at.is_some());
}

#[tokio::test]
async fn test_failing_feed_does_not_starve_others() {
    let h = Harness::start().await;
    h.serve("/down.xml", ResponseTemplate::new(404)).await;
    h.serve("/b.xml", ResponseTemplate::new(200).set_body_string(FEED_B))
        .await;
    h.add_feed("Down", "/down.xml");
    let b = h.add_feed("B", "/b.xml");

    let scheduler = h.scheduler();
    assert!(scheduler.run_cycle().await.is_err());
    let report = scheduler.run_cycle().await.unwrap().unwrap();
    assert_eq!(report.feed_id, b.id);
    assert_eq!(report.inserted, 1);
}

#[tokio::test]
async fn test_run_loop_stops_on_shutdown() {
    let h = Harness::start().await;
    h.serve("/b.xml", ResponseTemplate::new(200).set_body_string(FEED_B))
        .await;
    let b = h.add_feed("B", "/b.xml");

    let scheduler = Arc::new(h.scheduler());
    let handle = scheduler.shutdown_handle();
    let runner = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.run().await })
    };

    for _ in 0..200 {
        if !h.ctx.store.get_posts_for_feed(b.id).unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    handle.stop();

    tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("scheduler did not stop")
        .unwrap()
        .unwrap();

    assert_eq!(h.ctx.store.get_posts_for_feed(b.id).unwrap().len(), 1);
}

#[tokio::test]
async fn test_shutdown_drops_in_flight_fetch() {
    let h = Harness::start().await;
    h.serve(
        "/slow.xml",
        ResponseTemplate::new(200)
            .set_body_string(FEED_B)
            .set_delay(Duration::from_secs(30)),
    )
    .await;
    let slow = h.add_feed("Slow", "/slow.xml");

    let scheduler = Arc::new(h.scheduler());
    let handle = scheduler.shutdown_handle();
    let runner = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.run().await })
    };

    // The feed is stamped right before the request goes out
    for _ in 0..200 {
        let feed = h.ctx.store.get_feed(slow.id).unwrap().unwrap();
        if feed.last_fetched_at.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!runner.is_finished());
    handle.stop();

    tokio::time::timeout(Duration::from_secs(2), runner)
        .await
        .expect("scheduler kept waiting on the fetch")
        .unwrap()
        .unwrap();

    let stored = h.ctx.store.get_feed(slow.id).unwrap().unwrap();
    assert!(stored.last_fetched_at.is_some());
    assert!(h.ctx.store.get_posts_for_feed(slow.id).unwrap().is_empty());
}
