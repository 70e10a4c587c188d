pub mod http_fetcher;
pub mod rss;

use async_trait::async_trait;

use crate::app::Result;

pub use http_fetcher::HttpFetcher;

/// A parsed RSS document. Only the `<channel>` is kept.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RssFeed {
    pub channel: RssChannel,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RssChannel {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<RssItem>,
}

/// One `<item>` as it came off the wire; `pub_date` is still unparsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RssItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: String,
}

#[async_trait]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<RssFeed>;
}
