use async_trait::async_trait;
use reqwest::Client;

use crate::app::Result;
use crate::fetcher::rss::parse_feed;
use crate::fetcher::{Fetcher, RssFeed};

pub const USER_AGENT: &str = "gator";

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .gzip(true)
            .brotli(true)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<RssFeed> {
        let response = self.client.get(url).send().await?;
        let response = response.error_for_status()?;
        let body = response.bytes().await?;

        tracing::debug!(url, bytes = body.len(), "fetched feed body");

        parse_feed(&body)
    }
}
