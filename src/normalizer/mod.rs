pub mod date;

pub use date::{parse_date, DateLayout, DATE_LAYOUTS};

use crate::app::Result;
use crate::domain::NewPost;
use crate::fetcher::RssItem;

#[derive(Clone)]
pub struct Normalizer;

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Turns a raw item into an insertable post for `feed_id`.
    ///
    /// Fails with `UnsupportedDateFormat` when the publish date matches none
    /// of the accepted layouts. An empty description is stored as absent.
    pub fn normalize(&self, feed_id: i64, item: &RssItem) -> Result<NewPost> {
        let published_at = parse_date(&item.pub_date)?;
        let description = Some(item.description.trim())
            .filter(|d| !d.is_empty())
            .map(String::from);

        Ok(NewPost {
            feed_id,
            title: item.title.trim().to_string(),
            url: item.link.trim().to_string(),
            description,
            published_at,
        })
    }
}
