use html_escape::decode_html_entities;
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::app::{GatorError, Result};
use crate::fetcher::{RssChannel, RssFeed, RssItem};

/// Parse an RSS 2.0 document into its channel and items.
///
/// Only direct children of `<channel>` and `<item>` are read; prefixed
/// elements such as `<atom:link>` never match the plain RSS names. A field
/// keeps its own character data and skips the text of nested markup. Text
/// fields are HTML-unescaped after XML decoding.
pub fn parse_feed(body: &[u8]) -> Result<RssFeed> {
    let mut reader = Reader::from_reader(body);

    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut channel: Option<RssChannel> = None;
    let mut current_item: Option<RssItem> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match name.as_str() {
                    "channel" if channel.is_none() => channel = Some(RssChannel::default()),
                    "item" if channel.is_some() && current_item.is_none() => {
                        current_item = Some(RssItem::default())
                    }
                    _ => {}
                }
                if is_field_parent(path.last()) {
                    text.clear();
                }
                path.push(name);
            }
            Ok(Event::Empty(e)) => match (path.last().map(String::as_str), e.name().as_ref()) {
                (_, b"channel") if channel.is_none() => channel = Some(RssChannel::default()),
                (Some("channel"), b"item") => {
                    if let Some(ch) = channel.as_mut() {
                        ch.items.push(RssItem::default());
                    }
                }
                _ => {}
            },
            Ok(Event::Text(e)) if in_field(&path) => {
                let unescaped = e
                    .unescape()
                    .map_err(|e| GatorError::Parse(format!("XML text error: {}", e)))?;
                text.push_str(&unescaped);
            }
            Ok(Event::CData(e)) if in_field(&path) => {
                text.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::End(_)) => {
                let name = path.pop().unwrap_or_default();
                let parent = path.last().map(String::as_str);
                let value = if is_field_parent(path.last()) {
                    std::mem::take(&mut text)
                } else {
                    String::new()
                };

                match (parent, name.as_str()) {
                    (Some("channel"), "item") => {
                        if let (Some(ch), Some(item)) = (channel.as_mut(), current_item.take()) {
                            ch.items.push(item);
                        }
                    }
                    (Some("item"), field) => {
                        if let Some(item) = current_item.as_mut() {
                            match field {
                                "title" => item.title = value,
                                "link" => item.link = value,
                                "description" => item.description = value,
                                "pubDate" => item.pub_date = value,
                                _ => {}
                            }
                        }
                    }
                    (Some("channel"), field) => {
                        if let Some(ch) = channel.as_mut() {
                            match field {
                                "title" => ch.title = value,
                                "link" => ch.link = value,
                                "description" => ch.description = value,
                                _ => {}
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(GatorError::Parse(format!(
                    "XML error at position {}: {}",
                    reader.error_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    if !path.is_empty() {
        return Err(GatorError::Parse(format!(
            "unexpected end of document inside <{}>",
            path.join("/")
        )));
    }

    let mut channel =
        channel.ok_or_else(|| GatorError::Parse("missing <channel> element".to_string()))?;
    unescape_channel(&mut channel);

    Ok(RssFeed { channel })
}

/// Direct children of `<channel>` and `<item>` are the fields we collect.
fn is_field_parent(parent: Option<&String>) -> bool {
    matches!(parent.map(String::as_str), Some("channel" | "item"))
}

fn in_field(path: &[String]) -> bool {
    path.len() >= 2 && is_field_parent(path.get(path.len() - 2))
}

fn unescape_channel(channel: &mut RssChannel) {
    channel.title = decode_html_entities(&channel.title).into_owned();
    channel.description = decode_html_entities(&channel.description).into_owned();
    for item in &mut channel.items {
        item.title = decode_html_entities(&item.title).into_owned();
        item.description = decode_html_entities(&item.description).into_owned();
    }
}
