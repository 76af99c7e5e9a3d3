//! Raw feed records
//!
//! Parses RSS/Atom payloads into a flat record shape that the normalizer
//! understands regardless of which syndication format produced it.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::NewsError;

/// One entry of a syndication feed before normalization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFeedRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    /// RFC 3339 publish date (Atom, or pre-normalized feeds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iso_date: Option<String>,
    /// Legacy RFC 2822 publish date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pub_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Dublin Core creator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enclosure_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub itunes_image: Option<String>,
    /// `media:content` url
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_content: Option<String>,
    /// `media:thumbnail` url
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_thumbnail: Option<String>,
}

impl RawFeedRecord {
    /// Flatten an RSS 2.0 item
    pub fn from_rss_item(item: &rss::Item) -> Self {
        let (media_content, media_thumbnail) = extract_media_urls(item);
        let description = item.description().map(str::to_string);

        Self {
            title: item.title().map(str::to_string),
            link: item.link().map(str::to_string),
            guid: item.guid().map(|g| g.value().to_string()),
            iso_date: None,
            pub_date: item.pub_date().map(str::to_string),
            author: item.author().map(str::to_string),
            creator: item
                .dublin_core_ext()
                .and_then(|dc| dc.creators().first().cloned()),
            content_snippet: description.clone(),
            summary: None,
            content: item.content().map(str::to_string).or(description),
            enclosure_url: item.enclosure().map(|e| e.url().to_string()),
            itunes_image: item
                .itunes_ext()
                .and_then(|it| it.image())
                .map(str::to_string),
            media_content,
            media_thumbnail,
        }
    }

    /// Flatten an Atom entry
    pub fn from_atom_entry(entry: &atom_syndication::Entry) -> Self {
        let published = entry
            .published()
            .copied()
            .unwrap_or_else(|| *entry.updated());

        Self {
            title: Some(entry.title().to_string()),
            link: entry.links().first().map(|l| l.href().to_string()),
            guid: Some(entry.id().to_string()),
            iso_date: Some(published.with_timezone(&Utc).to_rfc3339()),
            pub_date: None,
            author: entry.authors().first().map(|a| a.name().to_string()),
            creator: None,
            content_snippet: None,
            summary: entry.summary().map(|s| s.as_str().to_string()),
            content: entry
                .content()
                .and_then(|c| c.value())
                .map(str::to_string),
            enclosure_url: None,
            itunes_image: None,
            media_content: None,
            media_thumbnail: None,
        }
    }
}

/// Parse a feed payload, trying RSS first and then Atom
pub fn parse_feed_bytes(content: &[u8]) -> Result<Vec<RawFeedRecord>, NewsError> {
    if let Ok(channel) = rss::Channel::read_from(content) {
        debug!("Parsed RSS channel '{}' with {} items", channel.title(), channel.items().len());
        return Ok(channel.items().iter().map(RawFeedRecord::from_rss_item).collect());
    }

    if let Ok(feed) = atom_syndication::Feed::read_from(content) {
        debug!("Parsed Atom feed with {} entries", feed.entries().len());
        return Ok(feed.entries().iter().map(RawFeedRecord::from_atom_entry).collect());
    }

    Err(NewsError::ParseError(
        "payload is neither RSS nor Atom".to_string(),
    ))
}

/// Image urls from the RSS `media` namespace: (`media:content`, `media:thumbnail`)
fn extract_media_urls(item: &rss::Item) -> (Option<String>, Option<String>) {
    let Some(media) = item.extensions().get("media") else {
        return (None, None);
    };

    let content = media.get("content").and_then(|list| {
        list.iter().find_map(|ext| ext.attrs().get("url").cloned())
    });
    let thumbnail = media.get("thumbnail").and_then(|list| {
        list.iter().find_map(|ext| ext.attrs().get("url").cloned())
    });

    (content, thumbnail)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Example</title>
    <link>https://example.com</link>
    <description>Example feed</description>
    <item>
      <title>OpenAI releases GPT-5</title>
      <link>https://example.com/gpt5?utm_source=rss</link>
      <guid>https://example.com/gpt5</guid>
      <pubDate>Tue, 10 Jun 2025 04:00:00 GMT</pubDate>
      <dc:creator>Jane Doe</dc:creator>
      <description>&lt;p&gt;The &lt;b&gt;model&lt;/b&gt; is out.&lt;/p&gt;</description>
      <media:thumbnail url="https://example.com/thumb.jpg"/>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Example</title>
  <id>urn:example</id>
  <updated>2025-06-10T04:00:00Z</updated>
  <entry>
    <title>Apple announces new MacBook</title>
    <id>urn:entry:1</id>
    <link href="https://apple.example/macbook/"/>
    <updated>2025-06-10T05:00:00Z</updated>
    <summary>Thinner and faster.</summary>
    <author><name>Tim</name></author>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_item() {
        let records = parse_feed_bytes(RSS.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.title.as_deref(), Some("OpenAI releases GPT-5"));
        assert_eq!(r.link.as_deref(), Some("https://example.com/gpt5?utm_source=rss"));
        assert_eq!(r.creator.as_deref(), Some("Jane Doe"));
        assert_eq!(r.media_thumbnail.as_deref(), Some("https://example.com/thumb.jpg"));
        assert!(r.pub_date.is_some());
        assert!(r.content_snippet.as_deref().unwrap_or_default().contains("model"));
    }

    #[test]
    fn test_parse_atom_entry() {
        let records = parse_feed_bytes(ATOM.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.link.as_deref(), Some("https://apple.example/macbook/"));
        assert_eq!(r.summary.as_deref(), Some("Thinner and faster."));
        assert_eq!(r.author.as_deref(), Some("Tim"));
        assert!(r.iso_date.as_deref().unwrap().starts_with("2025-06-10T05:00:00"));
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(matches!(
            parse_feed_bytes(b"{\"hits\": []}"),
            Err(NewsError::ParseError(_))
        ));
    }
}
