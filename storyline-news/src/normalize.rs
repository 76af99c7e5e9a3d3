//! Normalize raw feed records into canonical items

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use tracing::debug;

use storyline_core::{Item, SourceType};

use crate::canonical::{canonicalize, domain_from_url, stable_id};
use crate::record::RawFeedRecord;

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script.*?</script>").expect("valid regex"));
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style.*?</style>").expect("valid regex"));
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[^>]+>").expect("valid regex"));
static IMG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img[^>]+src=["']([^"']+)["']"#).expect("valid regex")
});

/// A normalized item together with its dedup key and lead image candidate
#[derive(Debug, Clone)]
pub struct NormalizedItem {
    pub item: Item,
    pub canonical_url: String,
    pub image_url: Option<String>,
}

/// Convert one feed record into an item
///
/// Returns `None` when neither the record nor `default_url` yields a URL, or
/// when the title is missing or blank.
pub fn normalize_record(
    record: &RawFeedRecord,
    source_id: &str,
    source_type: SourceType,
    default_url: Option<&str>,
) -> Option<NormalizedItem> {
    let url = pick_url(record).or_else(|| default_url.map(canonicalize))?;
    let title = non_blank(record.title.as_deref())?;

    let id = stable_id(&[source_id, url.as_str()]);
    let published_at = pick_published_at(record);

    let mut item = match Item::new(id, source_id, source_type, title, url.clone(), published_at) {
        Ok(item) => item,
        Err(e) => {
            debug!("Dropping record from {}: {}", source_id, e);
            return None;
        }
    };

    let image_url = pick_image_url(record);
    item.author = non_blank(record.author.as_deref()).or_else(|| non_blank(record.creator.as_deref()));
    item.summary = pick_summary(record);
    item.domain = domain_from_url(&url);
    item.image_url = image_url.clone();
    item.raw = serde_json::to_value(record).unwrap_or_default();

    Some(NormalizedItem {
        item,
        canonical_url: url,
        image_url,
    })
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn pick_url(record: &RawFeedRecord) -> Option<String> {
    non_blank(record.link.as_deref())
        .or_else(|| non_blank(record.guid.as_deref()))
        .map(|u| canonicalize(&u))
}

fn pick_summary(record: &RawFeedRecord) -> String {
    record
        .content_snippet
        .as_deref()
        .or(record.summary.as_deref())
        .or(record.content.as_deref())
        .map(strip_html)
        .unwrap_or_default()
}

fn pick_published_at(record: &RawFeedRecord) -> DateTime<Utc> {
    record
        .iso_date
        .as_deref()
        .and_then(parse_date)
        .or_else(|| record.pub_date.as_deref().and_then(parse_date))
        .unwrap_or_else(Utc::now)
}

/// Lead image: enclosure, itunes image, media content, media thumbnail, then
/// the first `<img>` in the HTML body
pub fn pick_image_url(record: &RawFeedRecord) -> Option<String> {
    non_blank(record.enclosure_url.as_deref())
        .or_else(|| non_blank(record.itunes_image.as_deref()))
        .or_else(|| non_blank(record.media_content.as_deref()))
        .or_else(|| non_blank(record.media_thumbnail.as_deref()))
        .or_else(|| {
            record
                .content
                .as_deref()
                .or(record.summary.as_deref())
                .and_then(first_image_from_html)
        })
}

/// Parse the date formats seen in feeds
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(d) = DateTime::parse_from_rfc3339(raw) {
        return Some(d.with_timezone(&Utc));
    }
    if let Ok(d) = DateTime::parse_from_rfc2822(raw) {
        return Some(d.with_timezone(&Utc));
    }
    if let Ok(d) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(d.and_utc());
    }
    if let Ok(d) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(d.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
}

/// Extract the first `<img src>` from HTML content
pub fn first_image_from_html(html: &str) -> Option<String> {
    IMG_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Strip HTML tags, scripts and styles, decoding basic entities
pub fn strip_html(html: &str) -> String {
    let text = SCRIPT_RE.replace_all(html, "");
    let text = STYLE_RE.replace_all(&text, "");
    let text = TAG_RE.replace_all(&text, " ");

    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
