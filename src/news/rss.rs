use feed_rs::{model::Entry, parser};
use log::{info, warn};
use reqwest::header::ACCEPT;
use time::OffsetDateTime;

use super::{FetchOutcome, FetchedItem, canonical_url};
use crate::utils::{now_utc, truncate_chars};

const FEED_ACCEPT: &str = "application/rss+xml, application/atom+xml, application/xml;q=0.9, text/xml;q=0.8, */*;q=0.5";

pub(super) async fn fetch_feed(client: &reqwest::Client, url: &str, limit: usize) -> FetchOutcome {
    let res = match client.get(url).header(ACCEPT, FEED_ACCEPT).send().await {
        Ok(res) => res,
        Err(e) => return FetchOutcome::Failed(format!("request failed: {e}")),
    };

    if !res.status().is_success() {
        return FetchOutcome::Failed(format!("status {}", res.status()));
    }

    let bytes = match res.bytes().await {
        Ok(bytes) => bytes,
        Err(e) => return FetchOutcome::Failed(format!("reading body failed: {e}")),
    };

    // feed-rs parsing is synchronous
    let now = now_utc();
    let parsed = tokio::task::spawn_blocking(move || parse_feed(&bytes, limit, now)).await;
    match parsed {
        Ok(outcome) => {
            if let FetchOutcome::Items(items) = &outcome {
                info!("[Fetch News] {} items from {url}", items.len());
            }
            outcome
        }
        Err(e) => FetchOutcome::Failed(format!("parser task failed: {e}")),
    }
}

/// Parses up to `limit` entries. `now` stands in for missing publish dates.
pub fn parse_feed(bytes: &[u8], limit: usize, now: OffsetDateTime) -> FetchOutcome {
    let feed = match parser::parse(bytes) {
        Ok(feed) => feed,
        Err(e) => return FetchOutcome::Failed(format!("parsing failed: {e}")),
    };

    let items = feed
        .entries
        .into_iter()
        .take(limit)
        .filter_map(|entry| entry_to_item(entry, now))
        .collect();

    FetchOutcome::from_items(items)
}

fn entry_url(entry: &Entry) -> Option<String> {
    let html = entry.links.iter().find(|link| {
        matches!(link.rel.as_deref(), Some("alternate" | "self"))
            && link.media_type.as_deref() == Some("text/html")
    });

    if let Some(link) = html.or_else(|| entry.links.first()) {
        return Some(link.href.clone());
    }

    entry
        .content
        .as_ref()
        .and_then(|c| c.src.as_ref())
        .map(|src| src.href.clone())
}

fn to_offset(ts: Option<i64>) -> Option<OffsetDateTime> {
    ts.and_then(|t| OffsetDateTime::from_unix_timestamp(t).ok())
}

fn entry_to_item(entry: Entry, now: OffsetDateTime) -> Option<FetchedItem> {
    let Some(url) = entry_url(&entry).and_then(|u| canonical_url(&u)) else {
        warn!("[Fetch News] Dropping feed entry {} without a usable url", entry.id);
        return None;
    };

    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .unwrap_or_default();
    let summary = entry
        .summary
        .as_ref()
        .map(|s| s.content.as_str())
        .unwrap_or_default();
    let body = entry
        .content
        .as_ref()
        .and_then(|c| c.body.as_deref())
        .unwrap_or(summary);

    let published_at = to_offset(entry.published.map(|d| d.timestamp()))
        .or_else(|| to_offset(entry.updated.map(|d| d.timestamp())))
        .unwrap_or(now);

    Some(FetchedItem {
        title,
        summary: truncate_chars(summary, 1000),
        content: truncate_chars(body, 2000),
        url,
        published_at,
    })
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>DEV Community</title>
    <link>https://dev.to</link>
    <description>Posts tagged ai</description>
    <item>
      <title>Shipping agents to production with Rust</title>
      <link>https://dev.to/a/agents#comments</link>
      <pubDate>Mon, 06 Jan 2025 10:00:00 GMT</pubDate>
      <description>Lessons learned running LLM agents.</description>
    </item>
    <item>
      <title>Undated post about React hooks</title>
      <link>https://dev.to/b/hooks</link>
      <description>Hooks, again.</description>
    </item>
    <item>
      <title>Third post</title>
      <link>https://dev.to/c/third</link>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn parses_items_with_fallbacks() {
        let now = datetime!(2025-01-07 00:00 UTC);
        let FetchOutcome::Items(items) = parse_feed(RSS.as_bytes(), 2, now) else {
            panic!("expected items");
        };

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url, "https://dev.to/a/agents");
        assert_eq!(items[0].published_at, datetime!(2025-01-06 10:00 UTC));
        assert_eq!(items[0].summary, "Lessons learned running LLM agents.");
        assert_eq!(items[0].content, items[0].summary);
        assert_eq!(items[1].published_at, now);
    }

    #[test]
    fn malformed_feed_fails_softly() {
        let outcome = parse_feed(b"<html>not a feed", 5, now_utc());
        assert!(matches!(outcome, FetchOutcome::Failed(_)));
    }

    #[test]
    fn empty_channel_is_empty() {
        let xml = r#"<rss version="2.0"><channel><title>t</title></channel></rss>"#;
        assert_eq!(parse_feed(xml.as_bytes(), 5, now_utc()), FetchOutcome::Empty);
    }
}
