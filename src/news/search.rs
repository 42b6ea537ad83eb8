use log::info;
use serde::Deserialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use super::{FetchOutcome, FetchedItem, canonical_url};
use crate::utils::{now_utc, truncate_chars};

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    title: Option<String>,
    url: Option<String>,
    story_text: Option<String>,
    points: Option<i64>,
    created_at: Option<String>,
}

pub(super) async fn fetch_search(client: &reqwest::Client, url: &str, limit: usize) -> FetchOutcome {
    let res = match client.get(url).send().await {
        Ok(res) => res,
        Err(e) => return FetchOutcome::Failed(format!("request failed: {e}")),
    };

    if !res.status().is_success() {
        return FetchOutcome::Failed(format!("status {}", res.status()));
    }

    match res.bytes().await {
        Ok(bytes) => {
            let outcome = parse_search(&bytes, limit, now_utc());
            if let FetchOutcome::Items(items) = &outcome {
                info!("[Fetch News] {} hits from {url}", items.len());
            }
            outcome
        }
        Err(e) => FetchOutcome::Failed(format!("reading body failed: {e}")),
    }
}

/// Decodes an Algolia search reply. The first `limit` hits are considered,
/// hits missing a title or url are then dropped.
pub fn parse_search(bytes: &[u8], limit: usize, now: OffsetDateTime) -> FetchOutcome {
    let response: SearchResponse = match serde_json::from_slice(bytes) {
        Ok(r) => r,
        Err(e) => return FetchOutcome::Failed(format!("decoding failed: {e}")),
    };

    let items = response
        .hits
        .into_iter()
        .take(limit)
        .filter_map(|hit| {
            let title = hit.title.filter(|t| !t.trim().is_empty())?;
            let url = hit.url.as_deref().and_then(canonical_url)?;

            let story = hit.story_text.filter(|s| !s.trim().is_empty());
            let content = story.as_deref().map_or_else(String::new, |s| truncate_chars(s, 2000));
            let summary = match story {
                Some(text) => truncate_chars(&text, 1000),
                None => format!("Hacker News story with {} points", hit.points.unwrap_or(0)),
            };

            let published_at = hit
                .created_at
                .and_then(|c| OffsetDateTime::parse(&c, &Rfc3339).ok())
                .unwrap_or(now);

            Some(FetchedItem {
                title: title.trim().to_string(),
                summary,
                content,
                url,
                published_at,
            })
        })
        .collect();

    FetchOutcome::from_items(items)
}
