//! Fetching candidate news items from the configured sources.

mod rss;
mod search;

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use log::warn;
use time::OffsetDateTime;
use url::Url;

pub use rss::parse_feed;
pub use search::parse_search;

use crate::{
    config::Config,
    types::{NewsCategory, NewsSourceType},
};

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedItem {
    pub title: String,
    pub summary: String,
    pub content: String,
    pub url: String,
    pub published_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Items(Vec<FetchedItem>),
    Empty,
    Failed(String),
}

impl FetchOutcome {
    pub fn from_items(items: Vec<FetchedItem>) -> Self {
        if items.is_empty() {
            FetchOutcome::Empty
        } else {
            FetchOutcome::Items(items)
        }
    }

    /// Failures are logged by the fetcher and count as "no items" here.
    pub fn into_items(self) -> Vec<FetchedItem> {
        match self {
            FetchOutcome::Items(items) => items,
            FetchOutcome::Empty | FetchOutcome::Failed(_) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    pub source_type: NewsSourceType,
    pub category: NewsCategory,
}

impl SourceConfig {
    fn new(name: &str, url: &str, source_type: NewsSourceType, category: NewsCategory) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            source_type,
            category,
        }
    }
}

pub fn source_catalog() -> Vec<SourceConfig> {
    use NewsCategory as C;
    use NewsSourceType as T;

    vec![
        SourceConfig::new("Dev.to AI", "https://dev.to/feed/tag/ai", T::Rss, C::Ai),
        SourceConfig::new(
            "Hacker News AI",
            "https://hn.algolia.com/api/v1/search?tags=story&query=AI&hitsPerPage=10",
            T::Api,
            C::Ai,
        ),
        SourceConfig::new("Dev.to Web Dev", "https://dev.to/feed/tag/webdev", T::Rss, C::WebDev),
        SourceConfig::new("Dev.to Mobile", "https://dev.to/feed/tag/mobile", T::Rss, C::Mobile),
        SourceConfig::new("Dev.to DevOps", "https://dev.to/feed/tag/devops", T::Rss, C::Devops),
    ]
}

/// Sources for one category, or every source when `category` is `None`.
pub fn sources_for(sources: &[SourceConfig], category: Option<NewsCategory>) -> Vec<SourceConfig> {
    sources
        .iter()
        .filter(|s| category.is_none_or(|c| s.category == c))
        .cloned()
        .collect()
}

/// Trims, drops the fragment and re-serializes. Unparsable URLs yield `None`.
pub fn canonical_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;
    url.set_fragment(None);
    Some(url.to_string())
}

#[async_trait]
pub trait NewsFetcher: Send + Sync {
    /// Never errors: network and parse problems come back as `Failed`.
    async fn fetch(&self, source: &SourceConfig, limit: usize) -> FetchOutcome;
}

pub struct HttpNewsFetcher {
    client: reqwest::Client,
}

impl HttpNewsFetcher {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Self::with_timeout(&config.fetch_user_agent, config.fetch_timeout)
    }

    pub fn with_timeout(user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .context("building news http client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl NewsFetcher for HttpNewsFetcher {
    async fn fetch(&self, source: &SourceConfig, limit: usize) -> FetchOutcome {
        let outcome = match source.source_type {
            NewsSourceType::Rss => rss::fetch_feed(&self.client, &source.url, limit).await,
            NewsSourceType::Api => search::fetch_search(&self.client, &source.url, limit).await,
            NewsSourceType::WebScraping => {
                warn!(
                    "[Fetch News] Web scraping is not supported, skipping {}",
                    source.url
                );
                FetchOutcome::Empty
            }
        };

        if let Some(warning) = fetch_warning(source, &outcome) {
            warn!("[Fetch News] {warning}");
        }

        outcome
    }
}

/// Failures always warrant a warning, and so does a feed that parsed with no
/// entries.
fn fetch_warning(source: &SourceConfig, outcome: &FetchOutcome) -> Option<String> {
    match (outcome, source.source_type) {
        (FetchOutcome::Failed(reason), _) => {
            Some(format!("{} yielded nothing: {reason}", source.url))
        }
        (FetchOutcome::Empty, NewsSourceType::Rss) => {
            Some(format!("{} returned a feed with no entries", source.url))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_covers_every_category_but_general() {
        let catalog = source_catalog();
        assert_eq!(sources_for(&catalog, Some(NewsCategory::Ai)).len(), 2);
        assert_eq!(sources_for(&catalog, Some(NewsCategory::WebDev)).len(), 1);
        assert!(sources_for(&catalog, Some(NewsCategory::GeneralTech)).is_empty());
        assert_eq!(sources_for(&catalog, None).len(), catalog.len());
    }

    #[test]
    fn urls_are_canonicalized() {
        assert_eq!(
            canonical_url("  https://dev.to/post#comments ").as_deref(),
            Some("https://dev.to/post")
        );
        assert_eq!(canonical_url("not a url"), None);
    }

    #[test]
    fn empty_feeds_and_failures_are_warned_about() {
        let feed = SourceConfig::new("Feed", "https://example.com/rss", NewsSourceType::Rss, NewsCategory::Ai);
        let search = SourceConfig::new("Search", "https://example.com/api", NewsSourceType::Api, NewsCategory::Ai);

        assert!(fetch_warning(&feed, &FetchOutcome::Empty).is_some());
        assert!(fetch_warning(&search, &FetchOutcome::Empty).is_none());
        assert!(fetch_warning(&search, &FetchOutcome::Failed("status 500".into())).is_some());
        assert!(fetch_warning(&feed, &FetchOutcome::Items(Vec::new())).is_none());
    }

    #[tokio::test]
    async fn scraping_sources_are_empty() {
        let fetcher = HttpNewsFetcher::with_timeout("test", Duration::from_secs(1)).unwrap();
        let source = SourceConfig::new(
            "Scraped",
            "https://example.com",
            NewsSourceType::WebScraping,
            NewsCategory::GeneralTech,
        );
        assert_eq!(fetcher.fetch(&source, 5).await, FetchOutcome::Empty);
    }
}
