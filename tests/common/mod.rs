#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use actix_web::web;
use async_trait::async_trait;
use libsql::Connection;
use mockmate::{
    ai::{Completion, TextGenerator},
    config::Config,
    db,
    news::{FetchOutcome, FetchedItem, NewsFetcher, SourceConfig},
    types::{AppState, NewsCategory, NewsSourceType},
    utils::now_utc,
};
use tempfile::TempDir;

/// Serves canned items per source url and counts calls.
#[derive(Default)]
pub struct FakeFetcher {
    items: Mutex<HashMap<String, Vec<FetchedItem>>>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn set(&self, url: &str, items: Vec<FetchedItem>) {
        self.items.lock().unwrap().insert(url.to_string(), items);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NewsFetcher for FakeFetcher {
    async fn fetch(&self, source: &SourceConfig, limit: usize) -> FetchOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let items = self
            .items
            .lock()
            .unwrap()
            .get(&source.url)
            .cloned()
            .unwrap_or_default();
        FetchOutcome::from_items(items.into_iter().take(limit).collect())
    }
}

/// Answers only prompts that mention one of `roles`, fails the rest. Tracks
/// how many calls were ever in flight at once.
pub struct FakeGenerator {
    roles: Vec<&'static str>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakeGenerator {
    pub fn answering(roles: &[&'static str]) -> Self {
        Self {
            roles: roles.to_vec(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        Self { delay, ..self }
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn failing() -> Self {
        Self::answering(&[])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn complete(&self, request: Completion) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let role = self
            .roles
            .iter()
            .find(|r| request.prompt.contains(&format!("for a {r} developer position")));

        match role {
            Some(role) => Ok(format!(
                "QUESTION: How would you apply this as a {role} engineer?\nREASONING: Timely."
            )),
            None => anyhow::bail!("model unavailable"),
        }
    }
}

pub const FEED_URL: &str = "https://feeds.test/devops";

pub fn test_source() -> SourceConfig {
    SourceConfig {
        name: "Test DevOps".into(),
        url: FEED_URL.into(),
        source_type: NewsSourceType::Rss,
        category: NewsCategory::Devops,
    }
}

pub fn news_item(url: &str, title: &str) -> FetchedItem {
    FetchedItem {
        title: title.into(),
        summary: "Summary of the story".into(),
        content: "Body of the story".into(),
        url: url.into(),
        published_at: now_utc(),
    }
}

pub struct TestApp {
    _dir: TempDir,
    pub state: web::Data<AppState>,
    pub fetcher: Arc<FakeFetcher>,
    pub generator: Arc<FakeGenerator>,
}

impl TestApp {
    pub async fn conn(&self) -> Connection {
        db::connect(&self.state.db).await.unwrap()
    }

    pub async fn count(&self, sql: &str) -> i64 {
        let conn = self.conn().await;
        let mut rows = conn.query(sql, ()).await.unwrap();
        let row = rows.next().await.unwrap().unwrap();
        row.get(0).unwrap()
    }
}

pub async fn test_app(generator: FakeGenerator, config: Config) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        database_url: dir.path().join("mockmate.db").to_string_lossy().into_owned(),
        ..config
    };

    let database = db::get_database(&config).await.unwrap();
    let conn = db::connect(&database).await.unwrap();
    db::migrate_db(&conn).await.unwrap();

    let fetcher = Arc::new(FakeFetcher::default());
    let generator = Arc::new(generator);

    let mut state = AppState::new(database, config, generator.clone(), fetcher.clone());
    state.sources = vec![test_source()];

    TestApp {
        _dir: dir,
        state: web::Data::new(state),
        fetcher,
        generator,
    }
}
