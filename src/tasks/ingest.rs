//! The news ingestion pipeline: fetch, dedupe, generate, persist.

use std::{collections::HashSet, sync::Arc};

use itertools::Itertools;
use libsql::{Connection, Transaction};
use log::{error, info, warn};
use tokio::{sync::Semaphore, task::JoinSet};

use super::generate::{GenerationOutcome, generate_question_from_news};
use crate::{
    db,
    news::{FetchedItem, SourceConfig, sources_for},
    queries::{
        news::{
            existing_urls, find_or_create_source, insert_news_item, insert_news_question,
            mark_items_processed, touch_source,
        },
        questions::insert_question,
    },
    types::{AppState, NewsCategory, Position},
    utils::now_utc,
};

#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    /// Nothing new to persist. `last_fetched` is still stamped.
    Empty,
    Persisted {
        items: usize,
        questions: usize,
        failed_generations: usize,
    },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceReport {
    pub name: String,
    pub url: String,
    pub outcome: SourceOutcome,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestReport {
    pub sources: Vec<SourceReport>,
}

impl IngestReport {
    pub fn items(&self) -> usize {
        self.sources
            .iter()
            .map(|s| match s.outcome {
                SourceOutcome::Persisted { items, .. } => items,
                _ => 0,
            })
            .sum()
    }

    pub fn questions(&self) -> usize {
        self.sources
            .iter()
            .map(|s| match s.outcome {
                SourceOutcome::Persisted { questions, .. } => questions,
                _ => 0,
            })
            .sum()
    }

    pub fn failed_sources(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| matches!(s.outcome, SourceOutcome::Failed(_)))
            .count()
    }
}

/// Keeps the first occurrence of each url and drops urls already stored.
pub fn dedupe_items(items: Vec<FetchedItem>, existing: &HashSet<String>) -> Vec<FetchedItem> {
    items
        .into_iter()
        .unique_by(|item| item.url.clone())
        .filter(|item| !existing.contains(&item.url))
        .collect()
}

/// Runs every configured source in `category` (all when `None`) one after
/// another. Callers are expected to hold the ingest lock.
pub async fn run_ingestion(
    state: &AppState,
    category: Option<NewsCategory>,
    limit: usize,
) -> IngestReport {
    let start_time = now_utc();
    let sources = sources_for(&state.sources, category);
    info!(
        "[Ingest] Starting run over {} sources with limit {limit}",
        sources.len()
    );

    let mut report = IngestReport::default();
    for source in sources {
        let outcome = process_source(state, &source, limit).await;
        report.sources.push(SourceReport {
            name: source.name,
            url: source.url,
            outcome,
        });
    }

    let now = now_utc();
    info!(
        "[Ingest] Finished. {} items, {} questions, {} failed sources. Took {}",
        report.items(),
        report.questions(),
        report.failed_sources(),
        now - start_time
    );

    report
}

/// Waits for any running ingestion to finish, then runs.
pub async fn trigger_ingestion(
    state: &AppState,
    category: Option<NewsCategory>,
    limit: usize,
) -> IngestReport {
    let _guard = state.ingest_lock.lock().await;
    run_ingestion(state, category, limit).await
}

pub async fn process_source(state: &AppState, source: &SourceConfig, limit: usize) -> SourceOutcome {
    match try_process_source(state, source, limit).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("[Ingest] Source {} failed: {e:#}", source.url);
            SourceOutcome::Failed(e.to_string())
        }
    }
}

async fn try_process_source(
    state: &AppState,
    source: &SourceConfig,
    limit: usize,
) -> anyhow::Result<SourceOutcome> {
    let conn = db::connect(&state.db).await?;
    let row = find_or_create_source(&conn, source).await?;

    let fetched = state.fetcher.fetch(source, limit).await.into_items();
    let urls = fetched.iter().map(|i| i.url.clone()).collect_vec();
    let existing = existing_urls(&conn, &urls).await?;
    let fresh = dedupe_items(fetched, &existing);

    if fresh.is_empty() {
        info!("[Ingest] Nothing new from {}", source.url);
        touch_source(&conn, row.id, now_utc()).await?;
        return Ok(SourceOutcome::Empty);
    }

    let (results, join_failures) = generate_all(state, &fresh, source.category).await;
    let failed_generations = join_failures
        + results
            .iter()
            .filter(|(_, o)| matches!(o, GenerationOutcome::Failed(_)))
            .count();

    let tx = conn.transaction().await?;
    match persist(&tx, row.id, source.category, &fresh, &results).await {
        Ok(questions) => {
            tx.commit().await?;
            info!(
                "[Ingest] {}: saved {} items and {questions} questions, {failed_generations} generations failed",
                source.url,
                fresh.len()
            );
            Ok(SourceOutcome::Persisted {
                items: fresh.len(),
                questions,
                failed_generations,
            })
        }
        Err(e) => {
            rollback_tx(tx).await;
            Err(e)
        }
    }
}

async fn rollback_tx(tx: Transaction) {
    if let Err(e) = tx.rollback().await {
        error!("[Ingest] Failed to rollback {e}");
    }
}

/// Every (item, role) pair, at most `max_in_flight_generations` at a time.
/// Returns outcomes keyed by item index plus the number of tasks that died.
async fn generate_all(
    state: &AppState,
    items: &[FetchedItem],
    category: NewsCategory,
) -> (Vec<(usize, GenerationOutcome)>, usize) {
    let permits = Arc::new(Semaphore::new(state.config.max_in_flight_generations.max(1)));
    let now = now_utc();
    let mut tasks = JoinSet::new();

    for ((idx, item), position) in items
        .iter()
        .enumerate()
        .cartesian_product(Position::ALL.iter().copied())
    {
        let generator = Arc::clone(&state.generator);
        let model = state.config.news_model.clone();
        let permits = Arc::clone(&permits);
        let item = item.clone();

        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            let outcome =
                generate_question_from_news(generator.as_ref(), &model, &item, position, category, now)
                    .await;
            (idx, outcome)
        });
    }

    let mut results = Vec::with_capacity(tasks.len());
    let mut join_failures = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(e) => {
                warn!("[Ingest] Generation task died: {e}");
                join_failures += 1;
            }
        }
    }

    (results, join_failures)
}

/// Items, accepted questions with their links, processed flags and the
/// source stamp. Returns the number of questions saved.
async fn persist(
    conn: &Connection,
    source_id: i64,
    category: NewsCategory,
    items: &[FetchedItem],
    results: &[(usize, GenerationOutcome)],
) -> anyhow::Result<usize> {
    let mut item_ids = Vec::with_capacity(items.len());
    for item in items {
        item_ids.push(insert_news_item(conn, source_id, item, category).await?);
    }

    let mut saved = 0;
    for (idx, outcome) in results {
        let Some(candidate) = outcome.accepted() else {
            continue;
        };

        let question = insert_question(conn, &candidate.question).await?;
        insert_news_question(
            conn,
            item_ids[*idx],
            &question.id,
            candidate.relevance,
            candidate.question_type,
            &candidate.reasoning,
        )
        .await?;
        saved += 1;
    }

    mark_items_processed(conn, &item_ids).await?;
    touch_source(conn, source_id, now_utc()).await?;

    Ok(saved)
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn item(url: &str) -> FetchedItem {
        FetchedItem {
            title: format!("Title for {url}"),
            summary: String::new(),
            content: String::new(),
            url: url.into(),
            published_at: datetime!(2025-01-01 00:00 UTC),
        }
    }

    #[test]
    fn dedupe_keeps_first_and_skips_stored() {
        let mut first = item("https://a.dev/1");
        first.title = "first".into();
        let items = vec![
            first,
            item("https://a.dev/2"),
            item("https://a.dev/1"),
            item("https://a.dev/3"),
        ];
        let existing = HashSet::from(["https://a.dev/3".to_string()]);

        let kept = dedupe_items(items, &existing);
        let urls = kept.iter().map(|i| i.url.as_str()).collect_vec();

        assert_eq!(urls, ["https://a.dev/1", "https://a.dev/2"]);
        assert_eq!(kept[0].title, "first");
    }

    #[test]
    fn report_totals() {
        let report = IngestReport {
            sources: vec![
                SourceReport {
                    name: "a".into(),
                    url: "a".into(),
                    outcome: SourceOutcome::Persisted {
                        items: 2,
                        questions: 3,
                        failed_generations: 1,
                    },
                },
                SourceReport {
                    name: "b".into(),
                    url: "b".into(),
                    outcome: SourceOutcome::Failed("down".into()),
                },
                SourceReport {
                    name: "c".into(),
                    url: "c".into(),
                    outcome: SourceOutcome::Empty,
                },
            ],
        };

        assert_eq!(report.items(), 2);
        assert_eq!(report.questions(), 3);
        assert_eq!(report.failed_sources(), 1);
    }
}
