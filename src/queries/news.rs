use std::collections::HashSet;

use libsql::{Connection, params, params_from_iter};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use super::{collect_rows, first_row};
use crate::{
    db::{NEWS_ITEMS_T, NEWS_QUESTIONS_T, NEWS_SOURCES_T, QUESTIONS_T},
    models::{NewsSource, TrendingQuestion},
    news::{FetchedItem, SourceConfig},
    types::{NewsCategory, Position, QuestionType},
    utils::{db_time, now_utc},
};

/// Looks the source up by (url, category) and creates it when missing. Not
/// backed by a unique constraint, callers serialize through the ingest lock.
pub async fn find_or_create_source(db: &Connection, source: &SourceConfig) -> anyhow::Result<NewsSource> {
    let rows = db
        .query(
            &format!("SELECT * FROM {NEWS_SOURCES_T} WHERE url = ?1 AND category = ?2 LIMIT 1"),
            params![source.url.as_str(), source.category.as_str()],
        )
        .await?;

    if let Some(existing) = first_row(rows).await? {
        return Ok(existing);
    }

    let rows = db
        .query(
            &format!(
                "INSERT INTO {NEWS_SOURCES_T}
                    (name, source_type, url, category, is_active)
                VALUES
                    (?1, ?2, ?3, ?4, 1)
                RETURNING *
                "
            ),
            params![
                source.name.as_str(),
                source.source_type.as_str(),
                source.url.as_str(),
                source.category.as_str(),
            ],
        )
        .await?;

    first_row(rows)
        .await?
        .ok_or_else(|| anyhow::anyhow!("insert into {NEWS_SOURCES_T} returned no row"))
}

pub async fn active_sources(db: &Connection) -> anyhow::Result<Vec<NewsSource>> {
    let rows = db
        .query(
            &format!("SELECT * FROM {NEWS_SOURCES_T} WHERE is_active = 1 ORDER BY id"),
            (),
        )
        .await?;

    collect_rows(rows).await
}

/// Which of `urls` already have a news item.
pub async fn existing_urls(db: &Connection, urls: &[String]) -> anyhow::Result<HashSet<String>> {
    if urls.is_empty() {
        return Ok(HashSet::new());
    }

    let placeholders = (1..=urls.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");

    let mut rows = db
        .query(
            &format!("SELECT url FROM {NEWS_ITEMS_T} WHERE url IN ({placeholders})"),
            params_from_iter(urls.iter().map(String::as_str)),
        )
        .await?;

    let mut found = HashSet::new();
    while let Some(row) = rows.next().await? {
        found.insert(row.get::<String>(0)?);
    }

    Ok(found)
}

/// New items start unprocessed.
pub async fn insert_news_item(
    db: &Connection,
    source_id: i64,
    item: &FetchedItem,
    category: NewsCategory,
) -> anyhow::Result<i64> {
    let mut rows = db
        .query(
            &format!(
                "INSERT INTO {NEWS_ITEMS_T}
                    (source_id, title, summary, content, url, published_at, category, is_processed, created_at)
                VALUES
                    (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)
                RETURNING id
                "
            ),
            params![
                source_id,
                item.title.as_str(),
                item.summary.as_str(),
                item.content.as_str(),
                item.url.as_str(),
                db_time(item.published_at),
                category.as_str(),
                db_time(now_utc()),
            ],
        )
        .await?;

    let row = rows
        .next()
        .await?
        .ok_or_else(|| anyhow::anyhow!("insert into {NEWS_ITEMS_T} returned no row"))?;

    Ok(row.get(0)?)
}

pub async fn insert_news_question(
    db: &Connection,
    news_item_id: i64,
    question_id: &str,
    relevance_score: f64,
    question_type: QuestionType,
    ai_reasoning: &str,
) -> anyhow::Result<()> {
    db.execute(
        &format!(
            "INSERT INTO {NEWS_QUESTIONS_T}
                (news_item_id, question_id, relevance_score, question_type, ai_reasoning, created_at)
            VALUES
                (?1, ?2, ?3, ?4, ?5, ?6)
            "
        ),
        params![
            news_item_id,
            question_id,
            relevance_score,
            question_type.as_str(),
            ai_reasoning,
            db_time(now_utc()),
        ],
    )
    .await?;

    Ok(())
}

pub async fn mark_items_processed(db: &Connection, ids: &[i64]) -> anyhow::Result<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let placeholders = (1..=ids.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");

    let changed = db
        .execute(
            &format!("UPDATE {NEWS_ITEMS_T} SET is_processed = 1 WHERE id IN ({placeholders})"),
            params_from_iter(ids.iter().copied()),
        )
        .await?;

    Ok(changed)
}

pub async fn touch_source(db: &Connection, source_id: i64, at: OffsetDateTime) -> anyhow::Result<()> {
    db.execute(
        &format!("UPDATE {NEWS_SOURCES_T} SET last_fetched = ?1 WHERE id = ?2"),
        params![db_time(at), source_id],
    )
    .await?;

    Ok(())
}

/// Most recent `last_fetched` over every source.
pub async fn latest_fetch(db: &Connection) -> anyhow::Result<Option<OffsetDateTime>> {
    let mut rows = db
        .query(&format!("SELECT MAX(last_fetched) FROM {NEWS_SOURCES_T}"), ())
        .await?;

    let Some(row) = rows.next().await? else {
        return Ok(None);
    };

    let raw: Option<String> = row.get(0)?;
    raw.map(|s| OffsetDateTime::parse(&s, &Rfc3339))
        .transpose()
        .map_err(Into::into)
}

pub async fn trending_questions(
    db: &Connection,
    position: Option<Position>,
    category: Option<NewsCategory>,
    since: OffsetDateTime,
    limit: u32,
) -> anyhow::Result<Vec<TrendingQuestion>> {
    let rows = db
        .query(
            &format!(
                "SELECT
                    nq.id,
                    q.content,
                    q.position,
                    q.difficulty,
                    nq.question_type,
                    ni.title AS source_title,
                    ni.url AS source_url,
                    ns.name AS source_name,
                    ni.published_at,
                    nq.relevance_score,
                    nq.ai_reasoning,
                    nq.created_at
                FROM {NEWS_QUESTIONS_T} AS nq
                INNER JOIN {QUESTIONS_T} AS q
                    ON nq.question_id = q.id
                INNER JOIN {NEWS_ITEMS_T} AS ni
                    ON nq.news_item_id = ni.id
                INNER JOIN {NEWS_SOURCES_T} AS ns
                    ON ni.source_id = ns.id
                WHERE ni.published_at >= ?1
                    AND (?2 IS NULL OR q.position = ?2)
                    AND (?3 IS NULL OR ni.category = ?3)
                ORDER BY nq.relevance_score DESC, ni.published_at DESC
                LIMIT ?4
                "
            ),
            params![
                db_time(since),
                position.map(|p| p.as_str()),
                category.map(|c| c.as_str()),
                limit,
            ],
        )
        .await?;

    collect_rows(rows).await
}
