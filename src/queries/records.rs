use libsql::{Connection, params};
use time::OffsetDateTime;
use uuid::Uuid;

use super::collect_rows;
use crate::{
    db::RECORDS_T,
    models::InterviewRecord,
    types::InterviewRecordCreate,
    utils::{db_time, now_utc},
};

pub async fn insert_record(db: &Connection, record: &InterviewRecordCreate) -> anyhow::Result<String> {
    let id = Uuid::new_v4().to_string();

    db.execute(
        &format!(
            "INSERT INTO {RECORDS_T}
                (id, session_id, question_id, user_id, question_content, answer, score, feedback, position, evaluation_details, created_at)
            VALUES
                (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "
        ),
        params![
            id.as_str(),
            record.session_id.as_deref(),
            record.question_id.as_str(),
            record.user_id,
            record.question_content.as_str(),
            record.answer.as_str(),
            record.score,
            record.feedback.as_str(),
            record.position.as_str(),
            serde_json::to_string(&record.evaluation_details)?,
            db_time(now_utc()),
        ],
    )
    .await?;

    Ok(id)
}

#[derive(Debug, Default)]
pub struct RecordFilter {
    pub position: Option<String>,
    pub date_from: Option<OffsetDateTime>,
    pub date_to: Option<OffsetDateTime>,
}

const FILTER: &str = "user_id = ?1
    AND (?2 IS NULL OR position = ?2)
    AND (?3 IS NULL OR created_at >= ?3)
    AND (?4 IS NULL OR created_at <= ?4)";

/// Newest first, plus the unpaged total for the same filter.
pub async fn list_records(
    db: &Connection,
    user_id: i64,
    filter: &RecordFilter,
    limit: u32,
    offset: u32,
) -> anyhow::Result<(Vec<InterviewRecord>, u64)> {
    let position = filter.position.as_deref();
    let from = filter.date_from.map(db_time);
    let to = filter.date_to.map(db_time);

    let mut count = db
        .query(
            &format!("SELECT COUNT(*) FROM {RECORDS_T} WHERE {FILTER}"),
            params![user_id, position, from.clone(), to.clone()],
        )
        .await?;
    let total: u64 = match count.next().await? {
        Some(row) => row.get::<i64>(0)?.max(0) as u64,
        None => 0,
    };

    let rows = db
        .query(
            &format!(
                "SELECT * FROM {RECORDS_T}
                WHERE {FILTER}
                ORDER BY created_at DESC, rowid DESC
                LIMIT ?5 OFFSET ?6"
            ),
            params![user_id, position, from, to, limit, offset],
        )
        .await?;

    Ok((collect_rows(rows).await?, total))
}

/// Oldest first.
pub async fn records_since(
    db: &Connection,
    user_id: i64,
    since: OffsetDateTime,
) -> anyhow::Result<Vec<InterviewRecord>> {
    let rows = db
        .query(
            &format!(
                "SELECT * FROM {RECORDS_T}
                WHERE user_id = ?1 AND created_at >= ?2
                ORDER BY created_at ASC, rowid ASC"
            ),
            params![user_id, db_time(since)],
        )
        .await?;

    collect_rows(rows).await
}

pub async fn session_records(db: &Connection, session_id: &str) -> anyhow::Result<Vec<InterviewRecord>> {
    let rows = db
        .query(
            &format!("SELECT * FROM {RECORDS_T} WHERE session_id = ?1 ORDER BY created_at ASC"),
            [session_id],
        )
        .await?;

    collect_rows(rows).await
}
