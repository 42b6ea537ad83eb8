use libsql::{Connection, params};
use time::OffsetDateTime;
use uuid::Uuid;

use super::first_row;
use crate::{
    db::{RECORDS_T, SESSIONS_T},
    models::InterviewSession,
    types::{SessionStatus, SessionType},
    utils::{db_time, now_utc},
};

pub async fn create_session(
    db: &Connection,
    user_id: i64,
    position: &str,
    session_type: SessionType,
) -> anyhow::Result<InterviewSession> {
    let rows = db
        .query(
            &format!(
                "INSERT INTO {SESSIONS_T}
                    (id, user_id, position, status, session_type, started_at)
                VALUES
                    (?1, ?2, ?3, ?4, ?5, ?6)
                RETURNING *
                "
            ),
            params![
                Uuid::new_v4().to_string(),
                user_id,
                position,
                SessionStatus::Active.as_str(),
                session_type.as_str(),
                db_time(now_utc()),
            ],
        )
        .await?;

    first_row(rows)
        .await?
        .ok_or_else(|| anyhow::anyhow!("insert into {SESSIONS_T} returned no row"))
}

pub async fn get_session(db: &Connection, id: &str) -> anyhow::Result<Option<InterviewSession>> {
    let rows = db
        .query(&format!("SELECT * FROM {SESSIONS_T} WHERE id = ?1"), [id])
        .await?;

    first_row(rows).await
}

/// Only flips sessions that are still active. Returns whether a row changed.
pub async fn complete_session(
    db: &Connection,
    id: &str,
    completed_at: OffsetDateTime,
) -> anyhow::Result<bool> {
    let changed = db
        .execute(
            &format!(
                "UPDATE {SESSIONS_T}
                SET status = ?1, completed_at = ?2
                WHERE id = ?3 AND status = ?4"
            ),
            params![
                SessionStatus::Completed.as_str(),
                db_time(completed_at),
                id,
                SessionStatus::Active.as_str(),
            ],
        )
        .await?;

    Ok(changed > 0)
}

pub async fn count_session_records(db: &Connection, session_id: &str) -> anyhow::Result<u32> {
    let mut rows = db
        .query(
            &format!("SELECT COUNT(*) FROM {RECORDS_T} WHERE session_id = ?1"),
            [session_id],
        )
        .await?;

    match rows.next().await? {
        Some(row) => Ok(row.get(0)?),
        None => Ok(0),
    }
}
