use libsql::{Connection, params};
use serde::Deserialize;
use uuid::Uuid;

use super::{collect_rows, first_row};
use crate::{
    db::QUESTIONS_T,
    models::{NewQuestion, Question},
    types::TopicCount,
    utils::{db_time, now_utc},
};

pub async fn insert_question(db: &Connection, question: &NewQuestion) -> anyhow::Result<Question> {
    let id = Uuid::new_v4().to_string();

    let rows = db
        .query(
            &format!(
                "INSERT INTO {QUESTIONS_T}
                    (id, content, position, difficulty, topic, question_type, expected_keywords, created_at)
                VALUES
                    (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                RETURNING *
                "
            ),
            params![
                id,
                question.content.as_str(),
                question.position.as_str(),
                question.difficulty.as_str(),
                question.topic.as_deref(),
                question.question_type.map(|t| t.as_str()),
                serde_json::to_string(&question.expected_keywords)?,
                db_time(now_utc()),
            ],
        )
        .await?;

    first_row(rows)
        .await?
        .ok_or_else(|| anyhow::anyhow!("insert into {QUESTIONS_T} returned no row"))
}

pub async fn get_question(db: &Connection, id: &str) -> anyhow::Result<Option<Question>> {
    let rows = db
        .query(&format!("SELECT * FROM {QUESTIONS_T} WHERE id = ?1"), [id])
        .await?;

    first_row(rows).await
}

#[derive(Deserialize)]
pub struct PositionCount {
    pub position: String,
    pub count: u32,
}

pub async fn position_counts(db: &Connection) -> anyhow::Result<Vec<PositionCount>> {
    let rows = db
        .query(
            &format!(
                "SELECT position, COUNT(*) AS count
                FROM {QUESTIONS_T}
                GROUP BY position"
            ),
            (),
        )
        .await?;

    collect_rows(rows).await
}

pub async fn topic_counts(db: &Connection) -> anyhow::Result<Vec<TopicCount>> {
    let rows = db
        .query(
            &format!(
                "SELECT position, topic, COUNT(*) AS count
                FROM {QUESTIONS_T}
                WHERE topic IS NOT NULL
                GROUP BY position, topic
                ORDER BY position, count DESC"
            ),
            (),
        )
        .await?;

    collect_rows(rows).await
}
