use libsql::{Connection, params};
use uuid::Uuid;

use super::first_row;
use crate::{
    db::EVALUATIONS_T,
    models::AnswerEvaluation,
    scoring::AnswerEvaluationResult,
    utils::{db_time, now_utc},
};

pub async fn insert_evaluation(
    db: &Connection,
    question_id: &str,
    user_id: i64,
    session_id: Option<&str>,
    answer: &str,
    result: &AnswerEvaluationResult,
) -> anyhow::Result<AnswerEvaluation> {
    let rows = db
        .query(
            &format!(
                "INSERT INTO {EVALUATIONS_T}
                    (id, question_id, user_id, session_id, answer, score, feedback, strengths,
                     improvements, keywords_covered, keywords_missed, evaluation_details, created_at)
                VALUES
                    (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                RETURNING *
                "
            ),
            params![
                Uuid::new_v4().to_string(),
                question_id,
                user_id,
                session_id,
                answer,
                result.score,
                result.feedback.as_str(),
                serde_json::to_string(&result.strengths)?,
                serde_json::to_string(&result.improvements)?,
                serde_json::to_string(&result.keywords_covered)?,
                serde_json::to_string(&result.keywords_missed)?,
                serde_json::to_string(&result.details)?,
                db_time(now_utc()),
            ],
        )
        .await?;

    first_row(rows)
        .await?
        .ok_or_else(|| anyhow::anyhow!("insert into {EVALUATIONS_T} returned no row"))
}
