use actix_web::{HttpResponse, put, web};
use log::info;

use super::ensure_user;
use crate::{
    db,
    error::AppError,
    queries::{records, sessions, users},
    stats,
    types::{
        AppData, CompleteSessionRequest, CompleteSessionResponse, SessionStatus,
        UserPreferencesUpdate,
    },
    utils::now_utc,
};

#[put("/users/{user_id}/preferences")]
pub async fn update_preferences(
    data: AppData,
    path: web::Path<i64>,
    body: web::Json<UserPreferencesUpdate>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let conn = db::connect(&data.db).await?;
    ensure_user(&conn, user_id).await?;

    let mut prefs = users::get_preferences(&conn, user_id)
        .await?
        .unwrap_or_else(|| users::default_preferences(user_id));

    let update = body.into_inner();
    if let Some(position) = update.preferred_position {
        prefs.preferred_position = position;
    }
    if let Some(difficulty) = update.difficulty_level {
        prefs.difficulty_level = difficulty;
    }
    if let Some(goal) = update.daily_question_goal {
        prefs.daily_question_goal = goal;
    }
    if let Some(settings) = update.notification_settings {
        prefs.notification_settings = settings;
    }
    prefs.updated_at = now_utc();

    users::save_preferences(&conn, &prefs).await?;

    Ok(HttpResponse::Ok().json(prefs))
}

#[put("/sessions/{session_id}/complete")]
pub async fn complete_session(
    data: AppData,
    path: web::Path<String>,
    body: web::Json<CompleteSessionRequest>,
) -> Result<HttpResponse, AppError> {
    let conn = db::connect(&data.db).await?;
    let session = sessions::get_session(&conn, &path)
        .await?
        .ok_or_else(|| AppError::not_found("Session"))?;

    if session.user_id != body.user_id {
        return Err(AppError::Forbidden(
            "Not authorized to complete this session".into(),
        ));
    }
    if session.status == SessionStatus::Completed {
        return Err(AppError::BadRequest("Session already completed".into()));
    }

    let completed_at = now_utc();
    if !sessions::complete_session(&conn, &session.id, completed_at).await? {
        return Err(AppError::BadRequest("Session already completed".into()));
    }

    let records = records::session_records(&conn, &session.id).await?;
    let summary = stats::session_summary(&records, session.started_at, completed_at);
    info!(
        "[Sessions] Completed {} with {} answers",
        session.id, summary.total_questions
    );

    Ok(HttpResponse::Ok().json(CompleteSessionResponse {
        session_id: session.id,
        status: SessionStatus::Completed,
        completed_at,
        summary,
    }))
}
