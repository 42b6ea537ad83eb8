use std::collections::HashMap;

use actix_web::{HttpResponse, get, web};
use serde_json::json;
use time::Duration;

use super::{date_bound, ensure_user};
use crate::{
    db,
    error::AppError,
    models::InterviewRecord,
    queries::{
        news::{active_sources, trending_questions},
        questions, records,
        records::RecordFilter,
        sessions, users,
    },
    stats,
    types::{
        AppData, GetInterviewRecordsResponse, GetProgressResponse, GetTrendingQuestionsResponse,
        Pagination, Position, ProgressQuery, QuestionCategoriesResponse, QuestionCategory,
        RecordsQuery, SessionDetailResponse, Success, TrendingQuery, UserOut,
    },
    utils::{now_utc, title_case},
};

const MAX_RECORDS_LIMIT: u32 = 100;
const MAX_DAYS_BACK: u32 = 3650;

#[get("/")]
pub async fn root() -> HttpResponse {
    HttpResponse::Ok().json(Success {
        message: "MockMate API is running".into(),
    })
}

#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[get("/users")]
pub async fn list_users(data: AppData) -> Result<HttpResponse, AppError> {
    let conn = db::connect(&data.db).await?;
    let users: Vec<UserOut> = users::list_users(&conn)
        .await?
        .into_iter()
        .map(UserOut::from)
        .collect();

    Ok(HttpResponse::Ok().json(users))
}

#[get("/users/{user_id}")]
pub async fn get_user(data: AppData, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    let conn = db::connect(&data.db).await?;
    let user = users::get_user(&conn, path.into_inner())
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

    Ok(HttpResponse::Ok().json(UserOut::from(user)))
}

#[get("/users/{user_id}/interview-records")]
pub async fn get_interview_records(
    data: AppData,
    path: web::Path<i64>,
    query: web::Query<RecordsQuery>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    if query.limit == 0 || query.limit > MAX_RECORDS_LIMIT {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {MAX_RECORDS_LIMIT}"
        )));
    }

    let filter = RecordFilter {
        position: query.position.clone().filter(|p| !p.is_empty()),
        date_from: date_bound("date_from", query.date_from.as_deref(), false)?,
        date_to: date_bound("date_to", query.date_to.as_deref(), true)?,
    };

    let conn = db::connect(&data.db).await?;
    ensure_user(&conn, user_id).await?;

    let (records, total_count) =
        records::list_records(&conn, user_id, &filter, query.limit, query.offset).await?;
    let has_more = (query.offset as u64 + records.len() as u64) < total_count;

    Ok(HttpResponse::Ok().json(GetInterviewRecordsResponse {
        records,
        total_count,
        pagination: Pagination {
            limit: query.limit,
            offset: query.offset,
            has_more,
        },
    }))
}

#[get("/users/{user_id}/progress")]
pub async fn get_progress(
    data: AppData,
    path: web::Path<i64>,
    query: web::Query<ProgressQuery>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let days = stats::time_range_days(&query.time_range).ok_or_else(|| {
        AppError::BadRequest("time_range must be one of 7days, 30days, 90days".into())
    })?;

    let conn = db::connect(&data.db).await?;
    ensure_user(&conn, user_id).await?;

    let since = now_utc() - Duration::days(days);
    let all = records::records_since(&conn, user_id, since).await?;

    let position = query.position.as_deref().filter(|p| !p.is_empty());
    let filtered: Vec<&InterviewRecord> = all
        .iter()
        .filter(|r| position.is_none_or(|p| r.position == p))
        .collect();

    let progress_data = stats::daily_progress(filtered.iter().copied());
    let statistics = stats::progress_statistics(&filtered, &progress_data);

    Ok(HttpResponse::Ok().json(GetProgressResponse {
        statistics,
        progress_data,
        position_breakdown: stats::position_breakdown(&all),
    }))
}

#[get("/users/{user_id}/preferences")]
pub async fn get_preferences(data: AppData, path: web::Path<i64>) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    let conn = db::connect(&data.db).await?;
    ensure_user(&conn, user_id).await?;

    let prefs = match users::get_preferences(&conn, user_id).await? {
        Some(prefs) => prefs,
        None => {
            let prefs = users::default_preferences(user_id);
            users::save_preferences(&conn, &prefs).await?;
            prefs
        }
    };

    Ok(HttpResponse::Ok().json(prefs))
}

#[get("/questions/categories")]
pub async fn get_question_categories(data: AppData) -> Result<HttpResponse, AppError> {
    let conn = db::connect(&data.db).await?;

    let counts: HashMap<String, u32> = questions::position_counts(&conn)
        .await?
        .into_iter()
        .map(|c| (c.position, c.count))
        .collect();

    let positions = Position::ALL
        .iter()
        .map(|p| QuestionCategory {
            value: p.to_string(),
            label: title_case(p.as_str()),
            question_count: counts.get(p.as_str()).copied().unwrap_or(0),
        })
        .collect();

    Ok(HttpResponse::Ok().json(QuestionCategoriesResponse {
        positions,
        topics: questions::topic_counts(&conn).await?,
    }))
}

#[get("/questions/{question_id}")]
pub async fn get_question(data: AppData, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let conn = db::connect(&data.db).await?;
    let question = questions::get_question(&conn, &path)
        .await?
        .ok_or_else(|| AppError::not_found("Question"))?;

    Ok(HttpResponse::Ok().json(question))
}

#[get("/sessions/{session_id}")]
pub async fn get_session(data: AppData, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let conn = db::connect(&data.db).await?;
    let session = sessions::get_session(&conn, &path)
        .await?
        .ok_or_else(|| AppError::not_found("Session"))?;
    let records_count = sessions::count_session_records(&conn, &session.id).await?;

    Ok(HttpResponse::Ok().json(SessionDetailResponse {
        session_id: session.id,
        user_id: session.user_id,
        position: session.position,
        status: session.status,
        session_type: session.session_type,
        started_at: session.started_at,
        completed_at: session.completed_at,
        records_count,
    }))
}

#[get("/trending/trending-questions")]
pub async fn get_trending_questions(
    data: AppData,
    query: web::Query<TrendingQuery>,
) -> Result<HttpResponse, AppError> {
    if query.days_back > MAX_DAYS_BACK {
        return Err(AppError::BadRequest(format!(
            "days_back must be at most {MAX_DAYS_BACK}"
        )));
    }

    let conn = db::connect(&data.db).await?;
    let since = now_utc() - Duration::days(query.days_back as i64);

    let questions =
        trending_questions(&conn, query.position, query.category, since, query.limit).await?;

    Ok(HttpResponse::Ok().json(GetTrendingQuestionsResponse {
        total_count: questions.len() as u32,
        questions,
    }))
}

#[get("/trending/news-sources")]
pub async fn get_news_sources(data: AppData) -> Result<HttpResponse, AppError> {
    let conn = db::connect(&data.db).await?;
    Ok(HttpResponse::Ok().json(active_sources(&conn).await?))
}
