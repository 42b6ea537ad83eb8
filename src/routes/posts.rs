use actix_web::{HttpResponse, post, web};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use log::{error, info};

use super::{ensure_user, require_admin};
use crate::{
    ai::Completion,
    db,
    error::AppError,
    models::NewQuestion,
    queries::{evaluations, questions, records, sessions, users},
    scoring,
    tasks::ingest::trigger_ingestion,
    types::{
        AppData, EvaluateAnswerRequest, EvaluateAnswerResponse, FetchNewsRequest,
        FetchNewsResponse, GenerateQuestionRequest, GenerateQuestionResponse,
        InterviewRecordCreate, InterviewRecordSaveResponse, ScheduledFetchResponse,
        StartSessionRequest, StartSessionResponse, UserCreate, UserLogin, UserLoginResponse,
        UserOut,
    },
    utils::{hash_password, now_utc, verify_password},
};

const QUESTION_SYSTEM: &str = "You are an expert interview question generator.";
const GENERATED_KEYWORDS: [&str; 3] = ["technical", "explanation", "examples"];
const MAX_FETCH_LIMIT: usize = 50;

#[post("/users/register")]
pub async fn register(data: AppData, body: web::Json<UserCreate>) -> Result<HttpResponse, AppError> {
    body.validate().map_err(AppError::BadRequest)?;

    let conn = db::connect(&data.db).await?;
    let (username_taken, email_taken) =
        users::find_conflicts(&conn, &body.username, &body.email).await?;
    if username_taken {
        return Err(AppError::BadRequest("Username already registered".into()));
    }
    if email_taken {
        return Err(AppError::BadRequest("Email already registered".into()));
    }

    let hashed = hash_password(&body.password);
    let tx = conn.transaction().await?;
    let created = async {
        let user = users::create_user(&tx, body.username.trim(), &body.email, &hashed).await?;
        users::save_preferences(&tx, &users::default_preferences(user.id)).await?;
        anyhow::Ok(user)
    }
    .await;

    let user = match created {
        Ok(user) => {
            tx.commit().await?;
            user
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                error!("[Users] Failed to rollback registration {rollback}");
            }
            return Err(e.into());
        }
    };

    info!("[Users] Registered user {}", user.id);
    Ok(HttpResponse::Created().json(UserOut::from(user)))
}

#[post("/users/login")]
pub async fn login(data: AppData, body: web::Json<UserLogin>) -> Result<HttpResponse, AppError> {
    let conn = db::connect(&data.db).await?;
    let user = users::get_user_by_username(&conn, &body.username)
        .await?
        .filter(|u| verify_password(&body.password, &u.hashed_password))
        .ok_or_else(|| AppError::Unauthorized("Invalid username or password".into()))?;

    if !user.is_active {
        return Err(AppError::BadRequest("Inactive user".into()));
    }

    Ok(HttpResponse::Ok().json(UserLoginResponse {
        user: UserOut::from(user),
        message: "Login successful".into(),
    }))
}

#[post("/users/{user_id}/interview-records")]
pub async fn save_interview_record(
    data: AppData,
    path: web::Path<i64>,
    body: web::Json<InterviewRecordCreate>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();
    if !(0..=100).contains(&body.score) {
        return Err(AppError::BadRequest("score must be between 0 and 100".into()));
    }

    let conn = db::connect(&data.db).await?;
    ensure_user(&conn, user_id).await?;
    if body.user_id != user_id {
        return Err(AppError::Forbidden(
            "Cannot save records for another user".into(),
        ));
    }

    let record_id = records::insert_record(&conn, &body).await?;

    Ok(HttpResponse::Ok().json(InterviewRecordSaveResponse {
        record_id,
        message: "Record saved successfully".into(),
    }))
}

#[post("/questions/generate")]
pub async fn generate_question(
    data: AppData,
    body: web::Json<GenerateQuestionRequest>,
) -> Result<HttpResponse, AppError> {
    let difficulty = body.difficulty.unwrap_or_default();
    let topic = body.topic.clone().filter(|t| !t.trim().is_empty());

    let about = match &topic {
        Some(topic) => format!(" about {topic}."),
        None => " about any topic.".to_string(),
    };
    let prompt = format!(
        "Generate a {difficulty} level interview question for a {} position{about} Return only the question.",
        body.position
    );

    let request = Completion::new(&data.config.question_model, QUESTION_SYSTEM, prompt)
        .max_tokens(100)
        .temperature(0.9)
        .penalties(0.8, 0.8);

    let content = data
        .generator
        .complete(request)
        .await
        .map_err(|e| AppError::Upstream(format!("Question generation failed: {e}")))?;
    if content.is_empty() {
        return Err(AppError::Upstream(
            "Question generation returned nothing".into(),
        ));
    }

    let conn = db::connect(&data.db).await?;
    let question = questions::insert_question(
        &conn,
        &NewQuestion {
            content,
            position: body.position,
            difficulty,
            topic: Some(topic.unwrap_or_else(|| "general".into())),
            question_type: None,
            expected_keywords: GENERATED_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        },
    )
    .await?;

    info!(
        "[Questions] Generated {} question {} for user {}",
        question.position, question.id, body.user_id
    );

    Ok(HttpResponse::Ok().json(GenerateQuestionResponse {
        question_id: question.id,
        content: question.content,
        position: question.position,
        difficulty: question.difficulty,
        topic: question.topic,
        expected_keywords: question.expected_keywords,
        created_at: question.created_at,
    }))
}

#[post("/answers/evaluate")]
pub async fn evaluate_answer(
    data: AppData,
    body: web::Json<EvaluateAnswerRequest>,
) -> Result<HttpResponse, AppError> {
    let conn = db::connect(&data.db).await?;
    let question = questions::get_question(&conn, &body.question_id)
        .await?
        .ok_or_else(|| AppError::not_found("Question"))?;

    let result = scoring::evaluate_answer(
        data.generator.as_ref(),
        &data.config.question_model,
        &question.content,
        &body.answer,
        &question.expected_keywords,
    )
    .await;

    let saved = evaluations::insert_evaluation(
        &conn,
        &question.id,
        body.user_id,
        body.session_id.as_deref(),
        &body.answer,
        &result,
    )
    .await?;

    Ok(HttpResponse::Ok().json(EvaluateAnswerResponse {
        evaluation_id: saved.id,
        score: saved.score,
        feedback: saved.feedback,
        strengths: saved.strengths,
        improvements: saved.improvements,
        keywords_covered: saved.keywords_covered,
        keywords_missed: saved.keywords_missed,
        evaluation_details: saved.evaluation_details,
        created_at: saved.created_at,
    }))
}

#[post("/sessions/start")]
pub async fn start_session(
    data: AppData,
    body: web::Json<StartSessionRequest>,
) -> Result<HttpResponse, AppError> {
    let conn = db::connect(&data.db).await?;
    ensure_user(&conn, body.user_id).await?;

    let session = sessions::create_session(
        &conn,
        body.user_id,
        body.position.as_str(),
        body.session_type.unwrap_or_default(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(StartSessionResponse {
        session_id: session.id,
        user_id: session.user_id,
        position: session.position,
        status: session.status,
        started_at: session.started_at,
    }))
}

#[post("/trending/fetch-news")]
pub async fn fetch_news(
    data: AppData,
    auth: Option<BearerAuth>,
    body: web::Json<FetchNewsRequest>,
) -> Result<HttpResponse, AppError> {
    require_admin(&data.config, auth)?;
    if body.limit == 0 || body.limit > MAX_FETCH_LIMIT {
        return Err(AppError::BadRequest(format!(
            "limit must be between 1 and {MAX_FETCH_LIMIT}"
        )));
    }

    let FetchNewsRequest { category, limit } = body.into_inner();
    let task_data = data.clone();
    actix_web::rt::spawn(async move {
        trigger_ingestion(&task_data, category, limit).await;
    });

    let scope = category.map_or_else(|| "all categories".to_string(), |c| c.to_string());
    info!("[Trending] Manual fetch started for {scope}");

    Ok(HttpResponse::Ok().json(FetchNewsResponse {
        news_items: Vec::new(),
        questions_generated: 0,
        message: format!("News fetching started in background for {scope}"),
    }))
}

#[post("/trending/scheduled-fetch")]
pub async fn scheduled_fetch(data: AppData, auth: Option<BearerAuth>) -> Result<HttpResponse, AppError> {
    require_admin(&data.config, auth)?;

    let limit = data.config.scheduled_item_limit;
    let task_data = data.clone();
    actix_web::rt::spawn(async move {
        trigger_ingestion(&task_data, None, limit).await;
    });

    Ok(HttpResponse::Ok().json(ScheduledFetchResponse {
        message: "Scheduled news fetch triggered".into(),
        timestamp: now_utc(),
    }))
}
