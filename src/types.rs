use std::{fmt, str::FromStr, sync::Arc};

use actix_web::web;
use libsql::Database;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::{
    ai::TextGenerator,
    config::Config,
    models::{InterviewRecord, User},
    news::{NewsFetcher, SourceConfig, source_catalog},
    scoring::EvaluationDetails,
};

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Unit enums that are stored as text columns and travel as snake_case JSON.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$variant_meta:meta])* $variant:ident => $value:literal),+ $(,)? }
    ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        $(#[$meta])*
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

text_enum!(#[derive(Default)] Position {
    #[default]
    Frontend => "frontend",
    Backend => "backend",
    Fullstack => "fullstack",
    Mobile => "mobile",
    Devops => "devops",
});

text_enum!(#[derive(Default)] Difficulty {
    Easy => "easy",
    #[default]
    Medium => "medium",
    Hard => "hard",
});

text_enum!(SessionStatus {
    Active => "active",
    Completed => "completed",
});

text_enum!(#[derive(Default)] SessionType {
    #[default]
    Practice => "practice",
    MockInterview => "mock_interview",
});

text_enum!(NewsCategory {
    Ai => "ai",
    WebDev => "web_dev",
    Mobile => "mobile",
    Devops => "devops",
    GeneralTech => "general_tech",
});

text_enum!(NewsSourceType {
    Rss => "rss",
    Api => "api",
    WebScraping => "web_scraping",
});

text_enum!(QuestionType {
    Technical => "technical",
    Opinion => "opinion",
    Behavioral => "behavioral",
});

// Server Types

pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub generator: Arc<dyn TextGenerator>,
    pub fetcher: Arc<dyn NewsFetcher>,
    pub sources: Vec<SourceConfig>,
    /// Held for the whole of an ingestion run. Scheduled ticks skip when it is
    /// taken, manual triggers wait for it.
    pub ingest_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(
        db: Database,
        config: Config,
        generator: Arc<dyn TextGenerator>,
        fetcher: Arc<dyn NewsFetcher>,
    ) -> Self {
        Self {
            db,
            config,
            generator,
            fetcher,
            sources: source_catalog(),
            ingest_lock: Arc::new(Mutex::new(())),
        }
    }
}

pub type AppData = web::Data<AppState>;

#[derive(Serialize, Deserialize)]
pub struct Success {
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct Failure {
    pub message: String,
}

// JSON Types: users

#[derive(Deserialize)]
pub struct UserCreate {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl UserCreate {
    pub fn validate(&self) -> Result<(), String> {
        if self.username.trim().is_empty() {
            return Err("Username must not be empty".into());
        }
        let Some((local, domain)) = self.email.split_once('@') else {
            return Err("Invalid email address".into());
        };
        if local.is_empty() || domain.is_empty() || self.email.contains(char::is_whitespace) {
            return Err("Invalid email address".into());
        }
        if self.password.is_empty() {
            return Err("Password must not be empty".into());
        }
        Ok(())
    }
}

#[derive(Deserialize)]
pub struct UserLogin {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct UserOut {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for UserOut {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct UserLoginResponse {
    pub user: UserOut,
    pub message: String,
}

// JSON Types: interview records

#[derive(Deserialize)]
pub struct InterviewRecordCreate {
    pub session_id: Option<String>,
    pub question_id: String,
    pub user_id: i64,
    pub question_content: String,
    pub answer: String,
    pub score: i64,
    pub feedback: String,
    pub position: Position,
    #[serde(default = "empty_object")]
    pub evaluation_details: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

#[derive(Serialize, Deserialize)]
pub struct InterviewRecordSaveResponse {
    pub record_id: String,
    pub message: String,
}

#[derive(Deserialize)]
pub struct RecordsQuery {
    pub position: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    #[serde(default = "default_records_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_records_limit() -> u32 {
    50
}

#[derive(Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
    pub has_more: bool,
}

#[derive(Serialize, Deserialize)]
pub struct GetInterviewRecordsResponse {
    pub records: Vec<InterviewRecord>,
    pub total_count: u64,
    pub pagination: Pagination,
}

// JSON Types: progress

#[derive(Deserialize)]
pub struct ProgressQuery {
    pub position: Option<String>,
    #[serde(default = "default_time_range")]
    pub time_range: String,
}

fn default_time_range() -> String {
    "30days".into()
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ProgressData {
    pub date: String,
    pub score: f64,
    pub question_count: u32,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ProgressStatistics {
    pub total_questions: u32,
    pub average_score: f64,
    pub improvement_rate: f64,
    pub best_score: i64,
    pub worst_score: i64,
    pub current_streak: u32,
    pub total_practice_time: u32,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct PositionBreakdown {
    pub position: String,
    pub question_count: u32,
    pub average_score: f64,
}

#[derive(Serialize, Deserialize)]
pub struct GetProgressResponse {
    pub progress_data: Vec<ProgressData>,
    pub statistics: ProgressStatistics,
    pub position_breakdown: Vec<PositionBreakdown>,
}

// JSON Types: preferences

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NotificationSettings {
    #[serde(default = "enabled")]
    pub daily_reminder: bool,
    #[serde(default = "enabled")]
    pub progress_updates: bool,
    #[serde(default = "enabled")]
    pub achievement_alerts: bool,
}

fn enabled() -> bool {
    true
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            daily_reminder: true,
            progress_updates: true,
            achievement_alerts: true,
        }
    }
}

#[derive(Deserialize, Default)]
pub struct UserPreferencesUpdate {
    pub preferred_position: Option<Position>,
    pub difficulty_level: Option<Difficulty>,
    pub daily_question_goal: Option<u32>,
    pub notification_settings: Option<NotificationSettings>,
}

// JSON Types: questions

#[derive(Deserialize)]
pub struct GenerateQuestionRequest {
    pub position: Position,
    pub difficulty: Option<Difficulty>,
    pub topic: Option<String>,
    pub user_id: i64,
}

#[derive(Serialize, Deserialize)]
pub struct GenerateQuestionResponse {
    pub question_id: String,
    pub content: String,
    pub position: String,
    pub difficulty: String,
    pub topic: Option<String>,
    pub expected_keywords: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct QuestionCategory {
    pub value: String,
    pub label: String,
    pub question_count: u32,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct TopicCount {
    pub position: String,
    pub topic: String,
    pub count: u32,
}

#[derive(Serialize, Deserialize)]
pub struct QuestionCategoriesResponse {
    pub positions: Vec<QuestionCategory>,
    pub topics: Vec<TopicCount>,
}

// JSON Types: answers

#[derive(Deserialize)]
pub struct EvaluateAnswerRequest {
    pub question_id: String,
    pub user_id: i64,
    pub answer: String,
    pub session_id: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct EvaluateAnswerResponse {
    pub evaluation_id: String,
    pub score: i64,
    pub feedback: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub keywords_covered: Vec<String>,
    pub keywords_missed: Vec<String>,
    pub evaluation_details: EvaluationDetails,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

// JSON Types: sessions

#[derive(Deserialize)]
pub struct StartSessionRequest {
    pub user_id: i64,
    pub position: Position,
    pub session_type: Option<SessionType>,
}

#[derive(Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub user_id: i64,
    pub position: String,
    pub status: SessionStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
}

#[derive(Deserialize)]
pub struct CompleteSessionRequest {
    pub user_id: i64,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct SessionSummary {
    pub total_questions: u32,
    pub average_score: f64,
    /// Minutes.
    pub total_duration: i64,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct CompleteSessionResponse {
    pub session_id: String,
    pub status: SessionStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
    pub summary: SessionSummary,
}

#[derive(Serialize, Deserialize)]
pub struct SessionDetailResponse {
    pub session_id: String,
    pub user_id: i64,
    pub position: String,
    pub status: SessionStatus,
    pub session_type: SessionType,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub completed_at: Option<OffsetDateTime>,
    pub records_count: u32,
}

// JSON Types: trending

#[derive(Deserialize, Default)]
pub struct FetchNewsRequest {
    pub category: Option<NewsCategory>,
    #[serde(default = "default_fetch_limit")]
    pub limit: usize,
}

fn default_fetch_limit() -> usize {
    10
}

#[derive(Serialize, Deserialize)]
pub struct FetchNewsResponse {
    pub news_items: Vec<String>,
    pub questions_generated: u32,
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct ScheduledFetchResponse {
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Deserialize)]
pub struct TrendingQuery {
    pub position: Option<Position>,
    pub category: Option<NewsCategory>,
    #[serde(default = "default_days_back")]
    pub days_back: u32,
    #[serde(default = "default_trending_limit")]
    pub limit: u32,
}

fn default_days_back() -> u32 {
    7
}

fn default_trending_limit() -> u32 {
    20
}

#[derive(Serialize, Deserialize)]
pub struct GetTrendingQuestionsResponse {
    pub questions: Vec<crate::models::TrendingQuestion>,
    pub total_count: u32,
}
