//! Row types decoded straight out of libsql with `libsql::de::from_row`.
//!
//! SQLite has no booleans, enums or arrays, so the `serde_as` adapters below
//! read integer flags, text enums and JSON text columns back into real types.
//! Serialization stays the plain serde form used by the JSON API.

use serde::{Deserialize, Serialize};
use serde_with::{BoolFromInt, DisplayFromStr, json::JsonString, serde_as};
use time::OffsetDateTime;

use crate::{
    scoring::EvaluationDetails,
    types::{
        Difficulty, NewsCategory, NewsSourceType, NotificationSettings, Position, QuestionType,
        SessionStatus, SessionType,
    },
};

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    #[serde_as(deserialize_as = "BoolFromInt")]
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserPreferences {
    pub user_id: i64,
    #[serde_as(deserialize_as = "DisplayFromStr")]
    pub preferred_position: Position,
    #[serde_as(deserialize_as = "DisplayFromStr")]
    pub difficulty_level: Difficulty,
    pub daily_question_goal: u32,
    #[serde_as(deserialize_as = "JsonString")]
    pub notification_settings: NotificationSettings,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Question {
    pub id: String,
    pub content: String,
    pub position: String,
    pub difficulty: String,
    pub topic: Option<String>,
    pub question_type: Option<String>,
    #[serde_as(deserialize_as = "JsonString")]
    pub expected_keywords: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Everything needed to insert a question row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub content: String,
    pub position: Position,
    pub difficulty: Difficulty,
    pub topic: Option<String>,
    pub question_type: Option<QuestionType>,
    pub expected_keywords: Vec<String>,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct InterviewSession {
    pub id: String,
    pub user_id: i64,
    pub position: String,
    #[serde_as(deserialize_as = "DisplayFromStr")]
    pub status: SessionStatus,
    #[serde_as(deserialize_as = "DisplayFromStr")]
    pub session_type: SessionType,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub completed_at: Option<OffsetDateTime>,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct InterviewRecord {
    pub id: String,
    pub session_id: Option<String>,
    pub question_id: String,
    pub user_id: i64,
    pub question_content: String,
    pub answer: String,
    pub score: i64,
    pub feedback: String,
    pub position: String,
    #[serde_as(deserialize_as = "JsonString")]
    pub evaluation_details: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AnswerEvaluation {
    pub id: String,
    pub question_id: String,
    pub user_id: i64,
    pub session_id: Option<String>,
    pub answer: String,
    pub score: i64,
    pub feedback: String,
    #[serde_as(deserialize_as = "JsonString")]
    pub strengths: Vec<String>,
    #[serde_as(deserialize_as = "JsonString")]
    pub improvements: Vec<String>,
    #[serde_as(deserialize_as = "JsonString")]
    pub keywords_covered: Vec<String>,
    #[serde_as(deserialize_as = "JsonString")]
    pub keywords_missed: Vec<String>,
    #[serde_as(deserialize_as = "JsonString")]
    pub evaluation_details: EvaluationDetails,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NewsSource {
    pub id: i64,
    pub name: String,
    #[serde_as(deserialize_as = "DisplayFromStr")]
    pub source_type: NewsSourceType,
    pub url: String,
    #[serde_as(deserialize_as = "DisplayFromStr")]
    pub category: NewsCategory,
    #[serde_as(deserialize_as = "BoolFromInt")]
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub last_fetched: Option<OffsetDateTime>,
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NewsItem {
    pub id: i64,
    pub source_id: i64,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub url: String,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    #[serde_as(deserialize_as = "DisplayFromStr")]
    pub category: NewsCategory,
    #[serde_as(deserialize_as = "BoolFromInt")]
    pub is_processed: bool,
}

/// Joined view of news_based_questions -> questions -> news_items.
#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TrendingQuestion {
    pub id: i64,
    pub content: String,
    pub position: String,
    pub difficulty: String,
    #[serde_as(deserialize_as = "DisplayFromStr")]
    pub question_type: QuestionType,
    pub source_title: String,
    pub source_url: String,
    pub source_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
    pub relevance_score: f64,
    pub ai_reasoning: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
