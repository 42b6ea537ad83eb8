use libsql::{Builder, Connection, Database, OpenFlags};
use log::{info, warn};

use crate::config::Config;

pub async fn get_database(config: &Config) -> anyhow::Result<Database> {
    let db = match &config.database_auth_key {
        Some(auth_key) => {
            info!("[Database] Using remote database {}", config.database_url);
            Builder::new_remote(config.database_url.clone(), auth_key.clone())
                .build()
                .await?
        }
        None => {
            info!("[Database] Using local database {}", config.database_url);
            Builder::new_local(&config.database_url)
                .flags(OpenFlags::default())
                .build()
                .await?
        }
    };

    Ok(db)
}

/// Opens a connection and applies the local pragmas. Remote databases reject
/// pragmas, which is only worth a warning.
pub async fn connect(db: &Database) -> anyhow::Result<Connection> {
    let conn = db.connect()?;

    for pragma in ["PRAGMA busy_timeout = 5000", "PRAGMA foreign_keys = ON"] {
        if let Err(e) = conn.query(pragma, ()).await {
            warn!("[Database] {pragma} failed: {e}");
        }
    }

    Ok(conn)
}

pub const USERS_T: &str = "users";
pub const PREFERENCES_T: &str = "user_preferences";
pub const QUESTIONS_T: &str = "questions";
pub const SESSIONS_T: &str = "interview_sessions";
pub const RECORDS_T: &str = "interview_records";
pub const EVALUATIONS_T: &str = "answer_evaluations";
pub const NEWS_SOURCES_T: &str = "news_sources";
pub const NEWS_ITEMS_T: &str = "news_items";
pub const NEWS_QUESTIONS_T: &str = "news_based_questions";

pub const VERSION_T: &str = "db_version";

pub const CURRENT_VERSION: u32 = 1;

async fn v1(conn: &Connection) -> anyhow::Result<()> {
    #[rustfmt::skip]
    let stmnts = [
        format!(
            "CREATE TABLE IF NOT EXISTS `{USERS_T}`(
                `id` INTEGER NOT NULL PRIMARY KEY,
                `username` TEXT NOT NULL UNIQUE,
                `email` TEXT NOT NULL UNIQUE,
                `hashed_password` TEXT NOT NULL,
                `is_active` INTEGER NOT NULL DEFAULT 1,
                `created_at` TEXT NOT NULL
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS `{PREFERENCES_T}`(
                `user_id` INTEGER NOT NULL PRIMARY KEY REFERENCES {USERS_T}(id),
                `preferred_position` TEXT NOT NULL DEFAULT 'frontend',
                `difficulty_level` TEXT NOT NULL DEFAULT 'medium',
                `daily_question_goal` INTEGER NOT NULL DEFAULT 5,
                `notification_settings` TEXT NOT NULL,
                `updated_at` TEXT NOT NULL
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS `{QUESTIONS_T}`(
                `id` TEXT NOT NULL PRIMARY KEY,
                `content` TEXT NOT NULL,
                `position` TEXT NOT NULL,
                `difficulty` TEXT NOT NULL,
                `topic` TEXT,
                `question_type` TEXT,
                `expected_keywords` TEXT NOT NULL DEFAULT '[]',
                `created_at` TEXT NOT NULL
            )"
        ),
        format!("CREATE INDEX IF NOT EXISTS idx_questions_position ON {QUESTIONS_T} (position)"),
        format!(
            "CREATE TABLE IF NOT EXISTS `{SESSIONS_T}`(
                `id` TEXT NOT NULL PRIMARY KEY,
                `user_id` INTEGER NOT NULL REFERENCES {USERS_T}(id),
                `position` TEXT NOT NULL,
                `status` TEXT NOT NULL,
                `session_type` TEXT NOT NULL,
                `started_at` TEXT NOT NULL,
                `completed_at` TEXT
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS `{RECORDS_T}`(
                `id` TEXT NOT NULL PRIMARY KEY,
                `session_id` TEXT,
                `question_id` TEXT NOT NULL,
                `user_id` INTEGER NOT NULL REFERENCES {USERS_T}(id),
                `question_content` TEXT NOT NULL,
                `answer` TEXT NOT NULL,
                `score` INTEGER NOT NULL,
                `feedback` TEXT NOT NULL,
                `position` TEXT NOT NULL,
                `evaluation_details` TEXT NOT NULL DEFAULT '{{}}',
                `created_at` TEXT NOT NULL
            )"
        ),
        format!("CREATE INDEX IF NOT EXISTS idx_records_user ON {RECORDS_T} (user_id, created_at)"),
        format!("CREATE INDEX IF NOT EXISTS idx_records_session ON {RECORDS_T} (session_id)"),
        format!(
            "CREATE TABLE IF NOT EXISTS `{EVALUATIONS_T}`(
                `id` TEXT NOT NULL PRIMARY KEY,
                `question_id` TEXT NOT NULL,
                `user_id` INTEGER NOT NULL,
                `session_id` TEXT,
                `answer` TEXT NOT NULL,
                `score` INTEGER NOT NULL,
                `feedback` TEXT NOT NULL,
                `strengths` TEXT NOT NULL,
                `improvements` TEXT NOT NULL,
                `keywords_covered` TEXT NOT NULL,
                `keywords_missed` TEXT NOT NULL,
                `evaluation_details` TEXT NOT NULL,
                `created_at` TEXT NOT NULL
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS `{NEWS_SOURCES_T}`(
                `id` INTEGER NOT NULL PRIMARY KEY,
                `name` TEXT NOT NULL,
                `source_type` TEXT NOT NULL,
                `url` TEXT NOT NULL,
                `category` TEXT NOT NULL,
                `is_active` INTEGER NOT NULL DEFAULT 1,
                `last_fetched` TEXT
            )"
        ),
        format!("CREATE INDEX IF NOT EXISTS idx_sources_url ON {NEWS_SOURCES_T} (url, category)"),
        format!(
            "CREATE TABLE IF NOT EXISTS `{NEWS_ITEMS_T}`(
                `id` INTEGER NOT NULL PRIMARY KEY,
                `source_id` INTEGER NOT NULL REFERENCES {NEWS_SOURCES_T}(id),
                `title` TEXT NOT NULL,
                `summary` TEXT NOT NULL,
                `content` TEXT NOT NULL,
                `url` TEXT NOT NULL UNIQUE,
                `published_at` TEXT NOT NULL,
                `category` TEXT NOT NULL,
                `is_processed` INTEGER NOT NULL DEFAULT 0,
                `created_at` TEXT NOT NULL
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS `{NEWS_QUESTIONS_T}`(
                `id` INTEGER NOT NULL PRIMARY KEY,
                `news_item_id` INTEGER NOT NULL REFERENCES {NEWS_ITEMS_T}(id),
                `question_id` TEXT NOT NULL REFERENCES {QUESTIONS_T}(id),
                `relevance_score` REAL NOT NULL,
                `question_type` TEXT NOT NULL,
                `ai_reasoning` TEXT NOT NULL,
                `created_at` TEXT NOT NULL
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS `{VERSION_T}`(
                `id` INTEGER NOT NULL PRIMARY KEY,
                `version_number` INTEGER NOT NULL
            )"
        ),
        format!("INSERT OR IGNORE INTO {VERSION_T} (id, version_number) VALUES (1, 1)"),
    ];

    conn.execute_transactional_batch(&stmnts.join(";\n"))
        .await?;

    Ok(())
}

pub async fn get_version_number(conn: &Connection) -> anyhow::Result<u32> {
    let mut res = conn
        .query(
            &format!("SELECT version_number FROM {VERSION_T} WHERE id = ?1"),
            [1],
        )
        .await?;

    let Some(row) = res.next().await? else {
        return Ok(0);
    };

    Ok(row.get(0)?)
}

pub async fn migrate_db(conn: &Connection) -> anyhow::Result<()> {
    v1(conn).await?;

    let version_number = get_version_number(conn).await?;
    info!("[Database] Schema at version {version_number}");

    if version_number > CURRENT_VERSION {
        warn!(
            "[Database] Schema version {version_number} is newer than this build ({CURRENT_VERSION})"
        );
    }

    Ok(())
}
