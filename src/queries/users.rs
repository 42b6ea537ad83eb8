use libsql::{Connection, params};
use serde::Deserialize;

use super::{collect_rows, first_row};
use crate::{
    db::{PREFERENCES_T, USERS_T},
    models::{User, UserPreferences},
    types::{Difficulty, NotificationSettings, Position},
    utils::{db_time, now_utc},
};

pub async fn create_user(
    db: &Connection,
    username: &str,
    email: &str,
    hashed_password: &str,
) -> anyhow::Result<User> {
    let rows = db
        .query(
            &format!(
                "INSERT INTO {USERS_T}
                    (username, email, hashed_password, is_active, created_at)
                VALUES
                    (?1, ?2, ?3, 1, ?4)
                RETURNING *
                "
            ),
            params![username, email, hashed_password, db_time(now_utc())],
        )
        .await?;

    first_row(rows)
        .await?
        .ok_or_else(|| anyhow::anyhow!("insert into {USERS_T} returned no row"))
}

#[derive(Deserialize)]
struct Taken {
    username_taken: i64,
    email_taken: i64,
}

/// (username taken, email taken)
pub async fn find_conflicts(
    db: &Connection,
    username: &str,
    email: &str,
) -> anyhow::Result<(bool, bool)> {
    let rows = db
        .query(
            &format!(
                "SELECT
                    EXISTS(SELECT 1 FROM {USERS_T} WHERE username = ?1) AS username_taken,
                    EXISTS(SELECT 1 FROM {USERS_T} WHERE email = ?2) AS email_taken
                "
            ),
            params![username, email],
        )
        .await?;

    let taken: Option<Taken> = first_row(rows).await?;
    Ok(taken.map_or((false, false), |t| {
        (t.username_taken != 0, t.email_taken != 0)
    }))
}

pub async fn get_user(db: &Connection, id: i64) -> anyhow::Result<Option<User>> {
    let rows = db
        .query(&format!("SELECT * FROM {USERS_T} WHERE id = ?1"), [id])
        .await?;

    first_row(rows).await
}

pub async fn get_user_by_username(db: &Connection, username: &str) -> anyhow::Result<Option<User>> {
    let rows = db
        .query(
            &format!("SELECT * FROM {USERS_T} WHERE username = ?1"),
            [username],
        )
        .await?;

    first_row(rows).await
}

pub async fn list_users(db: &Connection) -> anyhow::Result<Vec<User>> {
    let rows = db
        .query(&format!("SELECT * FROM {USERS_T} ORDER BY id"), ())
        .await?;

    collect_rows(rows).await
}

pub async fn user_exists(db: &Connection, id: i64) -> anyhow::Result<bool> {
    let mut rows = db
        .query(&format!("SELECT 1 FROM {USERS_T} WHERE id = ?1"), [id])
        .await?;

    Ok(rows.next().await?.is_some())
}

pub fn default_preferences(user_id: i64) -> UserPreferences {
    UserPreferences {
        user_id,
        preferred_position: Position::default(),
        difficulty_level: Difficulty::default(),
        daily_question_goal: 5,
        notification_settings: NotificationSettings::default(),
        updated_at: now_utc(),
    }
}

/// Inserts or replaces the whole preferences row.
pub async fn save_preferences(db: &Connection, prefs: &UserPreferences) -> anyhow::Result<()> {
    db.execute(
        &format!(
            "INSERT INTO {PREFERENCES_T}
                (user_id, preferred_position, difficulty_level, daily_question_goal, notification_settings, updated_at)
            VALUES
                (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(user_id) DO UPDATE SET
                preferred_position = excluded.preferred_position,
                difficulty_level = excluded.difficulty_level,
                daily_question_goal = excluded.daily_question_goal,
                notification_settings = excluded.notification_settings,
                updated_at = excluded.updated_at
            "
        ),
        params![
            prefs.user_id,
            prefs.preferred_position.as_str(),
            prefs.difficulty_level.as_str(),
            prefs.daily_question_goal,
            serde_json::to_string(&prefs.notification_settings)?,
            db_time(prefs.updated_at),
        ],
    )
    .await?;

    Ok(())
}

pub async fn get_preferences(db: &Connection, user_id: i64) -> anyhow::Result<Option<UserPreferences>> {
    let rows = db
        .query(
            &format!("SELECT * FROM {PREFERENCES_T} WHERE user_id = ?1"),
            [user_id],
        )
        .await?;

    first_row(rows).await
}
