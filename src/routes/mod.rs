pub mod gets;
pub mod posts;
pub mod puts;

use actix_web::web::{self, scope};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use libsql::Connection;
use time::{Duration, OffsetDateTime};

use crate::{config::Config, error::AppError, queries::users, utils::parse_date_param};

/// Mounts every route. `/questions/categories` has to be registered ahead of
/// `/questions/{question_id}`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(gets::root).service(gets::health).service(
        scope("/api")
            .service(posts::register)
            .service(posts::login)
            .service(gets::list_users)
            .service(gets::get_user)
            .service(gets::get_interview_records)
            .service(posts::save_interview_record)
            .service(gets::get_progress)
            .service(gets::get_preferences)
            .service(puts::update_preferences)
            .service(posts::generate_question)
            .service(gets::get_question_categories)
            .service(gets::get_question)
            .service(posts::evaluate_answer)
            .service(posts::start_session)
            .service(puts::complete_session)
            .service(gets::get_session)
            .service(posts::fetch_news)
            .service(posts::scheduled_fetch)
            .service(gets::get_trending_questions)
            .service(gets::get_news_sources),
    );
}

/// Passes when no admin token is configured.
pub(crate) fn require_admin(config: &Config, auth: Option<BearerAuth>) -> Result<(), AppError> {
    let Some(expected) = &config.admin_token else {
        return Ok(());
    };

    match auth {
        Some(auth) if auth.token() == expected => Ok(()),
        _ => Err(AppError::Unauthorized("Missing or invalid admin token".into())),
    }
}

pub(crate) async fn ensure_user(conn: &Connection, user_id: i64) -> Result<(), AppError> {
    if users::user_exists(conn, user_id).await? {
        Ok(())
    } else {
        Err(AppError::not_found("User"))
    }
}

/// A bare `YYYY-MM-DD` upper bound covers that whole day.
pub(crate) fn date_bound(
    name: &str,
    value: Option<&str>,
    end_of_day: bool,
) -> Result<Option<OffsetDateTime>, AppError> {
    let Some(value) = value.filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };

    let parsed = parse_date_param(value)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid {name}: {value}")))?;

    if end_of_day && !value.contains('T') {
        return Ok(Some(parsed + Duration::days(1) - Duration::seconds(1)));
    }

    Ok(Some(parsed))
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    #[test]
    fn date_bounds() {
        assert_eq!(date_bound("date_from", None, false).unwrap(), None);
        assert_eq!(
            date_bound("date_to", Some("2025-01-02"), true).unwrap(),
            Some(datetime!(2025-01-02 23:59:59 UTC))
        );
        assert_eq!(
            date_bound("date_from", Some("2025-01-02"), false).unwrap(),
            Some(datetime!(2025-01-02 00:00 UTC))
        );
        assert!(date_bound("date_from", Some("soon"), false).is_err());
    }

    #[test]
    fn admin_check_is_open_without_token() {
        assert!(require_admin(&Config::default(), None).is_ok());

        let locked = Config {
            admin_token: Some("s3cret".into()),
            ..Config::default()
        };
        assert!(matches!(
            require_admin(&locked, None),
            Err(AppError::Unauthorized(_))
        ));
    }
}
