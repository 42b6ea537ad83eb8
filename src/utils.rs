use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use time::{
    Date, Duration, OffsetDateTime, UtcOffset,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};
use uuid::Uuid;

const DB_TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

/// Current UTC time truncated to whole seconds, so stored timestamps have a
/// fixed width and sort lexically.
pub fn now_utc() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now - Duration::nanoseconds(now.nanosecond() as i64)
}

/// `YYYY-MM-DDTHH:MM:SSZ`, the format every timestamp column uses.
pub fn db_time(ts: OffsetDateTime) -> String {
    // Formatting a UTC timestamp against this description has no failure path.
    ts.to_offset(UtcOffset::UTC)
        .format(DB_TIME_FORMAT)
        .unwrap_or_default()
}

/// Accepts a full RFC 3339 timestamp or a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_date_param(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();
    if let Ok(ts) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(ts.to_offset(UtcOffset::UTC));
    }

    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|d| d.midnight().assume_utc())
}

pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// "fullstack" -> "Fullstack"
pub fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

fn password_digest(salt: &str, password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

/// Stored as `salt$hex(sha256(salt || password))`.
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    let digest = hex::encode(password_digest(&salt, password));
    format!("{salt}${digest}")
}

/// Digests are compared in constant time.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, digest)) = stored.split_once('$') else {
        return false;
    };
    let Ok(expected) = hex::decode(digest) else {
        return false;
    };
    password_digest(salt, password).ct_eq(&expected).into()
}
