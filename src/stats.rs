//! Aggregates over interview records for the progress and session endpoints.

use std::collections::BTreeMap;

use time::{Duration, OffsetDateTime};

use crate::{
    models::InterviewRecord,
    types::{PositionBreakdown, ProgressData, ProgressStatistics, SessionSummary},
};

const MINUTES_PER_PRACTICE_DAY: u32 = 15;

/// `7days`, `30days` or `90days`.
pub fn time_range_days(range: &str) -> Option<i64> {
    match range {
        "7days" => Some(7),
        "30days" => Some(30),
        "90days" => Some(90),
        _ => None,
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn average(scores: &[i64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<i64>() as f64 / scores.len() as f64
}

/// Per-day averages in ascending date order.
pub fn daily_progress<'a>(records: impl IntoIterator<Item = &'a InterviewRecord>) -> Vec<ProgressData> {
    let mut days: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for record in records {
        days.entry(record.created_at.date().to_string())
            .or_default()
            .push(record.score);
    }

    days.into_iter()
        .map(|(date, scores)| ProgressData {
            date,
            score: round2(average(&scores)),
            question_count: scores.len() as u32,
        })
        .collect()
}

pub fn progress_statistics(records: &[&InterviewRecord], daily: &[ProgressData]) -> ProgressStatistics {
    let scores: Vec<i64> = records.iter().map(|r| r.score).collect();

    let improvement_rate = match (daily.first(), daily.last()) {
        (Some(first), Some(last)) if daily.len() >= 2 && first.score != 0.0 => {
            round2((last.score - first.score) / first.score * 100.0)
        }
        _ => 0.0,
    };

    ProgressStatistics {
        total_questions: scores.len() as u32,
        average_score: round2(average(&scores)),
        improvement_rate,
        best_score: scores.iter().copied().max().unwrap_or(0),
        worst_score: scores.iter().copied().min().unwrap_or(0),
        current_streak: daily.len() as u32,
        total_practice_time: daily.len() as u32 * MINUTES_PER_PRACTICE_DAY,
    }
}

/// Count and average per position, ordered by position name.
pub fn position_breakdown(records: &[InterviewRecord]) -> Vec<PositionBreakdown> {
    let mut by_position: BTreeMap<&str, Vec<i64>> = BTreeMap::new();
    for record in records {
        by_position
            .entry(record.position.as_str())
            .or_default()
            .push(record.score);
    }

    by_position
        .into_iter()
        .map(|(position, scores)| PositionBreakdown {
            position: position.to_string(),
            question_count: scores.len() as u32,
            average_score: round2(average(&scores)),
        })
        .collect()
}

pub fn session_summary(
    records: &[InterviewRecord],
    started_at: OffsetDateTime,
    completed_at: OffsetDateTime,
) -> SessionSummary {
    let scores: Vec<i64> = records.iter().map(|r| r.score).collect();
    let average_score = round2(average(&scores));
    let duration: Duration = completed_at - started_at;

    let strengths = if average_score >= 70.0 {
        vec!["Problem-solving approach", "Technical knowledge"]
    } else {
        vec!["Basic understanding"]
    };
    let improvements = if average_score < 80.0 {
        vec!["Communication clarity", "Depth of explanation"]
    } else {
        vec!["Minor optimizations"]
    };

    SessionSummary {
        total_questions: scores.len() as u32,
        average_score,
        total_duration: duration.whole_minutes().max(0),
        strengths: strengths.into_iter().map(String::from).collect(),
        areas_for_improvement: improvements.into_iter().map(String::from).collect(),
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn record(position: &str, score: i64, at: OffsetDateTime) -> InterviewRecord {
        InterviewRecord {
            id: format!("{position}-{score}-{at}"),
            session_id: None,
            question_id: "q".into(),
            user_id: 1,
            question_content: "q".into(),
            answer: "a".into(),
            score,
            feedback: String::new(),
            position: position.into(),
            evaluation_details: serde_json::json!({}),
            created_at: at,
        }
    }

    #[test]
    fn progress_over_two_days() {
        let records = vec![
            record("backend", 40, datetime!(2025-01-01 09:00 UTC)),
            record("backend", 60, datetime!(2025-01-01 18:00 UTC)),
            record("frontend", 75, datetime!(2025-01-02 10:00 UTC)),
        ];
        let all: Vec<&InterviewRecord> = records.iter().collect();
        let daily = daily_progress(all.iter().copied());

        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, "2025-01-01");
        assert_eq!(daily[0].score, 50.0);
        assert_eq!(daily[0].question_count, 2);

        let stats = progress_statistics(&all, &daily);
        assert_eq!(stats.total_questions, 3);
        assert_eq!(stats.best_score, 75);
        assert_eq!(stats.worst_score, 40);
        assert_eq!(stats.improvement_rate, 50.0);
        assert_eq!(stats.current_streak, 2);
        assert_eq!(stats.total_practice_time, 30);

        let breakdown = position_breakdown(&records);
        assert_eq!(breakdown[0].position, "backend");
        assert_eq!(breakdown[0].average_score, 50.0);
        assert_eq!(breakdown[1].question_count, 1);
    }

    #[test]
    fn empty_progress_is_zeroed() {
        let stats = progress_statistics(&[], &[]);
        assert_eq!(stats.total_questions, 0);
        assert_eq!(stats.average_score, 0.0);
        assert_eq!(stats.improvement_rate, 0.0);
        assert_eq!(stats.best_score, 0);
    }

    #[test]
    fn ranges() {
        assert_eq!(time_range_days("7days"), Some(7));
        assert_eq!(time_range_days("1year"), None);
    }

    #[test]
    fn session_summary_tiers() {
        let start = datetime!(2025-01-01 10:00 UTC);
        let records = vec![record("backend", 90, start), record("backend", 70, start)];
        let summary = session_summary(&records, start, start + Duration::minutes(25));

        assert_eq!(summary.total_questions, 2);
        assert_eq!(summary.average_score, 80.0);
        assert_eq!(summary.total_duration, 25);
        assert_eq!(summary.strengths[0], "Problem-solving approach");
        assert_eq!(summary.areas_for_improvement, ["Minor optimizations"]);

        let empty = session_summary(&[], start, start);
        assert_eq!(empty.average_score, 0.0);
        assert_eq!(empty.strengths, ["Basic understanding"]);
    }
}
