//! Answer grading: a model-backed evaluator with a deterministic fallback.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::ai::{Completion, TextGenerator};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct EvaluationDetails {
    pub technical_accuracy: u32,
    pub communication_clarity: u32,
    pub completeness: u32,
    pub practical_experience: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnswerEvaluationResult {
    pub score: i64,
    pub feedback: String,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub keywords_covered: Vec<String>,
    pub keywords_missed: Vec<String>,
    pub details: EvaluationDetails,
}

const EVALUATOR_SYSTEM: &str = "You are an expert technical interviewer. Evaluate answers fairly and reply with JSON only.";

/// Grades with the model and falls back to [`evaluate_answer_mock`] on any
/// call or parse failure.
pub async fn evaluate_answer(
    generator: &dyn TextGenerator,
    model: &str,
    question: &str,
    answer: &str,
    expected_keywords: &[String],
) -> AnswerEvaluationResult {
    let prompt = format!(
        "Question: {question}\n\
        Expected keywords: {}\n\
        Candidate answer: {answer}\n\n\
        Respond with a JSON object with the fields: score (0-100), feedback (string), \
        strengths (array of strings), improvements (array of strings), \
        keywords_covered (array), keywords_missed (array), and evaluation_details \
        with technical_accuracy, communication_clarity, completeness and \
        practical_experience (each 0-100).",
        expected_keywords.join(", ")
    );

    let request = Completion::new(model, EVALUATOR_SYSTEM, prompt)
        .max_tokens(800)
        .temperature(0.3);

    match generator.complete(request).await {
        Ok(text) => match parse_ai_evaluation(&text, expected_keywords) {
            Some(result) => result,
            None => {
                warn!("[Evaluate] Model reply was not a usable verdict, using fallback scoring");
                evaluate_answer_mock(answer, expected_keywords)
            }
        },
        Err(e) => {
            warn!("[Evaluate] Model call failed, using fallback scoring: {e}");
            evaluate_answer_mock(answer, expected_keywords)
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawDetails {
    technical_accuracy: Option<f64>,
    communication_clarity: Option<f64>,
    completeness: Option<f64>,
    practical_experience: Option<f64>,
}

#[derive(Deserialize)]
struct RawVerdict {
    score: f64,
    feedback: Option<String>,
    strengths: Option<Vec<String>>,
    improvements: Option<Vec<String>>,
    keywords_covered: Option<Vec<String>>,
    keywords_missed: Option<Vec<String>>,
    #[serde(default)]
    evaluation_details: RawDetails,
}

fn clamp_score(v: f64) -> u32 {
    v.clamp(0.0, 100.0) as u32
}

/// Models like to wrap JSON in a markdown fence.
fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub fn parse_ai_evaluation(text: &str, expected_keywords: &[String]) -> Option<AnswerEvaluationResult> {
    let raw: RawVerdict = serde_json::from_str(strip_code_fence(text)).ok()?;
    let score = clamp_score(raw.score);
    let d = raw.evaluation_details;

    Some(AnswerEvaluationResult {
        score: score as i64,
        feedback: raw
            .feedback
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| "No feedback provided".into()),
        strengths: raw
            .strengths
            .unwrap_or_else(|| vec!["Answer provided".into()]),
        improvements: raw
            .improvements
            .unwrap_or_else(|| vec!["Could be more detailed".into()]),
        keywords_covered: raw.keywords_covered.unwrap_or_default(),
        keywords_missed: raw
            .keywords_missed
            .unwrap_or_else(|| expected_keywords.to_vec()),
        details: EvaluationDetails {
            technical_accuracy: clamp_score(d.technical_accuracy.unwrap_or(score as f64)),
            communication_clarity: clamp_score(d.communication_clarity.unwrap_or(score as f64)),
            completeness: clamp_score(d.completeness.unwrap_or(score as f64)),
            practical_experience: clamp_score(d.practical_experience.unwrap_or(score as f64)),
        },
    })
}

/// Heuristic grading from word count and keyword coverage.
pub fn evaluate_answer_mock(answer: &str, expected_keywords: &[String]) -> AnswerEvaluationResult {
    let words = answer.split_whitespace().count() as f64;
    let lower = answer.to_lowercase();

    let (covered, missed): (Vec<String>, Vec<String>) = expected_keywords
        .iter()
        .cloned()
        .partition(|k| lower.contains(&k.to_lowercase()));

    let length_score = (words / 50.0 * 40.0).min(40.0);
    let keyword_score = covered.len() as f64 / expected_keywords.len().max(1) as f64 * 30.0;
    let structure_score = if words > 20.0 { 20.0 } else { words };
    let clarity_score = 10.0;

    let total = (length_score + keyword_score + structure_score + clarity_score) as i64;
    let score = total.min(100);

    let (feedback, strengths, improvements): (&str, Vec<&str>, Vec<&str>) = if score >= 80 {
        (
            "Excellent answer! You demonstrated strong understanding and provided comprehensive details.",
            vec!["Clear explanation", "Good technical depth", "Well structured"],
            vec!["Consider adding more examples"],
        )
    } else if score >= 60 {
        (
            "Good answer with room for improvement. You covered the main points but could expand on some areas.",
            vec!["Basic understanding shown", "Relevant points covered"],
            vec![
                "Add more technical details",
                "Provide concrete examples",
                "Improve structure",
            ],
        )
    } else {
        (
            "Your answer needs significant improvement. Consider studying the topic more thoroughly.",
            vec!["Attempted to answer"],
            vec![
                "Study fundamental concepts",
                "Practice technical explanations",
                "Add more detail",
            ],
        )
    };

    AnswerEvaluationResult {
        score,
        feedback: feedback.to_string(),
        strengths: strengths.into_iter().map(String::from).collect(),
        improvements: improvements.into_iter().map(String::from).collect(),
        keywords_covered: covered,
        keywords_missed: missed,
        details: EvaluationDetails {
            technical_accuracy: (length_score / 40.0 * 100.0) as u32,
            communication_clarity: (clarity_score / 10.0 * 100.0) as u32,
            completeness: (keyword_score / 30.0 * 100.0) as u32,
            practical_experience: (structure_score / 20.0 * 100.0) as u32,
        },
    }
}
