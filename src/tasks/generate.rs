//! Turning one news item into an interview question for one role.

use log::{info, warn};
use time::OffsetDateTime;

use crate::{
    ai::{Completion, TextGenerator},
    models::NewQuestion,
    news::FetchedItem,
    types::{Difficulty, NewsCategory, Position, QuestionType},
};

/// Results at or below this relevance are discarded.
pub const RELEVANCE_THRESHOLD: f64 = 0.3;

const BASE_RELEVANCE: f64 = 0.5;
const MIN_TITLE_CHARS: usize = 10;

const SYSTEM: &str = "You are an expert technical interviewer who creates insightful questions based on current industry news and trends.";

pub const NEWS_KEYWORDS: [&str; 3] = ["current trends", "industry insight", "technical opinion"];

pub fn role_keywords(position: Position) -> &'static [&'static str] {
    match position {
        Position::Frontend => &["react", "vue", "angular", "javascript", "css", "html", "ui", "ux"],
        Position::Backend => &["api", "database", "server", "python", "java", "node", "sql"],
        Position::Fullstack => &["full stack", "frontend", "backend", "web development"],
        Position::Mobile => &["mobile", "ios", "android", "react native", "flutter", "app"],
        Position::Devops => &["docker", "kubernetes", "aws", "cloud", "deployment", "ci/cd"],
    }
}

fn category_context(category: NewsCategory) -> &'static str {
    match category {
        NewsCategory::Ai => "artificial intelligence, machine learning, or AI technology",
        NewsCategory::WebDev => "web development, frontend/backend technologies, or web frameworks",
        NewsCategory::Mobile => "mobile app development, React Native, Flutter, or mobile technologies",
        NewsCategory::Devops => "DevOps, cloud infrastructure, containers, or deployment technologies",
        NewsCategory::GeneralTech => "technology or software development",
    }
}

/// Base 0.5, plus 0.1 per role keyword in the title or summary, plus a
/// freshness bonus. Always within [0, 1].
pub fn relevance_score(item: &FetchedItem, position: Position, now: OffsetDateTime) -> f64 {
    let text = format!("{} {}", item.title, item.summary).to_lowercase();

    let hits = role_keywords(position)
        .iter()
        .filter(|k| text.contains(*k))
        .count();

    let age = now - item.published_at;
    let freshness = if age.whole_days() <= 1 {
        0.2
    } else if age.whole_days() <= 3 {
        0.1
    } else {
        0.0
    };

    (BASE_RELEVANCE + hits as f64 * 0.1 + freshness).clamp(0.0, 1.0)
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

pub fn classify_question(question: &str) -> QuestionType {
    let q = question.to_lowercase();

    if contains_any(&q, &["how would you", "what do you think", "your opinion", "perspective"]) {
        QuestionType::Opinion
    } else if contains_any(&q, &["implement", "design", "architecture", "technical", "code"]) {
        QuestionType::Technical
    } else {
        QuestionType::Behavioral
    }
}

/// Splits a `QUESTION: ... / REASONING: ...` reply. Returns (question, reasoning).
pub fn parse_generation(text: &str) -> (String, String) {
    let mut question = String::new();
    let mut reasoning = String::new();

    for line in text.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix("QUESTION:") {
            question = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("REASONING:") {
            reasoning = rest.trim().to_string();
        }
    }

    if question.is_empty() {
        let after = text.rsplit("QUESTION:").next().unwrap_or(text);
        question = after.split("REASONING:").next().unwrap_or("").trim().to_string();
        if text.contains("REASONING:") {
            reasoning = text.rsplit("REASONING:").next().unwrap_or("").trim().to_string();
        }
    }

    (question, reasoning)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub question: NewQuestion,
    pub question_type: QuestionType,
    pub reasoning: String,
    pub relevance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Generated(Candidate),
    Skipped,
    Failed(String),
}

impl GenerationOutcome {
    /// Generated and above the threshold.
    pub fn accepted(&self) -> Option<&Candidate> {
        match self {
            GenerationOutcome::Generated(c) if c.relevance > RELEVANCE_THRESHOLD => Some(c),
            _ => None,
        }
    }
}

pub async fn generate_question_from_news(
    generator: &dyn TextGenerator,
    model: &str,
    item: &FetchedItem,
    position: Position,
    category: NewsCategory,
    now: OffsetDateTime,
) -> GenerationOutcome {
    if item.title.trim().chars().count() < MIN_TITLE_CHARS {
        warn!("[Generate] Title too short, skipping: {:?}", item.title);
        return GenerationOutcome::Skipped;
    }

    let prompt = format!(
        "Based on the following recent news about {context}, generate a thoughtful interview question \
        for a {position} developer position. The question should be relevant to current industry trends \
        and encourage the candidate to share their perspective or technical understanding.\n\n\
        News Title: {title}\n\
        News Summary: {summary}\n\n\
        Generate a question that:\n\
        1. Is relevant to a {position} developer role\n\
        2. Encourages critical thinking about current industry trends\n\
        3. Can be answered based on the candidate's experience and opinion\n\
        4. Is professional and appropriate for an interview setting\n\n\
        Also provide a brief reasoning (1-2 sentences) for why this question is relevant.\n\n\
        Format your response as:\n\
        QUESTION: [your question here]\n\
        REASONING: [your reasoning here]",
        context = category_context(category),
        title = item.title,
        summary = item.summary,
    );

    let request = Completion::new(model, SYSTEM, prompt)
        .max_tokens(300)
        .temperature(0.7);

    let text = match generator.complete(request).await {
        Ok(text) => text,
        Err(e) => {
            warn!("[Generate] {position} question for {} failed: {e}", item.url);
            return GenerationOutcome::Failed(e.to_string());
        }
    };

    let (content, reasoning) = parse_generation(&text);
    if content.is_empty() {
        warn!("[Generate] Could not find a question in reply for {}", item.url);
        return GenerationOutcome::Failed("empty question".into());
    }

    let relevance = relevance_score(item, position, now);
    let question_type = classify_question(&content);
    info!(
        "[Generate] {position} question for {} scored {relevance:.2}",
        item.url
    );

    GenerationOutcome::Generated(Candidate {
        question: NewQuestion {
            content,
            position,
            difficulty: Difficulty::Medium,
            topic: Some(category.to_string()),
            question_type: Some(question_type),
            expected_keywords: NEWS_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        },
        question_type,
        reasoning,
        relevance,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use time::{Duration, macros::datetime};

    use super::*;

    struct Scripted {
        reply: anyhow::Result<String>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn ok(reply: &str) -> Self {
            Self {
                reply: Ok(reply.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn complete(&self, _request: Completion) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(anyhow::anyhow!("{e}")),
            }
        }
    }

    const NOW: OffsetDateTime = datetime!(2025-02-10 12:00 UTC);

    fn item(title: &str, summary: &str, age: Duration) -> FetchedItem {
        FetchedItem {
            title: title.into(),
            summary: summary.into(),
            content: String::new(),
            url: "https://example.com/post".into(),
            published_at: NOW - age,
        }
    }

    #[test]
    fn relevance_counts_keywords_and_freshness() {
        let fresh = item("React and CSS in 2025", "New UI patterns", Duration::hours(3));
        // react, css, ui + fresh
        assert!((relevance_score(&fresh, Position::Frontend, NOW) - 1.0).abs() < 1e-9);

        let stale = item("Quarterly earnings roundup", "", Duration::days(10));
        assert!((relevance_score(&stale, Position::Backend, NOW) - 0.5).abs() < 1e-9);

        let mid = item("Kubernetes tips", "", Duration::days(2));
        assert!((relevance_score(&mid, Position::Devops, NOW) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn relevance_is_clamped() {
        let loaded = item(
            "docker kubernetes aws cloud deployment ci/cd",
            "",
            Duration::ZERO,
        );
        assert_eq!(relevance_score(&loaded, Position::Devops, NOW), 1.0);
    }

    #[test]
    fn classification_order() {
        assert_eq!(
            classify_question("How would you design a cache?"),
            QuestionType::Opinion
        );
        assert_eq!(
            classify_question("Implement a rate limiter."),
            QuestionType::Technical
        );
        assert_eq!(
            classify_question("Tell me about a conflict with a colleague."),
            QuestionType::Behavioral
        );
    }

    #[test]
    fn parses_prefixed_lines_then_markers() {
        let (q, r) = parse_generation("QUESTION: What changed?\nREASONING: Because.");
        assert_eq!((q.as_str(), r.as_str()), ("What changed?", "Because."));

        let (q, r) = parse_generation("Sure! QUESTION: Inline one? REASONING: Inline why.");
        assert_eq!((q.as_str(), r.as_str()), ("Inline one?", "Inline why."));

        let (q, r) = parse_generation("Just a question?");
        assert_eq!((q.as_str(), r.as_str()), ("Just a question?", ""));
    }

    #[tokio::test]
    async fn short_titles_skip_the_model() {
        let generator = Scripted::ok("QUESTION: q\nREASONING: r");
        let outcome = generate_question_from_news(
            &generator,
            "m",
            &item("AI", "", Duration::ZERO),
            Position::Backend,
            NewsCategory::Ai,
            NOW,
        )
        .await;

        assert_eq!(outcome, GenerationOutcome::Skipped);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
        assert!(outcome.accepted().is_none());
    }

    #[tokio::test]
    async fn generated_question_carries_news_metadata() {
        let generator = Scripted::ok(
            "QUESTION: What do you think about server components?\nREASONING: Hot topic.",
        );
        let outcome = generate_question_from_news(
            &generator,
            "m",
            &item("React server components land", "", Duration::hours(1)),
            Position::Frontend,
            NewsCategory::WebDev,
            NOW,
        )
        .await;

        let candidate = outcome.accepted().expect("accepted").clone();
        assert_eq!(candidate.question_type, QuestionType::Opinion);
        assert_eq!(candidate.question.topic.as_deref(), Some("web_dev"));
        assert_eq!(candidate.question.difficulty, Difficulty::Medium);
        assert_eq!(candidate.question.expected_keywords.len(), 3);
        assert_eq!(candidate.reasoning, "Hot topic.");
    }

    #[tokio::test]
    async fn model_errors_and_empty_replies_fail() {
        let broken = Scripted {
            reply: Err(anyhow::anyhow!("boom")),
            calls: AtomicUsize::new(0),
        };
        let news = item("Long enough title here", "", Duration::ZERO);

        let outcome =
            generate_question_from_news(&broken, "m", &news, Position::Mobile, NewsCategory::Mobile, NOW)
                .await;
        assert!(matches!(outcome, GenerationOutcome::Failed(_)));

        let empty = Scripted::ok("QUESTION:\nREASONING: nothing");
        let outcome =
            generate_question_from_news(&empty, "m", &news, Position::Mobile, NewsCategory::Mobile, NOW)
                .await;
        assert!(matches!(outcome, GenerationOutcome::Failed(_)));
    }

    #[test]
    fn threshold_is_strict() {
        let candidate = |relevance| {
            GenerationOutcome::Generated(Candidate {
                question: NewQuestion {
                    content: "q".into(),
                    position: Position::Backend,
                    difficulty: Difficulty::Medium,
                    topic: None,
                    question_type: None,
                    expected_keywords: vec![],
                },
                question_type: QuestionType::Behavioral,
                reasoning: String::new(),
                relevance,
            })
        };

        assert!(candidate(0.3).accepted().is_none());
        assert!(candidate(0.31).accepted().is_some());
    }
}
