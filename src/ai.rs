//! Chat-completion client used for question generation and answer grading.

use anyhow::{Context, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// One request to the text-generation service.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub model: String,
    pub system: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub frequency_penalty: Option<f32>,
    pub presence_penalty: Option<f32>,
}

impl Completion {
    pub fn new(model: &str, system: &str, prompt: String) -> Self {
        Self {
            model: model.to_string(),
            system: system.to_string(),
            prompt,
            max_tokens: 300,
            temperature: 0.7,
            frequency_penalty: None,
            presence_penalty: None,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn penalties(mut self, frequency: f32, presence: f32) -> Self {
        self.frequency_penalty = Some(frequency);
        self.presence_penalty = Some(presence);
        self
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the trimmed text of the first choice.
    async fn complete(&self, request: Completion) -> anyhow::Result<String>;
}

/// OpenAI-compatible `/chat/completions` client.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("mockmate/", env!("CARGO_PKG_VERSION")))
            .timeout(config.ai_timeout)
            .build()
            .context("building AI http client")?;

        Ok(Self {
            http,
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    content: Option<String>,
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    async fn complete(&self, request: Completion) -> anyhow::Result<String> {
        if self.api_key.is_empty() {
            bail!("OPENAI_API_KEY is not set");
        }

        let body = Req {
            model: &request.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: &request.system,
                },
                Msg {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            frequency_penalty: request.frequency_penalty,
            presence_penalty: request.presence_penalty,
        };

        let res = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("chat completion request")?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            bail!(
                "chat completion failed with status {status}: {}",
                text.chars().take(200).collect::<String>()
            );
        }

        let resp: Resp = res.json().await.context("decoding chat completion")?;
        let content = resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(content.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let client = OpenAiClient::new(&Config::default()).unwrap();
        let err = client
            .complete(Completion::new("gpt-4o-mini", "sys", "hi".into()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn request_omits_unset_penalties() {
        let body = Req {
            model: "m",
            messages: vec![],
            max_tokens: 10,
            temperature: 0.5,
            frequency_penalty: None,
            presence_penalty: Some(0.8),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("frequency_penalty").is_none());
        assert!(json.get("presence_penalty").is_some());
    }
}
