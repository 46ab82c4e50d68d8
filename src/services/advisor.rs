//! Fix suggestions from a text-generation service.
//!
//! Suggestions are enrichment only. Any failure falls back to
//! [`FALLBACK_SUGGESTIONS`] and never blocks persistence.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::AdvisorSettings;
use crate::error::{AppError, AppResult};

/// Suggestions returned when the advisor fails.
pub const FALLBACK_SUGGESTIONS: [&str; 3] = [
    "Review the error message carefully",
    "Check the workflow configuration",
    "Verify all dependencies are correctly specified",
];

/// Maximum number of suggestions kept from a reply.
pub const MAX_SUGGESTIONS: usize = 3;

const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

const SYSTEM_PROMPT: &str = "You are an expert CI/CD engineer with deep knowledge of GitHub Actions and pipeline failures.";

/// Facts about one failure handed to the advisor.
#[derive(Debug, Clone, Serialize)]
pub struct AdvicePrompt {
    pub workflow_name: String,
    pub failed_job: String,
    pub error_line: String,
    /// e.g. `Line 12`, or `Unknown line`
    pub location: String,
    pub failure_reason: String,
}

impl AdvicePrompt {
    pub fn render(&self) -> String {
        format!(
            "As a CI/CD expert, analyze this GitHub Actions workflow failure and provide specific, actionable suggestions:\n\n\
             Workflow: {}\n\
             Failed Job: {}\n\
             Error Line: {}\n\
             Error Context: {}\n\
             Failure Reason: {}\n\n\
             Please provide {} specific, actionable suggestions to fix this error. \
             Format each suggestion as a clear, concise bullet point.",
            self.workflow_name,
            self.failed_job,
            self.error_line,
            self.location,
            self.failure_reason,
            MAX_SUGGESTIONS
        )
    }
}

/// Text-generation collaborator producing short ordered fix suggestions.
#[async_trait]
pub trait Advisor: Send + Sync {
    async fn suggest(&self, prompt: &AdvicePrompt) -> AppResult<Vec<String>>;
}

/// Ask `advisor`, falling back to [`FALLBACK_SUGGESTIONS`] on error or an empty reply.
pub async fn suggestions_or_fallback(advisor: &dyn Advisor, prompt: &AdvicePrompt) -> Vec<String> {
    match advisor.suggest(prompt).await {
        Ok(suggestions) if !suggestions.is_empty() => suggestions,
        Ok(_) => fallback(),
        Err(e) => {
            warn!("Advisor failed for '{}': {}", prompt.failure_reason, e);
            fallback()
        }
    }
}

fn fallback() -> Vec<String> {
    FALLBACK_SUGGESTIONS.iter().map(|s| s.to_string()).collect()
}

/// Split a reply into suggestions: one per non-blank line, bullet markers
/// stripped, at most [`MAX_SUGGESTIONS`].
pub fn parse_suggestions(reply: &str) -> Vec<String> {
    reply
        .lines()
        .map(|line| line.trim().trim_start_matches(['-', '*', '•', ' ']).trim())
        .filter(|line| !line.is_empty())
        .take(MAX_SUGGESTIONS)
        .map(str::to_string)
        .collect()
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completion advisor.
pub struct OpenAiAdvisor {
    http_client: reqwest::Client,
    api_url: String,
    model: String,
    api_key: SecretString,
}

impl OpenAiAdvisor {
    pub fn new(settings: &AdvisorSettings, request_timeout: Duration) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| AppError::Upstream(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            api_key: SecretString::from(settings.api_key.expose_secret().to_string()),
        })
    }
}

#[async_trait]
impl Advisor for OpenAiAdvisor {
    async fn suggest(&self, prompt: &AdvicePrompt) -> AppResult<Vec<String>> {
        let user_prompt = prompt.render();
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            temperature: 0.7,
            max_tokens: 200,
        };

        let response: ChatResponse = self
            .http_client
            .post(format!("{}/chat/completions", self.api_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::Upstream("Advisor returned no content".to_string()))?;

        Ok(parse_suggestions(&content))
    }
}
