use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    settings::Settings,
};

pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";

const SYSTEM_PROMPT: &str =
    "You are an assistant that helps analyse and structure text.";

/// Answers a prompt with free text.
///
/// Answers are not expected to be deterministic.
pub trait LanguageModel {
    fn complete(&self, prompt: &str) -> Result<String>;
}

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct ChatClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl ChatClient {
    /// Build a client from settings, reading the API key from
    /// `OPENAI_API_KEY`.
    pub fn from_env(settings: &Settings) -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV_VAR).unwrap_or_default();
        Self::new(settings, api_key)
    }

    pub fn new(settings: &Settings, api_key: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Config(format!(
                "{API_KEY_ENV_VAR} is not set"
            )));
        }
        let http = reqwest::blocking::Client::builder()
            .timeout(settings.llm_timeout())
            .build()
            .map_err(|e| {
                Error::Config(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", settings.llm_base_url),
            model: settings.llm_model.clone(),
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl LanguageModel for ChatClient {
    fn complete(&self, prompt: &str) -> Result<String> {
        tracing::debug!(
            model = %self.model,
            prompt_chars = prompt.chars().count(),
            "requesting completion"
        );
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|e| {
                Error::Collaborator(format!("chat request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(Error::Collaborator(format!(
                "chat endpoint returned {status}: {body}"
            )));
        }

        let body = response.text().map_err(|e| {
            Error::Collaborator(format!("failed to read chat response: {e}"))
        })?;
        parse_completion(&body)
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Extract the first choice's text from a chat completions response body.
fn parse_completion(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body).map_err(|e| {
        Error::Collaborator(format!("malformed chat response: {e}"))
    })?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| {
            Error::Collaborator("chat response contained no answer".to_string())
        })
}
