//! The language-model adapter: single-shot, non-streaming completion
//! against a pluggable backend.
//!
//! Backend failures (bad model id, auth, unreachable server) surface to
//! the caller verbatim. Nothing here retries.

use std::str::FromStr;

use serde::Deserialize;
use serde_json::json;

use crate::{
    error::{Error, Result},
    settings::Settings,
};

pub trait Llm: std::fmt::Debug {
    /// Generate a completion for a prompt.
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// The closed set of supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmKind {
    OpenAi,
    Ollama,
}

impl FromStr for LlmKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(Error::Config(format!("unknown LLM type: {other}"))),
        }
    }
}

/// Instantiate an LLM backend by kind.
pub fn load_llm(kind: LlmKind, model: &str, settings: &Settings) -> Result<Box<dyn Llm>> {
    match kind {
        LlmKind::OpenAi => {
            let api_key = settings.openai_api_key.clone().ok_or_else(|| {
                Error::Config("OPENAI_API_KEY is not set".into())
            })?;
            Ok(Box::new(OpenAiLlm::new(model, api_key)))
        }
        LlmKind::Ollama => Ok(Box::new(OllamaLlm::new(model, &settings.ollama_host))),
    }
}

const OPENAI_CHAT_COMPLETIONS_URL: &str =
    "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// The slice of the chat completions response we consume.
#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

/// Chat-completions backend for the OpenAI API.
#[derive(Debug)]
pub struct OpenAiLlm {
    client: reqwest::blocking::Client,
    model: String,
    api_key: String,
}

impl OpenAiLlm {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }
}

impl Llm for OpenAiLlm {
    fn generate(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(OPENAI_CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": prompt }],
            }))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Llm(format!(
                "OpenAI API returned {status}: {}",
                response.text()?
            )));
        }

        let completion: ChatCompletion = response.json()?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::Llm("completion contained no choices".into()))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

/// Completion backend for a local Ollama server.
#[derive(Debug)]
pub struct OllamaLlm {
    client: reqwest::blocking::Client,
    model: String,
    host: String,
}

impl OllamaLlm {
    pub fn new(model: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            model: model.into(),
            host: host.into(),
        }
    }
}

impl Llm for OllamaLlm {
    fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.host.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .json(&json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false,
            }))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Llm(format!(
                "Ollama returned {status}: {}",
                response.text()?
            )));
        }

        let completion: OllamaResponse = response.json()?;
        Ok(completion.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_known_selectors() {
        assert_eq!("openai".parse::<LlmKind>().unwrap(), LlmKind::OpenAi);
        assert_eq!("ollama".parse::<LlmKind>().unwrap(), LlmKind::Ollama);
    }

    #[test]
    fn kind_rejects_unknown_selector() {
        let err = "bard".parse::<LlmKind>().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn openai_requires_api_key() {
        let settings = Settings {
            openai_api_key: None,
            ..Settings::default()
        };
        let err = load_llm(LlmKind::OpenAi, "gpt-4o-mini", &settings).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn ollama_needs_no_credentials() {
        let settings = Settings::default();
        assert!(load_llm(LlmKind::Ollama, "llama3", &settings).is_ok());
    }

    #[test]
    fn chat_completion_deserializes() {
        let raw = r#"{
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "finish_reason": "stop",
                "message": { "role": "assistant", "content": "UNKNOWN" }
            }]
        }"#;
        let completion: ChatCompletion = serde_json::from_str(raw).unwrap();
        assert_eq!(completion.choices[0].message.content, "UNKNOWN");
    }

    #[test]
    fn ollama_response_deserializes() {
        let raw = r#"{ "model": "llama3", "response": "Alice", "done": true }"#;
        let completion: OllamaResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(completion.response, "Alice");
    }
}
