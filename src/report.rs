//! Prose summaries of a result table from a text-generation service.
//!
//! Providers are tried in order until one produces a non-empty answer: a local Ollama
//! instance first, then Ollama Cloud and OpenAI when their keys are configured.

use crate::config::Settings;
use anyhow::{Context, Result, anyhow, bail};
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

const GENERATE_TIMEOUT: Duration = Duration::from_secs(120);

pub const OLLAMA_CLOUD_URL: &str = "https://ollama.com";
pub const OLLAMA_CLOUD_MODEL: &str = "gpt-oss:20b-cloud";
pub const OPENAI_URL: &str = "https://api.openai.com/v1";
pub const OPENAI_MODEL: &str = "gpt-4o-mini";

/// Something that turns a prompt into text.
pub trait TextGenerator {
    fn name(&self) -> &str;
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Generated text and the provider that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub provider: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: String,
    pub message: String,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no data available to summarize")]
    NoData,
    #[error("no text-generation provider configured")]
    NoProviders,
    #[error("all providers failed ({})", join_failures(.0))]
    AllFailed(Vec<ProviderFailure>),
}

fn join_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(ProviderFailure::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Try each provider in order; the first non-empty answer wins.
pub fn generate_with_fallback(
    providers: &[Box<dyn TextGenerator>],
    prompt: &str,
) -> Result<Report, ReportError> {
    if providers.is_empty() {
        return Err(ReportError::NoProviders);
    }
    let mut failures = Vec::new();
    for p in providers {
        let message = match p.generate(prompt) {
            Ok(text) if !text.trim().is_empty() => {
                return Ok(Report {
                    provider: p.name().to_string(),
                    text,
                });
            }
            Ok(_) => "empty response".to_string(),
            Err(e) => format!("{e:#}"),
        };
        log::info!("provider {} failed, trying next: {}", p.name(), message);
        failures.push(ProviderFailure {
            provider: p.name().to_string(),
            message,
        });
    }
    Err(ReportError::AllFailed(failures))
}

/// Providers in fallback order for the given settings.
pub fn providers_from_settings(settings: &Settings) -> Vec<Box<dyn TextGenerator>> {
    let mut out: Vec<Box<dyn TextGenerator>> = vec![Box::new(OllamaLocal::new(
        &settings.ollama_host,
        &settings.ollama_model,
    ))];
    if let Some(key) = &settings.ollama_api_key {
        out.push(Box::new(OllamaCloud::new(OLLAMA_CLOUD_URL, key)));
    }
    if let Some(key) = &settings.openai_api_key {
        out.push(Box::new(OpenAi::new(OPENAI_URL, key)));
    }
    out
}

fn http() -> HttpClient {
    HttpClient::builder()
        .timeout(GENERATE_TIMEOUT)
        .user_agent(concat!("wbi_reporter/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("reqwest client build")
}

fn post_json<T: for<'de> Deserialize<'de>>(
    http: &HttpClient,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
) -> Result<T> {
    let mut req = http.post(url).json(body);
    if let Some(key) = bearer {
        req = req.bearer_auth(key);
    }
    let resp = req.send().with_context(|| format!("POST {url}"))?;
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().unwrap_or_default();
        bail!("HTTP {} from {}: {}", status, url, text.trim());
    }
    resp.json().with_context(|| format!("decode response from {url}"))
}

/// Ollama's `/api/generate` endpoint, usually on localhost.
pub struct OllamaLocal {
    base_url: String,
    model: String,
    http: HttpClient,
}

impl OllamaLocal {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            http: http(),
        }
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl TextGenerator for OllamaLocal {
    fn name(&self) -> &str {
        "ollama-local"
    }

    fn generate(&self, prompt: &str) -> Result<String> {
        let body = json!({"model": self.model, "prompt": prompt, "stream": false});
        let r: GenerateResponse = post_json(
            &self.http,
            &format!("{}/api/generate", self.base_url),
            None,
            &body,
        )?;
        Ok(r.response)
    }
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct OllamaChatResponse {
    message: Option<ChatMessage>,
}

/// Ollama Cloud's `/api/chat` endpoint.
pub struct OllamaCloud {
    base_url: String,
    api_key: String,
    model: String,
    http: HttpClient,
}

impl OllamaCloud {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: OLLAMA_CLOUD_MODEL.to_string(),
            http: http(),
        }
    }
}

impl TextGenerator for OllamaCloud {
    fn name(&self) -> &str {
        "ollama-cloud"
    }

    fn generate(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "stream": false
        });
        let r: OllamaChatResponse = post_json(
            &self.http,
            &format!("{}/api/chat", self.base_url),
            Some(&self.api_key),
            &body,
        )?;
        Ok(r.message.map(|m| m.content).unwrap_or_default())
    }
}

#[derive(Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

/// OpenAI's chat completions endpoint.
pub struct OpenAi {
    base_url: String,
    api_key: String,
    model: String,
    http: HttpClient,
}

impl OpenAi {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: OPENAI_MODEL.to_string(),
            http: http(),
        }
    }
}

impl TextGenerator for OpenAi {
    fn name(&self) -> &str {
        "openai"
    }

    fn generate(&self, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}]
        });
        let r: CompletionResponse = post_json(
            &self.http,
            &format!("{}/chat/completions", self.base_url),
            Some(&self.api_key),
            &body,
        )?;
        r.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow!("response has no choices"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Fixed {
        name: &'static str,
        answer: Option<&'static str>,
        calls: Rc<Cell<usize>>,
    }

    impl TextGenerator for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn generate(&self, _prompt: &str) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            match self.answer {
                Some(a) => Ok(a.to_string()),
                None => bail!("connection refused"),
            }
        }
    }

    fn fixed(name: &'static str, answer: Option<&'static str>, calls: &Rc<Cell<usize>>) -> Box<dyn TextGenerator> {
        Box::new(Fixed {
            name,
            answer,
            calls: Rc::clone(calls),
        })
    }

    #[test]
    fn first_success_wins_and_stops() {
        let calls = Rc::new(Cell::new(0));
        let providers = vec![
            fixed("a", None, &calls),
            fixed("b", Some("  "), &calls),
            fixed("c", Some("summary"), &calls),
            fixed("d", Some("never"), &calls),
        ];
        let r = generate_with_fallback(&providers, "p").unwrap();
        assert_eq!(r.provider, "c");
        assert_eq!(r.text, "summary");
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn all_failures_are_combined() {
        let calls = Rc::new(Cell::new(0));
        let providers = vec![fixed("a", None, &calls), fixed("b", Some(""), &calls)];
        let err = generate_with_fallback(&providers, "p").unwrap_err();
        match &err {
            ReportError::AllFailed(f) => {
                assert_eq!(f.len(), 2);
                assert_eq!(f[1].message, "empty response");
            }
            other => panic!("unexpected {other:?}"),
        }
        let msg = err.to_string();
        assert!(msg.contains("a: connection refused"));
        assert!(msg.contains("b: empty response"));
    }

    #[test]
    fn no_providers_is_an_error() {
        assert!(matches!(
            generate_with_fallback(&[], "p"),
            Err(ReportError::NoProviders)
        ));
    }

    #[test]
    fn provider_order_follows_configured_keys() {
        let names = |s: &Settings| {
            providers_from_settings(s)
                .iter()
                .map(|p| p.name().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(names(&Settings::default()), vec!["ollama-local"]);
        let s = Settings {
            ollama_api_key: Some("o".into()),
            openai_api_key: Some("k".into()),
            ..Default::default()
        };
        assert_eq!(names(&s), vec!["ollama-local", "ollama-cloud", "openai"]);
    }
}
