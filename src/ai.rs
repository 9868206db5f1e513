use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::models::ApplicationRecord;

// --- Provider trait ---

pub trait AIProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    Anthropic,
    OpenAI,
}

#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub provider: ProviderKind,
    pub model_id: String,
    pub short_name: String,
}

fn spec(provider: ProviderKind, model_id: &str, short_name: &str) -> ModelSpec {
    ModelSpec {
        provider,
        model_id: model_id.to_string(),
        short_name: short_name.to_string(),
    }
}

pub fn resolve_model(name: &str) -> Result<ModelSpec> {
    match name {
        // Google Gemini (requires GOOGLE_GENERATIVE_AI_API_KEY)
        "gemini-flash" | "gemini" => Ok(spec(ProviderKind::Gemini, "gemini-2.0-flash-exp", "gemini-flash")),
        "gemini-pro" => Ok(spec(ProviderKind::Gemini, "gemini-1.5-pro", "gemini-pro")),
        // Direct Anthropic API (requires ANTHROPIC_API_KEY)
        "api-sonnet" | "sonnet" => Ok(spec(ProviderKind::Anthropic, "claude-sonnet-4-5-20250929", "api-sonnet")),
        "api-haiku" | "haiku" => Ok(spec(ProviderKind::Anthropic, "claude-haiku-4-5-20251001", "api-haiku")),
        // OpenAI (requires OPENAI_API_KEY)
        "gpt-4o" => Ok(spec(ProviderKind::OpenAI, "gpt-4o", "gpt-4o")),
        "o3" => Ok(spec(ProviderKind::OpenAI, "o3", "o3")),
        _ => Err(anyhow!(
            "Unknown model '{}'. Available: gemini-flash (default), gemini-pro, \
             api-sonnet, api-haiku, gpt-4o, o3",
            name
        )),
    }
}

fn require_key(key: &Option<String>, var: &str) -> Result<String> {
    key.clone().ok_or_else(|| {
        anyhow!(
            "{} environment variable not set. Set it with: export {}=your-key-here",
            var,
            var
        )
    })
}

fn http_client(config: &Config) -> Result<reqwest::blocking::Client> {
    // Generation is slow; give it several fetch timeouts' worth
    reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(config.fetch_timeout_secs.saturating_mul(6)))
        .build()
        .context("Failed to build HTTP client")
}

pub fn create_provider(spec: &ModelSpec, config: &Config) -> Result<Box<dyn AIProvider>> {
    debug!(model = %spec.model_id, "creating AI provider");
    match spec.provider {
        ProviderKind::Gemini => {
            let api_key = require_key(&config.gemini_api_key, "GOOGLE_GENERATIVE_AI_API_KEY")?;
            Ok(Box::new(GeminiProvider::new(api_key, spec.model_id.clone(), http_client(config)?)))
        }
        ProviderKind::Anthropic => {
            let api_key = require_key(&config.anthropic_api_key, "ANTHROPIC_API_KEY")?;
            Ok(Box::new(AnthropicProvider::new(api_key, spec.model_id.clone(), http_client(config)?)))
        }
        ProviderKind::OpenAI => {
            let api_key = require_key(&config.openai_api_key, "OPENAI_API_KEY")?;
            Ok(Box::new(OpenAIProvider::new(api_key, spec.model_id.clone(), http_client(config)?)))
        }
    }
}

fn error_for_status(response: reqwest::blocking::Response, vendor: &str) -> Result<reqwest::blocking::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let error_text = response.text().unwrap_or_default();
    Err(anyhow!(
        "{} API request failed with status {}: {}",
        vendor,
        status,
        error_text
    ))
}

// --- Gemini provider ---

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug)]
pub struct GeminiProvider {
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl GeminiProvider {
    pub fn new(api_key: String, model_id: String, client: reqwest::blocking::Client) -> Self {
        Self { api_key, model_id, client }
    }
}

impl AIProvider for GeminiProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: max_tokens,
            },
        };

        let url = format!("{}/{}:generateContent", GEMINI_API_BASE, self.model_id);
        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .context("Failed to send request to Gemini API")?;

        let api_response: GeminiResponse = error_for_status(response, "Gemini")?
            .json()
            .context("Failed to parse Gemini API response")?;

        api_response
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|part| part.text.clone())
            .ok_or_else(|| anyhow!("No candidates in Gemini API response"))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- Anthropic provider ---

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug)]
pub struct AnthropicProvider {
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: String, model_id: String, client: reqwest::blocking::Client) -> Self {
        Self { api_key, model_id, client }
    }
}

impl AIProvider for AnthropicProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = AnthropicRequest {
            model: self.model_id.clone(),
            max_tokens,
            messages: vec![ChatMessage::user(prompt)],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .context("Failed to send request to Anthropic API")?;

        let api_response: AnthropicResponse = error_for_status(response, "Anthropic")?
            .json()
            .context("Failed to parse Anthropic API response")?;

        api_response
            .content
            .first()
            .map(|block| block.text.clone())
            .ok_or_else(|| anyhow!("No content in Anthropic API response"))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- OpenAI provider ---

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    max_completion_tokens: u32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug)]
pub struct OpenAIProvider {
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl OpenAIProvider {
    pub fn new(api_key: String, model_id: String, client: reqwest::blocking::Client) -> Self {
        Self { api_key, model_id, client }
    }
}

impl AIProvider for OpenAIProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = OpenAIRequest {
            model: self.model_id.clone(),
            max_completion_tokens: max_tokens,
            messages: vec![ChatMessage::user(prompt)],
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .context("Failed to send request to OpenAI API")?;

        let api_response: OpenAIResponse = error_for_status(response, "OpenAI")?
            .json()
            .context("Failed to parse OpenAI API response")?;

        api_response
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow!("No choices in OpenAI API response"))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- Standalone AI functions ---

/// Drops markdown emphasis, which terminals render literally.
pub fn strip_emphasis(text: &str) -> String {
    text.replace('*', "").trim().to_string()
}

pub fn summarize_application(
    provider: &dyn AIProvider,
    record: &ApplicationRecord,
    resume_text: Option<&str>,
) -> Result<String> {
    let mut prompt = format!(
        "Summarize this job application in 3-4 sentences for the applicant's own records. \
        Cover what the role likely involves, what stage the application is in, and one concrete \
        next step. Do not use asterisk characters.\n\n\
        Company: {}\n\
        Role: {}\n\
        Job posting: {}\n\
        Stage: {}\n\
        Applied: {}\n\
        Cover letter sent: {}\n",
        record.company,
        record.role,
        record.job_url,
        record.stage().label(),
        record.date_applied.as_deref().unwrap_or("unknown"),
        if record.did_cover_letter { "yes" } else { "no" },
    );
    if let Some(notes) = record.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        prompt.push_str(&format!("Notes: {}\n", notes));
    }
    if let Some(resume) = resume_text {
        prompt.push_str(&format!("\nResume submitted:\n{}\n", resume));
    }

    provider.complete(&prompt, 1024).map(|s| strip_emphasis(&s))
}

pub fn compare_resumes(provider: &dyn AIProvider, prompt: &str) -> Result<String> {
    provider.complete(prompt, 2048).map(|s| strip_emphasis(&s))
}

pub fn ask(provider: &dyn AIProvider, message: &str) -> Result<String> {
    let prompt = format!(
        "You are a job search assistant. Answer concisely and practically.\n\n{}",
        message
    );
    provider.complete(&prompt, 2048)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_record;
    use std::cell::RefCell;

    struct CannedProvider {
        reply: String,
        last_prompt: RefCell<String>,
    }

    impl CannedProvider {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                last_prompt: RefCell::new(String::new()),
            }
        }
    }

    impl AIProvider for CannedProvider {
        fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String> {
            *self.last_prompt.borrow_mut() = prompt.to_string();
            Ok(self.reply.clone())
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    fn config_with(keys: &[(&str, &str)]) -> Config {
        let keys: std::collections::HashMap<String, String> = keys
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| keys.get(k).cloned()).unwrap()
    }

    #[test]
    fn test_resolve_model_gemini() {
        let spec = resolve_model("gemini-flash").unwrap();
        assert_eq!(spec.model_id, "gemini-2.0-flash-exp");
        assert_eq!(spec.provider, ProviderKind::Gemini);

        let spec = resolve_model("gemini").unwrap();
        assert_eq!(spec.short_name, "gemini-flash");

        let spec = resolve_model("gemini-pro").unwrap();
        assert_eq!(spec.provider, ProviderKind::Gemini);
    }

    #[test]
    fn test_resolve_model_anthropic_api() {
        let spec = resolve_model("api-sonnet").unwrap();
        assert_eq!(spec.model_id, "claude-sonnet-4-5-20250929");
        assert_eq!(spec.provider, ProviderKind::Anthropic);

        let spec = resolve_model("haiku").unwrap();
        assert_eq!(spec.short_name, "api-haiku");
    }

    #[test]
    fn test_resolve_model_openai() {
        let spec = resolve_model("gpt-4o").unwrap();
        assert_eq!(spec.model_id, "gpt-4o");
        assert_eq!(spec.provider, ProviderKind::OpenAI);

        let spec = resolve_model("o3").unwrap();
        assert_eq!(spec.provider, ProviderKind::OpenAI);
    }

    #[test]
    fn test_resolve_model_unknown() {
        let result = resolve_model("gpt-3");
        assert!(result.is_err());
    }

    #[test]
    fn test_provider_requires_api_key() {
        let config = config_with(&[]);
        let result = create_provider(&resolve_model("gemini-flash").unwrap(), &config);
        assert!(result.is_err());
        let err_msg = result.err().unwrap().to_string();
        assert!(err_msg.contains("GOOGLE_GENERATIVE_AI_API_KEY"));

        let result = create_provider(&resolve_model("gpt-4o").unwrap(), &config);
        assert!(result.err().unwrap().to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_provider_with_api_key() {
        let config = config_with(&[("ANTHROPIC_API_KEY", "test-key")]);
        let provider = create_provider(&resolve_model("api-sonnet").unwrap(), &config).unwrap();
        assert_eq!(provider.model_name(), "claude-sonnet-4-5-20250929");
    }

    #[test]
    fn test_compare_resumes_strips_asterisks() {
        let provider = CannedProvider::new("**Changes**: you added *Rust*.\n");
        let reply = compare_resumes(&provider, "prompt").unwrap();
        assert_eq!(reply, "Changes: you added Rust.");
    }

    #[test]
    fn test_summarize_application_prompt() {
        let provider = CannedProvider::new("Summary");
        let mut record = sample_record("a1", "Data Engineer", "Initech", "https://initech.com/jobs/4", "2025-10-02");
        record.notes = Some("Referred by Sam".to_string());

        let reply = summarize_application(&provider, &record, Some("Resume body")).unwrap();
        assert_eq!(reply, "Summary");

        let prompt = provider.last_prompt.borrow();
        assert!(prompt.contains("Company: Initech"));
        assert!(prompt.contains("Stage: applied"));
        assert!(prompt.contains("Notes: Referred by Sam"));
        assert!(prompt.contains("Resume submitted:\nResume body"));
    }
}
