use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::json;

use super::retry::{RetryPolicy, is_rate_limited, retry_after};
use super::{TranslateFuture, TranslationProvider, language_name};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub(crate) const DEFAULT_MODEL: &str = "gpt-4o-mini";
const SYSTEM_PROMPT: &str =
    "You are a professional translator. Translate the user input accurately.";

#[derive(Debug, Clone)]
pub struct OpenAI {
    key: String,
    model: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl OpenAI {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            model: DEFAULT_MODEL.to_string(),
            client: reqwest::Client::new(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl TranslationProvider for OpenAI {
    fn name(&self) -> &str {
        "openai"
    }

    fn translate(&self, text: String, source: &str, target: &str) -> TranslateFuture {
        let provider = self.clone();
        let prompt = format!(
            "Translate the following text from {} to {}. Return only the translated text, preserving original formatting and whitespace as much as possible:\n\n{}",
            language_name(source),
            language_name(target),
            text
        );
        Box::pin(async move { call_chat_completions(provider, prompt).await })
    }
}

fn base_url() -> String {
    std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string())
}

async fn call_chat_completions(provider: OpenAI, prompt: String) -> Result<String> {
    let url = format!("{}/chat/completions", base_url());
    let body = json!({
        "model": provider.model,
        "messages": [
            {"role": "system", "content": SYSTEM_PROMPT},
            {"role": "user", "content": prompt}
        ],
        "temperature": 0.3
    });

    let mut attempt = 0usize;
    let mut delay = provider.retry.base_delay;
    loop {
        attempt += 1;
        let response = provider
            .client
            .post(&url)
            .bearer_auth(&provider.key)
            .json(&body)
            .send()
            .await
            .with_context(|| "failed to reach OpenAI")?;

        let status = response.status();
        let retry_after = retry_after(response.headers());
        let text = response.text().await.unwrap_or_default();
        if status.is_success() {
            return extract_completion(&text);
        }
        if is_rate_limited(status, &text) && attempt < provider.retry.max_attempts {
            delay = provider
                .retry
                .wait("OpenAI", attempt, delay, retry_after)
                .await;
            continue;
        }
        return Err(anyhow!(
            "OpenAI API error ({}): {}",
            status,
            extract_openai_error(&text).unwrap_or(text)
        ));
    }
}

fn extract_completion(text: &str) -> Result<String> {
    let payload: ChatResponse =
        serde_json::from_str(text).with_context(|| "failed to parse OpenAI response JSON")?;
    payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .ok_or_else(|| anyhow!("no completion returned from OpenAI"))
}

fn extract_openai_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<ErrorDetail>,
    }

    #[derive(Deserialize)]
    struct ErrorDetail {
        message: Option<String>,
        code: Option<String>,
    }

    let detail = serde_json::from_str::<ErrorBody>(body).ok()?.error?;
    let mut parts = Vec::new();
    if let Some(message) = detail.message.filter(|m| !m.trim().is_empty()) {
        parts.push(message);
    }
    if let Some(code) = detail.code.filter(|c| !c.trim().is_empty()) {
        parts.push(format!("code: {}", code));
    }
    (!parts.is_empty()).then(|| parts.join(" | "))
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_content_is_trimmed() {
        let body = r#"{"model":"gpt-4o-mini","choices":[{"message":{"role":"assistant","content":"  Total amount \n"}}]}"#;
        assert_eq!(extract_completion(body).unwrap(), "Total amount");
        assert!(extract_completion(r#"{"choices":[]}"#).is_err());
    }

    #[test]
    fn error_body_is_summarized() {
        let body = r#"{"error":{"message":"Invalid API key","code":"invalid_api_key"}}"#;
        assert_eq!(
            extract_openai_error(body).as_deref(),
            Some("Invalid API key | code: invalid_api_key")
        );
        assert_eq!(extract_openai_error("not json"), None);
    }
}
