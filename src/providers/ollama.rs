use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::json;

use super::retry::{RetryPolicy, is_rate_limited, retry_after};
use super::{TranslateFuture, TranslationProvider, language_name};

const DEFAULT_HOST: &str = "http://localhost:11434";
pub(crate) const DEFAULT_MODEL: &str = "llama3";

/// A local Ollama server's non-streaming generate endpoint.
#[derive(Debug, Clone)]
pub struct Ollama {
    host: String,
    model: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl Ollama {
    pub fn new() -> Self {
        let host = std::env::var("OLLAMA_HOST")
            .ok()
            .map(|host| host.trim().trim_end_matches('/').to_string())
            .filter(|host| !host.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        Self {
            host,
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

impl Default for Ollama {
    fn default() -> Self {
        Self::new()
    }
}

impl TranslationProvider for Ollama {
    fn name(&self) -> &str {
        "ollama"
    }

    fn translate(&self, text: String, source: &str, target: &str) -> TranslateFuture {
        let provider = self.clone();
        let prompt = format!(
            "Translate this text from {} to {}. Output ONLY the translation without any introduction or notes:\n\n{}",
            language_name(source),
            language_name(target),
            text
        );
        Box::pin(async move { call_generate(provider, prompt).await })
    }
}

async fn call_generate(provider: Ollama, prompt: String) -> Result<String> {
    let url = format!("{}/api/generate", provider.host);
    let body = json!({
        "model": provider.model,
        "prompt": prompt,
        "stream": false
    });

    let mut attempt = 0usize;
    let mut delay = provider.retry.base_delay;
    loop {
        attempt += 1;
        let response = provider
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("failed to reach Ollama at {}", provider.host))?;
        let status = response.status();
        let retry_after = retry_after(response.headers());
        let text = response.text().await.unwrap_or_default();
        if status.is_success() {
            return extract_generation(&text);
        }
        if is_rate_limited(status, &text) && attempt < provider.retry.max_attempts {
            delay = provider
                .retry
                .wait("Ollama", attempt, delay, retry_after)
                .await;
            continue;
        }
        return Err(anyhow!("Ollama API error ({}): {}", status, text.trim()));
    }
}

fn extract_generation(text: &str) -> Result<String> {
    #[derive(Deserialize)]
    struct GenerateResponse {
        response: Option<String>,
    }

    let payload: GenerateResponse =
        serde_json::from_str(text).with_context(|| "failed to parse Ollama response JSON")?;
    payload
        .response
        .map(|response| response.trim().to_string())
        .filter(|response| !response.is_empty())
        .ok_or_else(|| anyhow!("empty response from Ollama"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_trimmed_and_empty_rejected() {
        assert_eq!(
            extract_generation(r#"{"model":"llama3","response":" नमस्ते ","done":true}"#).unwrap(),
            "नमस्ते"
        );
        assert!(extract_generation(r#"{"response":""}"#).is_err());
        assert!(extract_generation("oops").is_err());
    }
}
