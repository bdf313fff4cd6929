use anyhow::{Result, anyhow};
use std::future::Future;
use std::pin::Pin;

mod ollama;
mod openai;
mod retry;

pub use ollama::Ollama;
pub use openai::OpenAI;

pub type TranslateFuture = Pin<Box<dyn Future<Output = Result<String>> + Send>>;

/// A translation service. Implementations must be cheap to call
/// concurrently; each call owns everything it needs.
pub trait TranslationProvider: Send + Sync {
    fn name(&self) -> &str;
    fn translate(&self, text: String, source: &str, target: &str) -> TranslateFuture;
}

/// Returns its input unchanged. Used when no service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl TranslationProvider for Passthrough {
    fn name(&self) -> &str {
        "none"
    }

    fn translate(&self, text: String, _source: &str, _target: &str) -> TranslateFuture {
        Box::pin(async move { Ok(text) })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Passthrough,
    OpenAI,
    Ollama,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Passthrough => "none",
            ProviderKind::OpenAI => "openai",
            ProviderKind::Ollama => "ollama",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSelection {
    pub provider: ProviderKind,
    pub requested_model: Option<String>,
}

#[derive(Debug, Clone)]
pub enum ProviderImpl {
    Passthrough(Passthrough),
    OpenAI(OpenAI),
    Ollama(Ollama),
}

impl TranslationProvider for ProviderImpl {
    fn name(&self) -> &str {
        match self {
            ProviderImpl::Passthrough(provider) => provider.name(),
            ProviderImpl::OpenAI(provider) => provider.name(),
            ProviderImpl::Ollama(provider) => provider.name(),
        }
    }

    fn translate(&self, text: String, source: &str, target: &str) -> TranslateFuture {
        match self {
            ProviderImpl::Passthrough(provider) => provider.translate(text, source, target),
            ProviderImpl::OpenAI(provider) => provider.translate(text, source, target),
            ProviderImpl::Ollama(provider) => provider.translate(text, source, target),
        }
    }
}

pub fn build_provider(selection: &ProviderSelection, key: Option<&str>) -> Result<ProviderImpl> {
    let model = selection.requested_model.clone().unwrap_or_default();
    match selection.provider {
        ProviderKind::Passthrough => Ok(ProviderImpl::Passthrough(Passthrough)),
        ProviderKind::OpenAI => {
            let key = key
                .map(str::to_string)
                .or_else(|| get_env("OPENAI_API_KEY"))
                .ok_or_else(|| anyhow!("OPENAI_API_KEY is not set"))?;
            Ok(ProviderImpl::OpenAI(OpenAI::new(key).with_model(model)))
        }
        ProviderKind::Ollama => Ok(ProviderImpl::Ollama(Ollama::new().with_model(model))),
    }
}

/// Parses `none`, `openai`, `openai:<model>`, `ollama` or `ollama:<model>`.
pub fn resolve_provider_selection(arg: Option<&str>) -> Result<ProviderSelection> {
    let raw = arg.map(str::trim).unwrap_or("none");
    if raw.is_empty() {
        return Ok(ProviderSelection {
            provider: ProviderKind::Passthrough,
            requested_model: None,
        });
    }
    let (name, model) = match raw.split_once(':') {
        Some((name, model)) => (name, Some(model.trim()).filter(|m| !m.is_empty())),
        None => (raw, None),
    };
    let provider = provider_from_name(&name.to_lowercase()).ok_or_else(|| {
        anyhow!(
            "unknown provider '{}'. Use none, openai[:model] or ollama[:model]",
            raw
        )
    })?;
    Ok(ProviderSelection {
        provider,
        requested_model: model.map(str::to_string),
    })
}

fn provider_from_name(name: &str) -> Option<ProviderKind> {
    match name {
        "none" | "passthrough" | "off" => Some(ProviderKind::Passthrough),
        "openai" => Some(ProviderKind::OpenAI),
        "ollama" => Some(ProviderKind::Ollama),
        _ => None,
    }
}

/// English name for a language code, for prompts.
pub(crate) fn language_name(code: &str) -> &str {
    match code {
        "hi" => "Hindi",
        "en" => "English",
        other => other,
    }
}

fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_and_model() {
        let selection = resolve_provider_selection(Some("ollama:mistral")).unwrap();
        assert_eq!(selection.provider, ProviderKind::Ollama);
        assert_eq!(selection.requested_model.as_deref(), Some("mistral"));

        let selection = resolve_provider_selection(Some("OpenAI:")).unwrap();
        assert_eq!(selection.provider, ProviderKind::OpenAI);
        assert_eq!(selection.requested_model, None);

        assert_eq!(
            resolve_provider_selection(None).unwrap().provider,
            ProviderKind::Passthrough
        );
        assert!(resolve_provider_selection(Some("deepl")).is_err());
    }

    #[test]
    fn explicit_key_builds_openai() {
        let selection = ProviderSelection {
            provider: ProviderKind::OpenAI,
            requested_model: Some("gpt-4o".to_string()),
        };
        let provider = build_provider(&selection, Some("sk-test")).unwrap();
        match provider {
            ProviderImpl::OpenAI(openai) => assert_eq!(openai.model(), "gpt-4o"),
            other => panic!("unexpected provider {:?}", other),
        }
    }

    #[tokio::test]
    async fn passthrough_returns_input() {
        let out = Passthrough.translate("same".to_string(), "hi", "en").await.unwrap();
        assert_eq!(out, "same");
    }
}
