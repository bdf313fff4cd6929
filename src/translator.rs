use futures_util::stream::{self, StreamExt};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::extract::collapse_whitespace;
use crate::providers::TranslationProvider;
use crate::script::TranslateDirection;

static SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([,.;:!?।])").expect("valid punctuation regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct TranslateSettings {
    pub direction: TranslateDirection,
    /// Requests in flight at once.
    pub concurrency: usize,
    /// `none`, `openai[:model]` or `ollama[:model]`.
    pub provider: String,
}

impl Default for TranslateSettings {
    fn default() -> Self {
        Self {
            direction: TranslateDirection::HiToEn,
            concurrency: 1,
            provider: "none".to_string(),
        }
    }
}

/// Tidies provider output: whitespace collapsed per line and no space left
/// before punctuation or the danda.
pub fn post_process(text: &str) -> String {
    text.lines()
        .map(|line| {
            let collapsed = collapse_whitespace(line);
            SPACE_BEFORE_PUNCT.replace_all(&collapsed, "$1").into_owned()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    /// One entry per input, in input order.
    pub texts: Vec<String>,
    pub requested: usize,
    pub failed: usize,
}

/// One text with the language pair it is translated between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TranslateRequest<'a> {
    pub text: &'a str,
    pub source: &'a str,
    pub target: &'a str,
}

/// Dispatches a batch of texts through a provider with bounded concurrency.
/// Identical requests are sent once; a failed text comes back unchanged.
pub struct BatchTranslator<P> {
    provider: P,
    concurrency: usize,
}

impl<P: TranslationProvider> BatchTranslator<P> {
    pub fn new(provider: P, concurrency: usize) -> Self {
        Self {
            provider,
            concurrency: concurrency.max(1),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Translates every text between the same pair of languages.
    pub async fn translate_all(&self, texts: &[String], source: &str, target: &str) -> BatchOutcome {
        let requests: Vec<TranslateRequest<'_>> = texts
            .iter()
            .map(|text| TranslateRequest {
                text: text.as_str(),
                source,
                target,
            })
            .collect();
        self.translate_requests(&requests).await
    }

    /// Translates each request with its own language pair. The cache is
    /// keyed by `(text, source, target)`.
    pub async fn translate_requests(&self, requests: &[TranslateRequest<'_>]) -> BatchOutcome {
        let mut unique: Vec<TranslateRequest<'_>> = Vec::new();
        let mut slot_of: HashMap<TranslateRequest<'_>, usize> = HashMap::new();
        for request in requests {
            if request.text.trim().is_empty() || slot_of.contains_key(request) {
                continue;
            }
            slot_of.insert(*request, unique.len());
            unique.push(*request);
        }

        let provider = &self.provider;
        let results: Vec<(usize, anyhow::Result<String>)> = stream::iter(unique.iter().enumerate())
            .map(|(slot, request)| async move {
                let translated = provider
                    .translate(request.text.to_string(), request.source, request.target)
                    .await;
                (slot, translated)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut translated: Vec<Option<String>> = vec![None; unique.len()];
        let mut failed = 0;
        for (slot, result) in results {
            match result {
                Ok(text) => translated[slot] = Some(post_process(&text)).filter(|t| !t.is_empty()),
                Err(err) => {
                    failed += 1;
                    warn!(
                        provider = self.provider.name(),
                        from = unique[slot].source,
                        to = unique[slot].target,
                        "translation failed, keeping original text: {:#}", err
                    );
                }
            }
        }
        debug!(
            total = requests.len(),
            requested = unique.len(),
            failed,
            "batch translated"
        );

        let texts = requests
            .iter()
            .map(|request| {
                slot_of
                    .get(request)
                    .and_then(|slot| translated[*slot].clone())
                    .unwrap_or_else(|| request.text.to_string())
            })
            .collect();
        BatchOutcome {
            texts,
            requested: unique.len(),
            failed,
        }
    }
}
