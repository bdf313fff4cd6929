use anyhow::{Result, anyhow};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static DEVANAGARI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x{0900}-\x{097F}]").expect("valid devanagari regex"));
static ASCII_LATIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z]").expect("valid latin regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Script {
    Latin,
    Devanagari,
}

impl Script {
    pub fn detect(text: &str) -> Script {
        if DEVANAGARI.is_match(text) {
            Script::Devanagari
        } else {
            Script::Latin
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Script::Latin => "latin",
            Script::Devanagari => "devanagari",
        }
    }
}

/// Language pair a run translates between. `Auto` is resolved per document
/// by [`choose_langs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TranslateDirection {
    #[default]
    #[serde(rename = "hi->en")]
    HiToEn,
    #[serde(rename = "en->hi")]
    EnToHi,
    #[serde(rename = "auto")]
    Auto,
}

impl TranslateDirection {
    /// `(source, target)` language codes. `Auto` needs a sample first.
    pub fn langs(&self) -> Option<(&'static str, &'static str)> {
        match self {
            TranslateDirection::HiToEn => Some(("hi", "en")),
            TranslateDirection::EnToHi => Some(("en", "hi")),
            TranslateDirection::Auto => None,
        }
    }
}

impl FromStr for TranslateDirection {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hi->en" | "hi-en" => Ok(TranslateDirection::HiToEn),
            "en->hi" | "en-hi" => Ok(TranslateDirection::EnToHi),
            "auto" => Ok(TranslateDirection::Auto),
            other => Err(anyhow!("unknown translation direction: {}", other)),
        }
    }
}

impl fmt::Display for TranslateDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TranslateDirection::HiToEn => "hi->en",
            TranslateDirection::EnToHi => "en->hi",
            TranslateDirection::Auto => "auto",
        };
        f.write_str(label)
    }
}

/// Picks the direction from a text sample: more Devanagari characters than
/// ASCII letters means Hindi source. Ties go to Hindi.
pub fn choose_langs<'a, I>(samples: I) -> TranslateDirection
where
    I: IntoIterator<Item = &'a str>,
{
    let mut devanagari = 0usize;
    let mut latin = 0usize;
    for sample in samples {
        devanagari += DEVANAGARI.find_iter(sample).count();
        latin += ASCII_LATIN.find_iter(sample).count();
    }
    if latin > devanagari {
        TranslateDirection::EnToHi
    } else {
        TranslateDirection::HiToEn
    }
}

/// Concrete `(source, target)` for a run, sampling the texts when `Auto`.
pub fn resolve_direction<'a, I>(direction: TranslateDirection, samples: I) -> (&'static str, &'static str)
where
    I: IntoIterator<Item = &'a str>,
{
    let resolved = match direction {
        TranslateDirection::Auto => choose_langs(samples),
        fixed => fixed,
    };
    resolved.langs().unwrap_or(("hi", "en"))
}
