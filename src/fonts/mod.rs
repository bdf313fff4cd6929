//! Script- and weight-aware font selection.

mod metrics;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::model::{DEFAULT_FONT_NAME, TextFlags};
use crate::script::Script;

pub use metrics::{FontMetrics, load_font_metrics, measure_text_width};

/// Short names every renderer knows without a font file.
pub const BASE14_FONTS: [&str; 5] = ["helv", "times", "cour", "symbol", "zapfdingbats"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontVariant {
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl FontVariant {
    pub fn from_flags(flags: TextFlags) -> Self {
        match (
            flags.contains(TextFlags::BOLD),
            flags.contains(TextFlags::ITALIC),
        ) {
            (true, true) => FontVariant::BoldItalic,
            (true, false) => FontVariant::Bold,
            (false, true) => FontVariant::Italic,
            (false, false) => FontVariant::Regular,
        }
    }

    fn suffixes(&self) -> &'static [&'static str] {
        match self {
            FontVariant::Regular => &[],
            FontVariant::Bold => &["-Bold", "Bold"],
            FontVariant::Italic => &["-Italic", "Italic"],
            FontVariant::BoldItalic => &["-BoldItalic", "BoldItalic"],
        }
    }
}

/// Per-script font files. The regular file seeds discovery; explicit
/// entries take precedence over discovered siblings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FontSettings {
    pub latin_regular: Option<PathBuf>,
    pub devanagari_regular: Option<PathBuf>,
    pub manifest: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub script: Script,
    pub variant: FontVariant,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFont {
    /// Logical name: the file stem, or a base-14 short name.
    pub name: String,
    pub path: Option<PathBuf>,
    pub script: Script,
    pub variant: FontVariant,
    pub serif: bool,
}

impl ResolvedFont {
    pub fn base14(name: &str, script: Script) -> Self {
        Self {
            name: name.to_string(),
            path: None,
            script,
            variant: FontVariant::Regular,
            serif: name == "times",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FontResolver {
    registry: HashMap<(Script, FontVariant), PathBuf>,
}

impl FontResolver {
    pub fn new(settings: &FontSettings) -> Self {
        let mut resolver = Self::default();
        for (script, regular) in [
            (Script::Latin, settings.latin_regular.as_deref()),
            (Script::Devanagari, settings.devanagari_regular.as_deref()),
        ] {
            let Some(regular) = regular else {
                continue;
            };
            if !regular.is_file() {
                warn!(
                    script = script.as_str(),
                    path = %regular.display(),
                    "regular font file missing, falling back to {}",
                    DEFAULT_FONT_NAME
                );
                continue;
            }
            resolver
                .registry
                .insert((script, FontVariant::Regular), regular.to_path_buf());
            for (variant, path) in discover_variants(regular) {
                debug!(script = script.as_str(), ?variant, path = %path.display(), "font variant discovered");
                resolver.registry.insert((script, variant), path);
            }
        }
        for entry in &settings.manifest {
            if entry.path.is_file() {
                resolver
                    .registry
                    .insert((entry.script, entry.variant), entry.path.clone());
            } else {
                warn!(path = %entry.path.display(), "font manifest entry not found");
            }
        }
        resolver
    }

    pub fn variant_path(&self, script: Script, variant: FontVariant) -> Option<&Path> {
        self.registry
            .get(&(script, variant))
            .or_else(|| self.registry.get(&(script, FontVariant::Regular)))
            .map(PathBuf::as_path)
    }

    /// Every registered font file, for loading into a rasterizer.
    pub fn font_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.registry.values().cloned().collect();
        files.sort();
        files.dedup();
        files
    }

    /// Font for drawing `text` in place of a run styled with `flags` and
    /// originally set in `source_font`.
    pub fn resolve(&self, text: &str, flags: TextFlags, source_font: &str) -> ResolvedFont {
        let script = Script::detect(text);
        let variant = FontVariant::from_flags(flags);
        let serif = flags.contains(TextFlags::SERIF) || source_font.contains("Times");
        match self.variant_path(script, variant) {
            Some(path) => ResolvedFont {
                name: path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| DEFAULT_FONT_NAME.to_string()),
                path: Some(path.to_path_buf()),
                script,
                variant: if self.registry.contains_key(&(script, variant)) {
                    variant
                } else {
                    FontVariant::Regular
                },
                serif,
            },
            None if is_base14(source_font) => ResolvedFont {
                serif,
                ..ResolvedFont::base14(source_font, script)
            },
            None => ResolvedFont {
                serif,
                ..ResolvedFont::base14(DEFAULT_FONT_NAME, script)
            },
        }
    }
}

pub fn is_base14(name: &str) -> bool {
    BASE14_FONTS.contains(&name)
}

/// Sibling files named like `<prefix>-Bold.<ext>` next to a regular face.
fn discover_variants(regular: &Path) -> Vec<(FontVariant, PathBuf)> {
    let Some(stem) = regular.file_stem().map(|stem| stem.to_string_lossy()) else {
        return Vec::new();
    };
    let prefix = stem.replace("-Regular", "").replace("Regular", "");
    let extension = regular
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    let dir = regular.parent().unwrap_or_else(|| Path::new(""));

    let mut found = Vec::new();
    for variant in [
        FontVariant::Bold,
        FontVariant::Italic,
        FontVariant::BoldItalic,
    ] {
        let hit = variant
            .suffixes()
            .iter()
            .map(|suffix| dir.join(format!("{}{}{}", prefix, suffix, extension)))
            .find(|candidate| candidate.is_file());
        if let Some(path) = hit {
            found.push((variant, path));
        }
    }
    found
}
