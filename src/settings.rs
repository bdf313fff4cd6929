use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::erase::{EraseMode, EraseSettings};
use crate::fit::FitSettings;
use crate::fonts::{FontSettings, FontVariant, ManifestEntry};
use crate::ocr_pass::OcrSettings;
use crate::script::{Script, TranslateDirection};
use crate::style::MatchSettings;
use crate::table::TableSettings;
use crate::translator::TranslateSettings;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");
const HOME_DIR_NAME: &str = ".pdf-translate-rust";
pub const DEFAULT_LAYOUT_DPI: u32 = 150;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub fit: FitSettings,
    pub table: TableSettings,
    pub matching: MatchSettings,
    pub fonts: FontSettings,
    pub erase: EraseSettings,
    pub translate: TranslateSettings,
    pub layout_dpi: u32,
    pub ocr: OcrSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fit: FitSettings::default(),
            table: TableSettings::default(),
            matching: MatchSettings::default(),
            fonts: FontSettings::default(),
            erase: EraseSettings::default(),
            translate: TranslateSettings::default(),
            layout_dpi: DEFAULT_LAYOUT_DPI,
            ocr: OcrSettings::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    fit: Option<FitSection>,
    table: Option<TableSection>,
    #[serde(rename = "match")]
    matching: Option<MatchSection>,
    fonts: Option<FontsSection>,
    erase: Option<EraseSection>,
    translate: Option<TranslateSection>,
    layout: Option<LayoutSection>,
    ocr: Option<OcrSection>,
}

#[derive(Debug, Default, Deserialize)]
struct FitSection {
    pad_min: Option<f32>,
    pad_ratio: Option<f32>,
    size_boost: Option<f32>,
    width_safety: Option<f32>,
    min_width_size: Option<f32>,
    shrink_factor: Option<f32>,
    max_attempts: Option<usize>,
    hard_floor: Option<f32>,
    readable_floor: Option<f32>,
    line_height: Option<f32>,
    expansion_lines: Option<f32>,
    expansion_leading: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct TableSection {
    segment_gap_min: Option<f32>,
    segment_gap_ratio: Option<f32>,
    multi_segment_line_ratio: Option<f32>,
    multi_segment_min_lines: Option<usize>,
    band_merge_tolerance: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct MatchSection {
    span_iou_high: Option<f32>,
    span_iou_low: Option<f32>,
    line_iou: Option<f32>,
    block_iou: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct FontsSection {
    latin_regular: Option<String>,
    latin_bold: Option<String>,
    latin_italic: Option<String>,
    latin_bold_italic: Option<String>,
    devanagari_regular: Option<String>,
    devanagari_bold: Option<String>,
    devanagari_italic: Option<String>,
    devanagari_bold_italic: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct EraseSection {
    mode: Option<EraseMode>,
    pad_min: Option<f32>,
    pad_ratio: Option<f32>,
    luminance_threshold: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct TranslateSection {
    direction: Option<TranslateDirection>,
    concurrency: Option<usize>,
    provider: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LayoutSection {
    dpi: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct OcrSection {
    languages: Option<String>,
    dpi: Option<u32>,
    optimize: Option<u8>,
}

/// Loads the embedded defaults, then every settings file that exists, in
/// increasing precedence. An explicit `extra_path` must exist.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    load_settings_with_home(home_dir().as_deref(), extra_path)
}

pub fn load_settings_with_home(home: Option<&Path>, extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    let defaults: SettingsFile =
        toml::from_str(DEFAULT_SETTINGS_TOML).with_context(|| "failed to parse default settings")?;
    settings.merge(defaults);

    if let Some(home) = home {
        ensure_home_settings_file(home)?;
    }

    let mut ordered_paths = vec![
        PathBuf::from("settings.toml"),
        PathBuf::from("settings.local.toml"),
    ];
    if let Some(home) = home {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }
    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

fn set_positive(target: &mut f32, value: Option<f32>) {
    if let Some(value) = value.filter(|value| *value > 0.0) {
        *target = value;
    }
}

fn set_count(target: &mut usize, value: Option<usize>) {
    if let Some(value) = value.filter(|value| *value > 0) {
        *target = value;
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(fit) = incoming.fit {
            let target = &mut self.fit;
            set_positive(&mut target.pad_min, fit.pad_min);
            set_positive(&mut target.pad_ratio, fit.pad_ratio);
            set_positive(&mut target.size_boost, fit.size_boost);
            set_positive(&mut target.width_safety, fit.width_safety);
            set_positive(&mut target.min_width_size, fit.min_width_size);
            set_positive(&mut target.shrink_factor, fit.shrink_factor);
            set_count(&mut target.max_attempts, fit.max_attempts);
            set_positive(&mut target.hard_floor, fit.hard_floor);
            set_positive(&mut target.readable_floor, fit.readable_floor);
            set_positive(&mut target.line_height, fit.line_height);
            set_positive(&mut target.expansion_lines, fit.expansion_lines);
            set_positive(&mut target.expansion_leading, fit.expansion_leading);
        }
        if let Some(table) = incoming.table {
            let target = &mut self.table;
            set_positive(&mut target.segment_gap_min, table.segment_gap_min);
            set_positive(&mut target.segment_gap_ratio, table.segment_gap_ratio);
            set_positive(&mut target.multi_segment_line_ratio, table.multi_segment_line_ratio);
            set_count(&mut target.multi_segment_min_lines, table.multi_segment_min_lines);
            set_positive(&mut target.band_merge_tolerance, table.band_merge_tolerance);
        }
        if let Some(matching) = incoming.matching {
            let target = &mut self.matching;
            set_positive(&mut target.span_iou_high, matching.span_iou_high);
            set_positive(&mut target.span_iou_low, matching.span_iou_low);
            set_positive(&mut target.line_iou, matching.line_iou);
            set_positive(&mut target.block_iou, matching.block_iou);
        }
        if let Some(fonts) = incoming.fonts {
            self.merge_fonts(fonts);
        }
        if let Some(erase) = incoming.erase {
            let target = &mut self.erase;
            if let Some(mode) = erase.mode {
                target.mode = mode;
            }
            set_positive(&mut target.pad_min, erase.pad_min);
            set_positive(&mut target.pad_ratio, erase.pad_ratio);
            set_positive(&mut target.luminance_threshold, erase.luminance_threshold);
        }
        if let Some(translate) = incoming.translate {
            if let Some(direction) = translate.direction {
                self.translate.direction = direction;
            }
            set_count(&mut self.translate.concurrency, translate.concurrency);
            if let Some(provider) = non_blank(translate.provider) {
                self.translate.provider = provider;
            }
        }
        if let Some(dpi) = incoming.layout.and_then(|layout| layout.dpi)
            && dpi > 0
        {
            self.layout_dpi = dpi;
        }
        if let Some(ocr) = incoming.ocr {
            if let Some(languages) = non_blank(ocr.languages) {
                self.ocr.languages = languages;
            }
            if let Some(dpi) = ocr.dpi.filter(|dpi| *dpi > 0) {
                self.ocr.dpi = dpi;
            }
            if let Some(optimize) = ocr.optimize {
                self.ocr.optimize = optimize;
            }
        }
    }

    fn merge_fonts(&mut self, fonts: FontsSection) {
        if let Some(path) = non_blank(fonts.latin_regular) {
            self.fonts.latin_regular = Some(PathBuf::from(path));
        }
        if let Some(path) = non_blank(fonts.devanagari_regular) {
            self.fonts.devanagari_regular = Some(PathBuf::from(path));
        }
        let entries = [
            (Script::Latin, FontVariant::Bold, fonts.latin_bold),
            (Script::Latin, FontVariant::Italic, fonts.latin_italic),
            (Script::Latin, FontVariant::BoldItalic, fonts.latin_bold_italic),
            (Script::Devanagari, FontVariant::Bold, fonts.devanagari_bold),
            (Script::Devanagari, FontVariant::Italic, fonts.devanagari_italic),
            (
                Script::Devanagari,
                FontVariant::BoldItalic,
                fonts.devanagari_bold_italic,
            ),
        ];
        for (script, variant, path) in entries {
            let Some(path) = non_blank(path) else {
                continue;
            };
            self.fonts
                .manifest
                .retain(|entry| !(entry.script == script && entry.variant == variant));
            self.fonts.manifest.push(ManifestEntry {
                script,
                variant,
                path: PathBuf::from(path),
            });
        }
    }
}

fn ensure_home_settings_file(home: &Path) -> Result<()> {
    fs::create_dir_all(home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(HOME_DIR_NAME))
        }
    })
}
