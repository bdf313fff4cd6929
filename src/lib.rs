use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use tracing::info;

pub mod analyzer;
pub mod erase;
pub mod extract;
pub mod fit;
pub mod fonts;
pub mod geometry;
pub mod logging;
pub mod model;
pub mod ocr_pass;
pub mod pipeline;
pub mod providers;
pub mod render;
pub mod script;
pub mod settings;
pub mod source;
pub mod style;
pub mod table;
pub mod translator;

pub use analyzer::{LayoutAnalyzer, PrecomputedRegions};
pub use pipeline::{OverlaySet, Pipeline, RunInputs, RunMode, RunSummary};
pub use providers::{ProviderKind, TranslationProvider};
pub use render::{RecordingRenderer, RenderPlan, Renderer};
pub use source::{ContentSource, JsonDocument};
pub use style::StyleIndex;
pub use translator::BatchTranslator;

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Text-layer document to translate.
    pub input: PathBuf,
    /// Pre-OCR document the styles are taken from. Defaults to `input`.
    pub original: Option<PathBuf>,
    pub mode: String,
    pub output: Option<PathBuf>,
    pub provider: Option<String>,
    pub key: Option<String>,
    pub direction: Option<String>,
    pub concurrency: Option<usize>,
    /// Pre-computed layout regions; switches hybrid mode to region clipping.
    pub ai_layout: Option<PathBuf>,
    pub overlay_items: Option<PathBuf>,
    pub preview: Option<PathBuf>,
    /// Scanned PDF to run through the OCR pre-pass. Only the resulting path is
    /// reported; `input` is what gets translated.
    pub ocr: Option<PathBuf>,
    pub settings_path: Option<PathBuf>,
}

pub async fn run(config: Config) -> Result<String> {
    let mut settings = settings::load_settings(config.settings_path.as_deref())?;
    if let Some(direction) = config.direction.as_deref() {
        settings.translate.direction = direction.parse()?;
    }
    if let Some(concurrency) = config.concurrency.filter(|n| *n > 0) {
        settings.translate.concurrency = concurrency;
    }
    let mode: RunMode = config.mode.parse()?;
    let output = config
        .output
        .clone()
        .unwrap_or_else(|| default_output(&config.input));
    let mut report = Vec::new();

    if let Some(scan) = config.ocr.as_deref() {
        let out_dir = output
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let ocr_path = ocr_pass::run_ocr_pass(&settings.ocr, scan, out_dir);
        report.push(format!("ocr: {}", ocr_path.display()));
    }

    let provider_arg = config
        .provider
        .clone()
        .unwrap_or_else(|| settings.translate.provider.clone());
    let selection = providers::resolve_provider_selection(Some(&provider_arg))?;
    let provider = providers::build_provider(&selection, config.key.as_deref())
        .with_context(|| format!("failed to set up provider '{}'", provider_arg))?;
    info!(provider = provider.name(), direction = %settings.translate.direction, "provider ready");

    let document = JsonDocument::load(&config.input)?;
    let original = match config.original.as_deref() {
        Some(path) => JsonDocument::load(path)?,
        None => document.clone(),
    };
    let styles = StyleIndex::from_source(&original);
    info!(records = styles.record_count(), pages = document.page_count(), "style index built");

    let fonts = fonts::FontResolver::new(&settings.fonts);
    let translator = BatchTranslator::new(provider, settings.translate.concurrency);
    let analyzer = config
        .ai_layout
        .as_deref()
        .map(PrecomputedRegions::load)
        .transpose()?;
    let overlay = config
        .overlay_items
        .as_deref()
        .map(OverlaySet::load)
        .transpose()?;
    let inputs = RunInputs {
        analyzer: analyzer.as_ref().map(|a| a as &dyn LayoutAnalyzer),
        overlay: overlay.as_ref(),
    };
    let pipeline = Pipeline::new(&settings, &styles, &fonts, &translator);

    if mode == RunMode::All {
        let outcome = pipeline.run_all(&document, inputs, &output).await?;
        if outcome.outputs.is_empty() {
            return Err(anyhow!("every sub-run failed"));
        }
        for out in &outcome.outputs {
            report.push(out.summary.to_string());
            if let Some(dir) = config.preview.as_deref() {
                render::write_previews(
                    &out.plan,
                    &document,
                    &dir.join(out.summary.mode.as_str()),
                    settings.layout_dpi,
                    &fonts.font_files(),
                )?;
            }
        }
        report.push(format!("bundle: {}", outcome.bundle.display()));
        return Ok(report.join("\n"));
    }

    let mut renderer = RecordingRenderer::new();
    let summary = pipeline
        .run_mode(mode, &document, &mut renderer, inputs)
        .await?;
    let plan = renderer.into_plan(&document);
    pipeline::write_plan(&plan, &output)?;
    if let Some(dir) = config.preview.as_deref() {
        render::write_previews(&plan, &document, dir, settings.layout_dpi, &fonts.font_files())?;
    }
    report.push(summary.to_string());
    report.push(format!("output: {}", output.display()));
    Ok(report.join("\n"))
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    input.with_file_name(format!("{}_translated.json", stem))
}
