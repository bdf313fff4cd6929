//! Run modes: erase the original text, translate, then fit the replacement
//! back into the same footprint.

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn};

mod bundle;
mod overlay;

pub use bundle::{bundle_path, labeled_output, write_bundle};
pub use overlay::{OverlayItem, OverlaySet, OverlayTransform};

use crate::analyzer::LayoutAnalyzer;
use crate::erase::{
    self, apply_all_redactions, dominant_fill_for_rect, erase_rect, pick_fill,
};
use crate::extract::{self, Granularity};
use crate::fit::{FitRequest, TextFitter};
use crate::fonts::FontResolver;
use crate::geometry::{Rect, intersection};
use crate::model::{Color, DEFAULT_FONT_NAME, DEFAULT_FONT_SIZE, Span, TextFlags, TextStyle};
use crate::providers::TranslationProvider;
use crate::render::{RecordingRenderer, RenderPlan, Renderer};
use crate::script::resolve_direction;
use crate::settings::Settings;
use crate::source::ContentSource;
use crate::style::{StyleIndex, aggregate_styles, median, transfer_span_styles};
use crate::table::{build_columns, is_table_like, place_segment};
use crate::translator::{BatchTranslator, TranslateRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Span,
    Line,
    Block,
    Hybrid,
    Overlay,
    All,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Span => "span",
            RunMode::Line => "line",
            RunMode::Block => "block",
            RunMode::Hybrid => "hybrid",
            RunMode::Overlay => "overlay",
            RunMode::All => "all",
        }
    }
}

impl FromStr for RunMode {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "span" => Ok(RunMode::Span),
            "line" => Ok(RunMode::Line),
            "block" => Ok(RunMode::Block),
            "hybrid" => Ok(RunMode::Hybrid),
            "overlay" => Ok(RunMode::Overlay),
            "all" => Ok(RunMode::All),
            other => Err(anyhow!(
                "unknown mode '{}'. Use span, line, block, hybrid, overlay or all",
                other
            )),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counters for one run, logged and printed by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub mode: RunMode,
    pub units: usize,
    pub translated: usize,
    pub fitted: usize,
    pub overflowed: usize,
    pub erased: usize,
    pub pages: usize,
}

impl RunSummary {
    fn new(mode: RunMode, pages: usize) -> Self {
        Self {
            mode,
            units: 0,
            translated: 0,
            fitted: 0,
            overflowed: 0,
            erased: 0,
            pages,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: units={} translated={} fitted={} overflowed={} erased={} pages={}",
            self.mode,
            self.units,
            self.translated,
            self.fitted,
            self.overflowed,
            self.erased,
            self.pages
        )
    }
}

/// Optional inputs that only some modes use.
#[derive(Clone, Copy, Default)]
pub struct RunInputs<'a> {
    /// Hybrid mode clips text to these regions instead of regrouping raw lines.
    pub analyzer: Option<&'a dyn LayoutAnalyzer>,
    pub overlay: Option<&'a OverlaySet>,
}

/// One sub-run of `all` mode that produced a plan file.
#[derive(Debug, Clone)]
pub struct ModeOutput {
    pub summary: RunSummary,
    pub plan: RenderPlan,
    pub path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AllOutcome {
    pub outputs: Vec<ModeOutput>,
    pub bundle: PathBuf,
}

struct DrawJob {
    page: usize,
    rect: Rect,
    text: String,
    style: TextStyle,
    /// `(source, target)` decided from the unit's own text.
    langs: (&'static str, &'static str),
}

pub struct Pipeline<'a, P> {
    settings: &'a Settings,
    styles: &'a StyleIndex,
    fonts: &'a FontResolver,
    translator: &'a BatchTranslator<P>,
    fitter: TextFitter,
}

impl<'a, P: TranslationProvider> Pipeline<'a, P> {
    pub fn new(
        settings: &'a Settings,
        styles: &'a StyleIndex,
        fonts: &'a FontResolver,
        translator: &'a BatchTranslator<P>,
    ) -> Self {
        Self {
            settings,
            styles,
            fonts,
            translator,
            fitter: TextFitter::new(settings.fit.clone()),
        }
    }

    pub async fn run_mode<S, R>(
        &self,
        mode: RunMode,
        source: &S,
        renderer: &mut R,
        inputs: RunInputs<'_>,
    ) -> Result<RunSummary>
    where
        S: ContentSource + ?Sized,
        R: Renderer + ?Sized,
    {
        let summary = match mode {
            RunMode::Span => self.run_units(source, renderer, Granularity::Span).await,
            RunMode::Line => self.run_units(source, renderer, Granularity::Line).await,
            RunMode::Block => self.run_units(source, renderer, Granularity::Block).await,
            RunMode::Hybrid => self.run_hybrid(source, renderer, inputs.analyzer).await?,
            RunMode::Overlay => {
                let overlay = inputs
                    .overlay
                    .filter(|set| !set.is_empty())
                    .ok_or_else(|| anyhow!("overlay mode requires overlay items"))?;
                self.run_overlay(source, renderer, overlay)
            }
            RunMode::All => return Err(anyhow!("'all' is not a single run mode")),
        };
        info!(
            mode = %summary.mode,
            units = summary.units,
            translated = summary.translated,
            fitted = summary.fitted,
            overflowed = summary.overflowed,
            erased = summary.erased,
            "run finished"
        );
        Ok(summary)
    }

    /// Span, line or block mode. Spans are always extracted for style and
    /// erasure; the requested granularity is what gets redrawn.
    pub async fn run_units<S, R>(
        &self,
        source: &S,
        renderer: &mut R,
        granularity: Granularity,
    ) -> RunSummary
    where
        S: ContentSource + ?Sized,
        R: Renderer + ?Sized,
    {
        let mode = match granularity {
            Granularity::Span => RunMode::Span,
            Granularity::Line => RunMode::Line,
            Granularity::Block => RunMode::Block,
        };
        let mut summary = RunSummary::new(mode, source.page_count());
        let spans = self.styled_spans(source);

        let erase_settings = &self.settings.erase;
        for span in &spans {
            let Some(page_rect) = source.page_rect(span.page) else {
                continue;
            };
            let Some(rect) = erase_rect(&span.rect, span.style.fontsize, &page_rect, erase_settings)
            else {
                continue;
            };
            let fill = pick_fill(&span.style.color, erase_settings.luminance_threshold);
            if erase::erase(renderer, span.page, rect, fill, erase_settings.mode) {
                summary.erased += 1;
            }
        }
        apply_all_redactions(renderer, source.page_count(), erase_settings.mode);

        let units = match granularity {
            Granularity::Span => spans.clone(),
            _ => {
                let mut units = extract::extract_units(source, granularity);
                let iou = if granularity == Granularity::Line {
                    self.settings.matching.line_iou
                } else {
                    self.settings.matching.block_iou
                };
                aggregate_styles(&mut units, &spans, iou);
                units
            }
        };
        debug!(granularity = ?granularity, units = units.len(), "units extracted");

        let jobs = units
            .into_iter()
            .map(|unit| DrawJob {
                page: unit.page,
                rect: unit.rect,
                langs: self.langs_for(&unit.text),
                text: unit.text,
                style: unit.style,
            })
            .collect();
        self.translate_and_draw(renderer, jobs, &mut summary).await;
        summary
    }

    /// Hybrid mode. Table-like blocks are redrawn cell by cell into the
    /// reconstructed column bands; other blocks are redrawn whole.
    pub async fn run_hybrid<S, R>(
        &self,
        source: &S,
        renderer: &mut R,
        analyzer: Option<&dyn LayoutAnalyzer>,
    ) -> Result<RunSummary>
    where
        S: ContentSource + ?Sized,
        R: Renderer + ?Sized,
    {
        let mut summary = RunSummary::new(RunMode::Hybrid, source.page_count());
        let spans = self.styled_spans(source);
        let mut blocks = match analyzer {
            Some(analyzer) => {
                info!("hybrid: using layout analyzer regions");
                extract::extract_hybrid_ai(source, analyzer, self.settings.layout_dpi)
                    .with_context(|| "layout analysis failed")?
            }
            None => extract::extract_hybrid_raw(source, &self.settings.table),
        };
        aggregate_styles(&mut blocks, &spans, self.settings.matching.block_iou);

        let erase_settings = &self.settings.erase;
        for block in &blocks {
            let Some(page_rect) = source.page_rect(block.page) else {
                continue;
            };
            let Some(rect) =
                erase_rect(&block.rect, block.style.fontsize, &page_rect, erase_settings)
            else {
                continue;
            };
            let fill = dominant_fill_for_rect(
                &rect,
                block.page,
                &spans,
                erase_settings.luminance_threshold,
            );
            if erase::erase(renderer, block.page, rect, fill, erase_settings.mode) {
                summary.erased += 1;
            }
        }
        apply_all_redactions(renderer, source.page_count(), erase_settings.mode);

        let mut jobs = Vec::new();
        let mut tables = 0usize;
        for block in blocks {
            // Cells follow the direction of their whole block.
            let langs = self.langs_for(&block.text);
            if !is_table_like(&block, &self.settings.table) {
                jobs.push(DrawJob {
                    page: block.page,
                    rect: block.rect,
                    text: block.text,
                    style: block.style,
                    langs,
                });
                continue;
            }
            tables += 1;
            let columns = build_columns(&block, &self.settings.table);
            for line in &block.lines {
                for segment in &line.segments {
                    let fontsize = median(&segment.sizes).unwrap_or(block.style.fontsize);
                    jobs.push(DrawJob {
                        page: block.page,
                        rect: place_segment(&columns, segment, line),
                        text: segment.text.clone(),
                        style: TextStyle {
                            fontsize,
                            ..block.style.clone()
                        },
                        langs,
                    });
                }
            }
        }
        debug!(tables, jobs = jobs.len(), "hybrid layout planned");

        self.translate_and_draw(renderer, jobs, &mut summary).await;
        Ok(summary)
    }

    /// Overlay mode. Item text is drawn as given, in black, after erasing
    /// each transformed box.
    pub fn run_overlay<S, R>(&self, source: &S, renderer: &mut R, overlay: &OverlaySet) -> RunSummary
    where
        S: ContentSource + ?Sized,
        R: Renderer + ?Sized,
    {
        let mut summary = RunSummary::new(RunMode::Overlay, source.page_count());
        let spans = self.styled_spans(source);
        let erase_settings = &self.settings.erase;

        let placed: Vec<(&OverlayItem, Rect)> = overlay
            .items
            .iter()
            .filter_map(|item| {
                let page_rect = source.page_rect(item.page)?;
                let rect = overlay.transform.apply(&item.bbox);
                match intersection(&rect, &page_rect).filter(|r| !r.is_empty()) {
                    Some(_) => Some((item, rect)),
                    None => {
                        debug!(page = item.page, "overlay item outside its page");
                        None
                    }
                }
            })
            .collect();

        for (item, rect) in &placed {
            let Some(clipped) = source
                .page_rect(item.page)
                .and_then(|page_rect| intersection(rect, &page_rect))
            else {
                continue;
            };
            let fill = dominant_fill_for_rect(
                &clipped,
                item.page,
                &spans,
                erase_settings.luminance_threshold,
            );
            if erase::erase(renderer, item.page, clipped, fill, erase_settings.mode) {
                summary.erased += 1;
            }
        }
        apply_all_redactions(renderer, source.page_count(), erase_settings.mode);

        for (item, rect) in placed {
            summary.units += 1;
            let style = TextStyle {
                fontsize: item.fontsize.filter(|size| *size > 0.0).unwrap_or(DEFAULT_FONT_SIZE),
                color: Color::Gray(0.0),
                font: DEFAULT_FONT_NAME.to_string(),
                flags: TextFlags::empty(),
            };
            self.draw(renderer, item.page, rect, &item.text, &style, &mut summary);
        }
        summary
    }

    /// Runs every sub-mode on a fresh copy of `source`, writes each plan next
    /// to `output` and bundles them. Failed sub-runs are logged and skipped.
    pub async fn run_all<S>(&self, source: &S, inputs: RunInputs<'_>, output: &Path) -> Result<AllOutcome>
    where
        S: ContentSource + Clone,
    {
        let mut modes = vec![RunMode::Span, RunMode::Line, RunMode::Block, RunMode::Hybrid];
        if inputs.overlay.is_some_and(|set| !set.is_empty()) {
            modes.push(RunMode::Overlay);
        } else {
            info!("overlay skipped in 'all' mode: no overlay items");
        }

        let mut outputs = Vec::new();
        for mode in modes {
            let fresh = source.clone();
            let mut renderer = RecordingRenderer::new();
            let path = labeled_output(output, mode.as_str());
            let result = match self.run_mode(mode, &fresh, &mut renderer, inputs).await {
                Ok(summary) => {
                    let plan = renderer.into_plan(&fresh);
                    write_plan(&plan, &path).map(|_| ModeOutput {
                        summary,
                        plan,
                        path: path.clone(),
                    })
                }
                Err(err) => Err(err),
            };
            match result {
                Ok(output) => outputs.push(output),
                Err(err) => warn!(mode = %mode, "sub-run failed: {:#}", err),
            }
        }

        let bundle = bundle_path(output);
        let files: Vec<(String, PathBuf)> = outputs
            .iter()
            .map(|out| (out.summary.mode.to_string(), out.path.clone()))
            .collect();
        let zipped = write_bundle(&bundle, &files)?;
        info!(files = zipped, bundle = %bundle.display(), "all-mode outputs bundled");
        Ok(AllOutcome { outputs, bundle })
    }

    fn styled_spans<S: ContentSource + ?Sized>(&self, source: &S) -> Vec<Span> {
        let mut spans = extract::extract_spans(source);
        transfer_span_styles(&mut spans, self.styles, &self.settings.matching);
        spans
    }

    async fn translate_and_draw<R: Renderer + ?Sized>(
        &self,
        renderer: &mut R,
        jobs: Vec<DrawJob>,
        summary: &mut RunSummary,
    ) {
        let requests: Vec<TranslateRequest<'_>> = jobs
            .iter()
            .map(|job| TranslateRequest {
                text: job.text.as_str(),
                source: job.langs.0,
                target: job.langs.1,
            })
            .collect();
        debug!(
            direction = %self.settings.translate.direction,
            units = requests.len(),
            "translating"
        );
        let outcome = self.translator.translate_requests(&requests).await;
        summary.translated += outcome.requested - outcome.failed;

        for (job, text) in jobs.iter().zip(outcome.texts.iter()) {
            summary.units += 1;
            self.draw(renderer, job.page, job.rect, text, &job.style, summary);
        }
    }

    fn langs_for(&self, text: &str) -> (&'static str, &'static str) {
        resolve_direction(self.settings.translate.direction, std::iter::once(text))
    }

    fn draw<R: Renderer + ?Sized>(
        &self,
        renderer: &mut R,
        page: usize,
        rect: Rect,
        text: &str,
        style: &TextStyle,
        summary: &mut RunSummary,
    ) {
        if text.trim().is_empty() {
            return;
        }
        let font = self.fonts.resolve(text, style.flags, &style.font);
        let outcome = self.fitter.fit_and_draw(
            renderer,
            &FitRequest {
                page,
                rect,
                text,
                font: &font,
                base_size: style.fontsize,
                color: style.color,
            },
        );
        if outcome.fitted {
            summary.fitted += 1;
        } else {
            summary.overflowed += 1;
        }
    }
}

pub fn write_plan(plan: &RenderPlan, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, plan.to_json()?)
        .with_context(|| format!("failed to write render plan: {}", path.display()))
}
