//! Boundary to the drawing backend.
//!
//! The engine only talks to [`Renderer`]. [`RecordingRenderer`] implements it
//! by recording serializable commands and simulating text-box fitting with
//! real font metrics, which is what the CLI writes out and previews.

mod svg;
mod wrap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::fonts::{FontMetrics, ResolvedFont, load_font_metrics, measure_text_width};
use crate::geometry::{Point, Rect};
use crate::model::Color;
use crate::source::ContentSource;

pub use svg::{escape_xml, render_page_svg, render_svg_png, write_previews};
pub(crate) use wrap::wrap_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// One wrapped text box request.
#[derive(Debug, Clone, Copy)]
pub struct TextBox<'a> {
    pub page: usize,
    pub rect: Rect,
    pub text: &'a str,
    pub font: &'a ResolvedFont,
    pub size: f32,
    pub line_height: f32,
    pub color: Color,
    pub align: Align,
}

pub trait Renderer {
    fn fill_rect(&mut self, page: usize, rect: Rect, color: Color);
    fn add_redaction(&mut self, page: usize, rect: Rect, fill: Color);
    /// Applies every redaction queued for `page`.
    fn apply_redactions(&mut self, page: usize) -> Result<()>;
    /// Draws wrapped text inside the box. Returns `false`, drawing nothing,
    /// when the wrapped text does not fit.
    fn draw_text_box(&mut self, request: &TextBox<'_>) -> bool;
    /// Draws one unwrapped line with its baseline starting at `origin`.
    fn draw_text(
        &mut self,
        page: usize,
        origin: Point,
        text: &str,
        font: &ResolvedFont,
        size: f32,
        color: Color,
    );
    fn text_width(&mut self, text: &str, font: &ResolvedFont, size: f32) -> f32;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderCommand {
    Fill {
        rect: Rect,
        color: Color,
    },
    TextBox {
        rect: Rect,
        text: String,
        font: String,
        size: f32,
        line_height: f32,
        color: Color,
        align: Align,
        lines: Vec<String>,
    },
    Text {
        origin: Point,
        text: String,
        font: String,
        size: f32,
        color: Color,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagePlan {
    pub page: usize,
    pub width: f32,
    pub height: f32,
    pub commands: Vec<RenderCommand>,
}

/// Everything a run drew, page by page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderPlan {
    pub pages: Vec<PagePlan>,
}

impl RenderPlan {
    pub fn command_count(&self) -> usize {
        self.pages.iter().map(|page| page.commands.len()).sum()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pages: BTreeMap<usize, Vec<RenderCommand>>,
    pending: BTreeMap<usize, Vec<(Rect, Color)>>,
    metrics: HashMap<PathBuf, Option<FontMetrics>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self, page: usize) -> &[RenderCommand] {
        self.pages.get(&page).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn pending_redactions(&self, page: usize) -> usize {
        self.pending.get(&page).map(Vec::len).unwrap_or(0)
    }

    pub fn into_plan<S: ContentSource + ?Sized>(mut self, source: &S) -> RenderPlan {
        let pages = (0..source.page_count())
            .map(|page| {
                let rect = source.page_rect(page).unwrap_or_default();
                PagePlan {
                    page,
                    width: rect.width(),
                    height: rect.height(),
                    commands: self.pages.remove(&page).unwrap_or_default(),
                }
            })
            .collect();
        RenderPlan { pages }
    }

    fn font_metrics(&mut self, font: &ResolvedFont) -> Option<&FontMetrics> {
        let path = font.path.as_ref()?;
        self.metrics
            .entry(path.clone())
            .or_insert_with(|| match load_font_metrics(path) {
                Ok(metrics) => Some(metrics),
                Err(err) => {
                    warn!("font metrics unavailable, estimating widths: {:#}", err);
                    None
                }
            })
            .as_ref()
    }

    fn push(&mut self, page: usize, command: RenderCommand) {
        self.pages.entry(page).or_default().push(command);
    }
}

impl Renderer for RecordingRenderer {
    fn fill_rect(&mut self, page: usize, rect: Rect, color: Color) {
        self.push(page, RenderCommand::Fill { rect, color });
    }

    fn add_redaction(&mut self, page: usize, rect: Rect, fill: Color) {
        self.pending.entry(page).or_default().push((rect, fill));
    }

    fn apply_redactions(&mut self, page: usize) -> Result<()> {
        let Some(pending) = self.pending.remove(&page) else {
            return Ok(());
        };
        debug!(page, count = pending.len(), "applying redactions");
        for (rect, color) in pending {
            self.push(page, RenderCommand::Fill { rect, color });
        }
        Ok(())
    }

    fn draw_text_box(&mut self, request: &TextBox<'_>) -> bool {
        let rect = request.rect;
        if rect.width() <= 0.0 || rect.height() <= 0.0 || request.size <= 0.0 {
            return false;
        }
        let size = request.size;
        let metrics = self.font_metrics(request.font).cloned();
        let measure = |line: &str| measure_text_width(line, size, metrics.as_ref());
        let lines = wrap_text(request.text, rect.width(), &measure);
        let tolerance = 1e-3;
        let too_tall = lines.len() as f32 * request.line_height > rect.height() + tolerance;
        let too_wide = lines
            .iter()
            .any(|line| measure(line) > rect.width() + tolerance);
        if too_tall || too_wide {
            return false;
        }
        self.push(
            request.page,
            RenderCommand::TextBox {
                rect,
                text: request.text.to_string(),
                font: request.font.name.clone(),
                size,
                line_height: request.line_height,
                color: request.color,
                align: request.align,
                lines,
            },
        );
        true
    }

    fn draw_text(
        &mut self,
        page: usize,
        origin: Point,
        text: &str,
        font: &ResolvedFont,
        size: f32,
        color: Color,
    ) {
        self.push(
            page,
            RenderCommand::Text {
                origin,
                text: text.to_string(),
                font: font.name.clone(),
                size,
                color,
            },
        );
    }

    fn text_width(&mut self, text: &str, font: &ResolvedFont, size: f32) -> f32 {
        let metrics = self.font_metrics(font);
        measure_text_width(text, size, metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::Script;
    use crate::source::{JsonDocument, RawPage};

    fn helv() -> ResolvedFont {
        ResolvedFont::base14("helv", Script::Latin)
    }

    fn request<'a>(rect: Rect, text: &'a str, font: &'a ResolvedFont, size: f32) -> TextBox<'a> {
        TextBox {
            page: 0,
            rect,
            text,
            font,
            size,
            line_height: size * 1.25,
            color: Color::BLACK,
            align: Align::Left,
        }
    }

    #[test]
    fn text_box_wraps_when_room_allows() {
        let font = helv();
        let mut renderer = RecordingRenderer::new();
        let ok = renderer.draw_text_box(&request(
            Rect::new(0.0, 0.0, 60.0, 40.0),
            "alpha beta gamma",
            &font,
            10.0,
        ));
        assert!(ok);
        match &renderer.commands(0)[0] {
            RenderCommand::TextBox { lines, .. } => assert!(lines.len() >= 2),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn overflowing_box_draws_nothing() {
        let font = helv();
        let mut renderer = RecordingRenderer::new();
        let ok = renderer.draw_text_box(&request(
            Rect::new(0.0, 0.0, 30.0, 10.0),
            "far too much text for this box",
            &font,
            10.0,
        ));
        assert!(!ok);
        assert!(renderer.commands(0).is_empty());
        assert!(!renderer.draw_text_box(&request(Rect::default(), "x", &font, 10.0)));
    }

    #[test]
    fn redactions_become_fills_on_apply() {
        let mut renderer = RecordingRenderer::new();
        renderer.add_redaction(1, Rect::new(0.0, 0.0, 5.0, 5.0), Color::WHITE);
        assert_eq!(renderer.pending_redactions(1), 1);
        assert!(renderer.commands(1).is_empty());
        renderer.apply_redactions(1).unwrap();
        renderer.apply_redactions(2).unwrap();
        assert_eq!(renderer.pending_redactions(1), 0);
        assert_eq!(
            renderer.commands(1),
            &[RenderCommand::Fill {
                rect: Rect::new(0.0, 0.0, 5.0, 5.0),
                color: Color::WHITE
            }]
        );
    }

    #[test]
    fn plan_covers_every_page() {
        let doc = JsonDocument::from_pages(vec![
            RawPage {
                width: 100.0,
                height: 200.0,
                blocks: Vec::new(),
            },
            RawPage {
                width: 100.0,
                height: 200.0,
                blocks: Vec::new(),
            },
        ]);
        let mut renderer = RecordingRenderer::new();
        renderer.fill_rect(1, Rect::new(0.0, 0.0, 1.0, 1.0), Color::BLACK);
        let plan = renderer.into_plan(&doc);
        assert_eq!(plan.pages.len(), 2);
        assert_eq!(plan.command_count(), 1);
        assert_eq!(plan.pages[0].width, 100.0);
        insta::assert_snapshot!(
            serde_json::to_string(&plan.pages[1].commands).unwrap(),
            @r#"[{"kind":"fill","rect":[0.0,0.0,1.0,1.0],"color":[0.0,0.0,0.0]}]"#
        );
    }
}
