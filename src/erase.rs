use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::geometry::{Rect, intersection, intersection_area, padded};
use crate::model::{Color, Span};
use crate::render::Renderer;

/// How original text is removed before redrawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EraseMode {
    /// Queue redactions and apply them once per page.
    #[default]
    Redact,
    /// Paint filled rects over the text.
    Mask,
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EraseSettings {
    pub mode: EraseMode,
    pub pad_min: f32,
    pub pad_ratio: f32,
    /// Text at or above this luminance is light and gets a black fill.
    pub luminance_threshold: f32,
}

impl Default for EraseSettings {
    fn default() -> Self {
        Self {
            mode: EraseMode::Redact,
            pad_min: 1.0,
            pad_ratio: 0.18,
            luminance_threshold: 0.85,
        }
    }
}

/// Relative luminance (Rec. 709 weights) of the color's RGB channels.
pub fn luminance(color: &Color) -> f32 {
    match *color {
        // The weights sum to one, so gray is its own luminance.
        Color::Gray(v) => v,
        _ => {
            let (r, g, b) = color.to_rgb();
            0.2126 * r + 0.7152 * g + 0.0722 * b
        }
    }
}

/// Fill that keeps contrast with the erased text: light text sat on a dark
/// background, so it gets a black fill.
pub fn pick_fill(color: &Color, threshold: f32) -> Color {
    if luminance(color) >= threshold {
        Color::BLACK
    } else {
        Color::WHITE
    }
}

/// Fill for `rect` decided by the styled span it overlaps most. White when
/// nothing overlaps.
pub fn dominant_fill_for_rect(rect: &Rect, page: usize, spans: &[Span], threshold: f32) -> Color {
    let mut best: Option<(&Span, f32)> = None;
    for span in spans.iter().filter(|span| span.page == page) {
        let overlap = intersection_area(rect, &span.rect);
        if overlap > 0.0 && best.is_none_or(|(_, best_overlap)| overlap > best_overlap) {
            best = Some((span, overlap));
        }
    }
    best.map(|(span, _)| pick_fill(&span.style.color, threshold))
        .unwrap_or(Color::WHITE)
}

/// Unit rect padded by `max(pad_min, pad_ratio * fontsize)` and clipped to
/// the page. `None` when nothing remains.
pub fn erase_rect(rect: &Rect, fontsize: f32, page_rect: &Rect, settings: &EraseSettings) -> Option<Rect> {
    let pad = settings.pad_min.max(settings.pad_ratio * fontsize);
    intersection(&padded(rect, pad), page_rect).filter(|clipped| !clipped.is_empty())
}

/// Queues or paints one erase depending on the mode.
pub fn erase<R: Renderer + ?Sized>(
    renderer: &mut R,
    page: usize,
    rect: Rect,
    fill: Color,
    mode: EraseMode,
) -> bool {
    match mode {
        EraseMode::Redact => renderer.add_redaction(page, rect, fill),
        EraseMode::Mask => renderer.fill_rect(page, rect, fill),
        EraseMode::None => return false,
    }
    true
}

/// Applies queued redactions on every page, logging failures per page.
pub fn apply_all_redactions<R: Renderer + ?Sized>(renderer: &mut R, pages: usize, mode: EraseMode) {
    if mode != EraseMode::Redact {
        return;
    }
    for page in 0..pages {
        if let Err(err) = renderer.apply_redactions(page) {
            warn!(page, "failed to apply redactions: {:#}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextStyle;
    use crate::render::{RecordingRenderer, RenderCommand};

    fn span(rect: Rect, color: Color) -> Span {
        Span {
            page: 0,
            rect,
            text: "t".to_string(),
            style: TextStyle {
                color,
                ..TextStyle::default()
            },
        }
    }

    #[test]
    fn light_text_gets_black_fill() {
        assert_eq!(pick_fill(&Color::Gray(0.92), 0.85), Color::BLACK);
        assert_eq!(pick_fill(&Color::Gray(0.08), 0.85), Color::WHITE);
        assert_eq!(pick_fill(&Color::Gray(0.85), 0.85), Color::BLACK);
    }

    #[test]
    fn largest_overlap_decides() {
        let spans = vec![
            span(Rect::new(0.0, 0.0, 10.0, 10.0), Color::WHITE),
            span(Rect::new(10.0, 0.0, 40.0, 10.0), Color::BLACK),
        ];
        let rect = Rect::new(5.0, 0.0, 30.0, 10.0);
        assert_eq!(dominant_fill_for_rect(&rect, 0, &spans, 0.85), Color::WHITE);
        let light_side = Rect::new(0.0, 0.0, 12.0, 10.0);
        assert_eq!(dominant_fill_for_rect(&light_side, 0, &spans, 0.85), Color::BLACK);
        let nowhere = Rect::new(100.0, 100.0, 110.0, 110.0);
        assert_eq!(dominant_fill_for_rect(&nowhere, 0, &spans, 0.85), Color::WHITE);
        assert_eq!(dominant_fill_for_rect(&rect, 1, &spans, 0.85), Color::WHITE);
    }

    #[test]
    fn erase_rect_is_padded_and_clipped() {
        let page = Rect::new(0.0, 0.0, 100.0, 100.0);
        let settings = EraseSettings::default();
        let rect = erase_rect(&Rect::new(2.0, 10.0, 50.0, 20.0), 20.0, &page, &settings).unwrap();
        assert!((rect.x0 - 0.0).abs() < 1e-4);
        assert!((rect.y0 - 6.4).abs() < 1e-4);
        assert!((rect.x1 - 53.6).abs() < 1e-4);
        assert!(erase_rect(&Rect::new(200.0, 200.0, 210.0, 210.0), 10.0, &page, &settings).is_none());
    }

    #[test]
    fn redact_mode_defers_until_applied() {
        let mut renderer = RecordingRenderer::new();
        let rect = Rect::new(0.0, 0.0, 1.0, 1.0);
        assert!(erase(&mut renderer, 0, rect, Color::WHITE, EraseMode::Redact));
        assert!(renderer.commands(0).is_empty());
        apply_all_redactions(&mut renderer, 1, EraseMode::Redact);
        assert_eq!(renderer.commands(0).len(), 1);

        assert!(erase(&mut renderer, 0, rect, Color::BLACK, EraseMode::Mask));
        assert!(matches!(
            renderer.commands(0)[1],
            RenderCommand::Fill { color: Color::Rgb(..), .. }
        ));
        assert!(!erase(&mut renderer, 0, rect, Color::BLACK, EraseMode::None));
    }
}
