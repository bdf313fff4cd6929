//! Fitting replacement text into the footprint of the original.
//!
//! Size is first reduced so the text fits the padded width on one line, then
//! reduced further until the wrapped text fits the height. Below the readable
//! floor the box grows downward instead, and when nothing fits the text is
//! drawn unwrapped so it is never lost.

use tracing::debug;

use crate::fonts::ResolvedFont;
use crate::geometry::{Point, Rect, padded};
use crate::model::Color;
use crate::render::{Align, Renderer, TextBox};

#[derive(Debug, Clone, PartialEq)]
pub struct FitSettings {
    pub pad_min: f32,
    pub pad_ratio: f32,
    /// Replacement faces tend to look smaller than the source face.
    pub size_boost: f32,
    pub width_safety: f32,
    pub min_width_size: f32,
    pub shrink_factor: f32,
    pub max_attempts: usize,
    pub hard_floor: f32,
    pub readable_floor: f32,
    pub line_height: f32,
    pub expansion_lines: f32,
    pub expansion_leading: f32,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            pad_min: 1.2,
            pad_ratio: 0.20,
            size_boost: 1.05,
            width_safety: 0.95,
            min_width_size: 5.0,
            shrink_factor: 0.90,
            max_attempts: 15,
            hard_floor: 3.0,
            readable_floor: 8.0,
            line_height: 1.25,
            expansion_lines: 3.0,
            expansion_leading: 1.4,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FitRequest<'a> {
    pub page: usize,
    pub rect: Rect,
    pub text: &'a str,
    pub font: &'a ResolvedFont,
    pub base_size: f32,
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOutcome {
    /// Size the text was finally drawn at.
    pub size: f32,
    pub rect: Rect,
    /// `false` when the unwrapped fallback was used.
    pub fitted: bool,
    pub attempts: usize,
}

/// Size that brings a single line measuring `measured` at `size` within
/// `width`, with the safety margin applied.
pub fn shrink_to_width(size: f32, measured: f32, width: f32, settings: &FitSettings) -> f32 {
    if measured <= width || measured <= 0.0 {
        return size;
    }
    settings
        .min_width_size
        .max(size * (width / measured) * settings.width_safety)
}

#[derive(Debug, Clone, Default)]
pub struct TextFitter {
    settings: FitSettings,
}

impl TextFitter {
    pub fn new(settings: FitSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FitSettings {
        &self.settings
    }

    pub fn fit_and_draw<R: Renderer + ?Sized>(
        &self,
        renderer: &mut R,
        request: &FitRequest<'_>,
    ) -> FitOutcome {
        let s = &self.settings;
        let pad = s.pad_min.max(s.pad_ratio * request.base_size);
        let rect = padded(&request.rect, pad);
        if request.text.trim().is_empty() {
            return FitOutcome {
                size: request.base_size,
                rect,
                fitted: true,
                attempts: 0,
            };
        }

        let boosted = request.base_size * s.size_boost;
        let mut size = boosted;
        if rect.width() > 0.0 && rect.height() > 0.0 {
            let measured = renderer.text_width(request.text, request.font, boosted);
            size = shrink_to_width(boosted, measured, rect.width(), s);
        }

        let mut attempts = 0;
        while attempts < s.max_attempts {
            attempts += 1;
            let (effective, target) = if size < s.readable_floor {
                let grown = Rect {
                    y1: rect.y1 + s.expansion_lines * s.readable_floor * s.expansion_leading,
                    ..rect
                };
                (s.readable_floor, grown)
            } else {
                (size, rect)
            };
            let drawn = renderer.draw_text_box(&TextBox {
                page: request.page,
                rect: target,
                text: request.text,
                font: request.font,
                size: effective,
                line_height: effective * s.line_height,
                color: request.color,
                align: Align::Left,
            });
            if drawn {
                return FitOutcome {
                    size: effective,
                    rect: target,
                    fitted: true,
                    attempts,
                };
            }
            size *= s.shrink_factor;
            if size < s.hard_floor {
                break;
            }
        }

        let safe = size.max(s.readable_floor);
        debug!(
            page = request.page,
            attempts,
            size = safe,
            "text overflowed, drawing unwrapped"
        );
        renderer.draw_text(
            request.page,
            Point::new(rect.x0, rect.y0 + safe),
            request.text,
            request.font,
            safe,
            request.color,
        );
        FitOutcome {
            size: safe,
            rect,
            fitted: false,
            attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{RecordingRenderer, RenderCommand};
    use crate::script::Script;

    fn helv() -> ResolvedFont {
        ResolvedFont::base14("helv", Script::Latin)
    }

    fn request<'a>(rect: Rect, text: &'a str, font: &'a ResolvedFont, base: f32) -> FitRequest<'a> {
        FitRequest {
            page: 0,
            rect,
            text,
            font,
            base_size: base,
            color: Color::BLACK,
        }
    }

    #[test]
    fn wide_text_shrinks_below_width() {
        let settings = FitSettings::default();
        let size = shrink_to_width(12.0, 150.0, 100.0, &settings);
        assert!(size < 12.0);
        let predicted = 150.0 * size / 12.0;
        assert!(predicted <= 95.0 + 1e-3);
        assert_eq!(shrink_to_width(12.0, 80.0, 100.0, &settings), 12.0);
        assert_eq!(shrink_to_width(12.0, 10_000.0, 100.0, &settings), 5.0);
    }

    #[test]
    fn short_text_fits_on_first_attempt_with_boost() {
        let font = helv();
        let mut renderer = RecordingRenderer::new();
        let outcome = TextFitter::default().fit_and_draw(
            &mut renderer,
            &request(Rect::new(0.0, 0.0, 200.0, 30.0), "Hello", &font, 10.0),
        );
        assert!(outcome.fitted);
        assert_eq!(outcome.attempts, 1);
        assert!((outcome.size - 10.5).abs() < 1e-4);
        assert_eq!(outcome.rect, Rect::new(-2.0, -2.0, 202.0, 32.0));
    }

    #[test]
    fn sizes_below_readable_floor_grow_the_box() {
        let font = helv();
        let mut renderer = RecordingRenderer::new();
        let outcome = TextFitter::default().fit_and_draw(
            &mut renderer,
            &request(Rect::new(0.0, 0.0, 100.0, 4.0), "Hello world", &font, 10.0),
        );
        assert!(outcome.fitted);
        assert_eq!(outcome.attempts, 4);
        assert_eq!(outcome.size, 8.0);
        assert!((outcome.rect.y1 - 39.6).abs() < 1e-3);
    }

    #[test]
    fn exhausted_ladder_draws_unwrapped_at_readable_size() {
        let font = helv();
        let mut renderer = RecordingRenderer::new();
        let text = vec!["word"; 200].join(" ");
        let outcome = TextFitter::default().fit_and_draw(
            &mut renderer,
            &request(Rect::new(0.0, 0.0, 20.0, 5.0), &text, &font, 10.0),
        );
        assert!(!outcome.fitted);
        assert_eq!(outcome.size, 8.0);
        assert!(outcome.attempts < 15);
        match renderer.commands(0) {
            [RenderCommand::Text { origin, size, .. }] => {
                assert_eq!(*size, 8.0);
                assert_eq!(*origin, Point::new(-2.0, 6.0));
            }
            other => panic!("unexpected commands {:?}", other),
        }
    }
}
