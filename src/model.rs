use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geometry::Rect;

pub const DEFAULT_FONT_SIZE: f32 = 11.5;
pub const DEFAULT_FONT_NAME: &str = "helv";

bitflags! {
    /// Span flags as reported by the content model.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TextFlags: u32 {
        const SUPERSCRIPT = 1;
        const ITALIC = 2;
        const SERIF = 4;
        const MONOSPACE = 8;
        const BOLD = 16;
    }
}

/// Normalized color: gray, RGB or RGBA with every component in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<f32>", into = "Vec<f32>")]
pub enum Color {
    Gray(f32),
    Rgb(f32, f32, f32),
    Rgba(f32, f32, f32, f32),
}

impl Default for Color {
    fn default() -> Self {
        Color::Gray(0.0)
    }
}

impl Color {
    pub const BLACK: Color = Color::Rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::Rgb(1.0, 1.0, 1.0);

    /// Accepts packed `0xRRGGBB` integers, `#rrggbb` strings and component
    /// lists (0-255 lists are detected by any value above 1). Anything else
    /// becomes black gray.
    pub fn from_value(value: &Value) -> Color {
        match value {
            Value::Number(number) => match number.as_u64() {
                Some(packed) => {
                    let r = ((packed >> 16) & 255) as f32 / 255.0;
                    let g = ((packed >> 8) & 255) as f32 / 255.0;
                    let b = (packed & 255) as f32 / 255.0;
                    Color::Rgb(r, g, b)
                }
                None => Color::default(),
            },
            Value::String(raw) => parse_hex(raw).unwrap_or_default(),
            Value::Array(items) => {
                let components: Option<Vec<f32>> = items
                    .iter()
                    .map(|item| item.as_f64().map(|v| v as f32))
                    .collect();
                components.map(Color::from).unwrap_or_default()
            }
            _ => Color::default(),
        }
    }

    pub fn components(&self) -> Vec<f32> {
        match *self {
            Color::Gray(v) => vec![v],
            Color::Rgb(r, g, b) => vec![r, g, b],
            Color::Rgba(r, g, b, a) => vec![r, g, b, a],
        }
    }

    /// Gray is broadcast to all three channels; alpha is dropped.
    pub fn to_rgb(&self) -> (f32, f32, f32) {
        match *self {
            Color::Gray(v) => (v, v, v),
            Color::Rgb(r, g, b) | Color::Rgba(r, g, b, _) => (r, g, b),
        }
    }

    pub fn to_hex(&self) -> String {
        let (r, g, b) = self.to_rgb();
        let byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", byte(r), byte(g), byte(b))
    }
}

impl From<Vec<f32>> for Color {
    fn from(values: Vec<f32>) -> Self {
        let scaled: Vec<f32> = if values.iter().any(|v| *v > 1.0) {
            values.iter().map(|v| v / 255.0).collect()
        } else {
            values
        };
        let c: Vec<f32> = scaled.into_iter().map(|v| v.clamp(0.0, 1.0)).collect();
        match c.as_slice() {
            [v] => Color::Gray(*v),
            [r, g, b] => Color::Rgb(*r, *g, *b),
            [r, g, b, a] => Color::Rgba(*r, *g, *b, *a),
            _ => Color::default(),
        }
    }
}

impl From<Color> for Vec<f32> {
    fn from(color: Color) -> Self {
        color.components()
    }
}

fn parse_hex(raw: &str) -> Option<Color> {
    let hex = raw.trim().trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(hex.get(range)?, 16)
            .ok()
            .map(|v| v as f32 / 255.0)
    };
    Some(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub fontsize: f32,
    pub color: Color,
    pub font: String,
    pub flags: TextFlags,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            fontsize: DEFAULT_FONT_SIZE,
            color: Color::default(),
            font: DEFAULT_FONT_NAME.to_string(),
            flags: TextFlags::empty(),
        }
    }
}

/// Ground-truth style captured from the original document.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRecord {
    pub bbox: Rect,
    pub style: TextStyle,
}

/// A styled run of text at one granularity. Spans, lines and blocks share
/// this shape; they differ in how their text and rect were assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct TextUnit {
    pub page: usize,
    pub rect: Rect,
    pub text: String,
    pub style: TextStyle,
}

pub type Span = TextUnit;
pub type Line = TextUnit;
pub type Block = TextUnit;

#[derive(Debug, Clone, PartialEq)]
pub struct HybridSegment {
    pub rect: Rect,
    pub text: String,
    pub sizes: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HybridLine {
    pub rect: Rect,
    pub text: String,
    pub segments: Vec<HybridSegment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HybridBlock {
    pub page: usize,
    pub rect: Rect,
    pub lines: Vec<HybridLine>,
    pub text: String,
    pub style: TextStyle,
}

/// Units whose style can be derived from already-styled spans.
pub trait Styled {
    fn page(&self) -> usize;
    fn rect(&self) -> &Rect;
    fn style_mut(&mut self) -> &mut TextStyle;
}

impl Styled for TextUnit {
    fn page(&self) -> usize {
        self.page
    }

    fn rect(&self) -> &Rect {
        &self.rect
    }

    fn style_mut(&mut self) -> &mut TextStyle {
        &mut self.style
    }
}

impl Styled for HybridBlock {
    fn page(&self) -> usize {
        self.page
    }

    fn rect(&self) -> &Rect {
        &self.rect
    }

    fn style_mut(&mut self) -> &mut TextStyle {
        &mut self.style
    }
}
