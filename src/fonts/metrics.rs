use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::sync::Arc;
use ttf_parser::{Face, name_id};

/// Advance metrics of one face, enough to measure single-line text widths.
#[derive(Clone)]
pub struct FontMetrics {
    data: Arc<Vec<u8>>,
    units_per_em: u16,
    space_advance: u16,
    family: Option<String>,
    face_index: u32,
}

impl std::fmt::Debug for FontMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontMetrics")
            .field("family", &self.family)
            .field("units_per_em", &self.units_per_em)
            .field("face_index", &self.face_index)
            .finish()
    }
}

impl FontMetrics {
    pub fn family(&self) -> Option<&str> {
        self.family.as_deref()
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }
}

pub fn load_font_metrics(path: &Path) -> Result<FontMetrics> {
    let data =
        std::fs::read(path).with_context(|| format!("failed to read font: {}", path.display()))?;
    load_font_metrics_from_data(data)
        .with_context(|| format!("failed to parse font: {}", path.display()))
}

/// Width of `text` on one line at `font_size`, in the same units as the size.
/// Without metrics (base-14 names, unreadable files) widths are estimated
/// per character class.
pub fn measure_text_width(text: &str, font_size: f32, font: Option<&FontMetrics>) -> f32 {
    if let Some(font) = font
        && let Ok(face) = Face::parse(&font.data, font.face_index)
    {
        let mut advance = 0u32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            let glyph_advance = match ch {
                ' ' => font.space_advance,
                _ => face
                    .glyph_index(ch)
                    .and_then(|glyph| face.glyph_hor_advance(glyph))
                    .unwrap_or(font.space_advance),
            };
            advance = advance.saturating_add(glyph_advance as u32);
        }
        let units = font.units_per_em.max(1) as f32;
        return advance as f32 * (font_size / units);
    }
    estimate_text_width_units(text) * font_size
}

fn estimate_char_units(ch: char) -> f32 {
    if ch.is_whitespace() {
        0.25
    } else if ch.is_ascii_uppercase() || ch.is_ascii_digit() {
        0.62
    } else if ch.is_ascii_alphanumeric() {
        0.52
    } else if ch.is_ascii() {
        0.35
    } else if matches!(ch as u32, 0x0900..=0x097F) {
        // Combining vowel signs and the virama add no advance of their own.
        if matches!(ch as u32, 0x093E..=0x094D | 0x0901..=0x0903) {
            0.2
        } else {
            0.6
        }
    } else {
        0.8
    }
}

fn estimate_text_width_units(text: &str) -> f32 {
    text.chars()
        .filter(|ch| *ch != '\n')
        .map(estimate_char_units)
        .sum()
}

fn load_font_metrics_from_data(data: Vec<u8>) -> Result<FontMetrics> {
    let data = Arc::new(data);
    let count = ttf_parser::fonts_in_collection(&data).unwrap_or(1);
    for index in 0..count {
        let Ok(face) = Face::parse(&data, index) else {
            continue;
        };
        let units_per_em = face.units_per_em().max(1);
        let space_advance = face
            .glyph_index(' ')
            .and_then(|id| face.glyph_hor_advance(id))
            .unwrap_or(units_per_em / 2);
        return Ok(FontMetrics {
            family: extract_family_name(&face),
            data: Arc::clone(&data),
            units_per_em,
            space_advance,
            face_index: index,
        });
    }
    Err(anyhow!("no parsable face in font data"))
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_scales_linearly_with_size() {
        let small = measure_text_width("Invoice 42", 10.0, None);
        let large = measure_text_width("Invoice 42", 20.0, None);
        assert!(small > 0.0);
        assert!((large - 2.0 * small).abs() < 1e-3);
    }

    #[test]
    fn devanagari_signs_are_narrower_than_letters() {
        let base = measure_text_width("क", 10.0, None);
        let with_sign = measure_text_width("कि", 10.0, None);
        assert!(with_sign - base < base);
        assert_eq!(measure_text_width("", 10.0, None), 0.0);
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        assert!(load_font_metrics(&path).is_err());
        assert!(load_font_metrics(&dir.path().join("missing.ttf")).is_err());
    }
}
