use crate::geometry::{Rect, union_all};
use crate::model::DEFAULT_FONT_SIZE;
use crate::source::RawSpan;

/// Collapses whitespace runs to single spaces and trims both ends.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Span text, falling back to its glyphs when the text field is blank.
pub(super) fn span_text(span: &RawSpan) -> String {
    match span.text.as_deref() {
        Some(text) if !text.trim().is_empty() => collapse_whitespace(text),
        _ => {
            let joined: String = span.chars.iter().map(|ch| ch.c.as_str()).collect();
            collapse_whitespace(&joined)
        }
    }
}

/// Span bbox, else the union of its glyph boxes, else the enclosing block's.
pub(super) fn span_rect(span: &RawSpan, block_bbox: Option<Rect>) -> Option<Rect> {
    if let Some(bbox) = span.bbox {
        return Some(bbox);
    }
    let glyphs: Vec<Rect> = span.chars.iter().filter_map(|ch| ch.bbox).collect();
    union_all(&glyphs).or(block_bbox)
}

pub(super) fn span_size(span: &RawSpan) -> f32 {
    span.size.filter(|size| *size > 0.0).unwrap_or(DEFAULT_FONT_SIZE)
}

pub(super) fn join_nonempty<'a, I>(parts: I, separator: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RawChar;

    #[test]
    fn collapses_internal_runs() {
        assert_eq!(collapse_whitespace("  a \t b\n\nc  "), "a b c");
        assert_eq!(collapse_whitespace(" \n "), "");
    }

    #[test]
    fn blank_text_falls_back_to_glyphs() {
        let span = RawSpan {
            text: Some("   ".to_string()),
            chars: vec![
                RawChar {
                    c: "o".to_string(),
                    bbox: Some(Rect::new(0.0, 0.0, 5.0, 10.0)),
                },
                RawChar {
                    c: "k".to_string(),
                    bbox: Some(Rect::new(5.0, 1.0, 9.0, 11.0)),
                },
            ],
            ..RawSpan::default()
        };
        assert_eq!(span_text(&span), "ok");
        assert_eq!(span_rect(&span, None), Some(Rect::new(0.0, 0.0, 9.0, 11.0)));
    }

    #[test]
    fn rect_falls_back_to_block_bbox() {
        let span = RawSpan::default();
        let block = Rect::new(1.0, 1.0, 2.0, 2.0);
        assert_eq!(span_rect(&span, Some(block)), Some(block));
        assert_eq!(span_rect(&span, None), None);
        assert_eq!(span_size(&span), 11.5);
    }
}
