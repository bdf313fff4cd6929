mod aggregate;
mod matcher;

use std::collections::HashMap;

use crate::model::{Color, DEFAULT_FONT_NAME, StyleRecord, TextFlags, TextStyle};
use crate::source::ContentSource;

pub use aggregate::{aggregate_styles, median, most_frequent_color};
pub use matcher::{
    BLOCK_AGGREGATE_IOU, LINE_AGGREGATE_IOU, MatchKind, MatchSettings, SPAN_IOU_HIGH,
    SPAN_IOU_LOW, match_style, transfer_span_styles,
};

const RECORD_DEFAULT_SIZE: f32 = 10.0;

/// Per-page ground-truth styles captured from the original document before
/// any OCR pass. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct StyleIndex {
    pages: HashMap<usize, Vec<StyleRecord>>,
}

impl StyleIndex {
    pub fn new(pages: HashMap<usize, Vec<StyleRecord>>) -> Self {
        Self { pages }
    }

    /// One record per original span that carries a bbox.
    pub fn from_source<S: ContentSource + ?Sized>(source: &S) -> Self {
        let mut pages: HashMap<usize, Vec<StyleRecord>> = HashMap::new();
        for page in 0..source.page_count() {
            let Some(raw) = source.raw_page(page) else {
                continue;
            };
            let records = pages.entry(page).or_default();
            for span in raw
                .blocks
                .iter()
                .flat_map(|block| block.lines.iter())
                .flat_map(|line| line.spans.iter())
            {
                let Some(bbox) = span.bbox else {
                    continue;
                };
                records.push(StyleRecord {
                    bbox,
                    style: TextStyle {
                        fontsize: span.size.unwrap_or(RECORD_DEFAULT_SIZE),
                        color: span
                            .color
                            .as_ref()
                            .map(Color::from_value)
                            .unwrap_or(Color::BLACK),
                        font: span
                            .font
                            .clone()
                            .unwrap_or_else(|| DEFAULT_FONT_NAME.to_string()),
                        flags: TextFlags::from_bits_retain(span.flags.unwrap_or(0)),
                    },
                });
            }
        }
        Self { pages }
    }

    pub fn candidates(&self, page: usize) -> &[StyleRecord] {
        self.pages.get(&page).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn record_count(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }
}
