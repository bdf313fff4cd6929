//! Raw page geometry to styled-ready text units.

mod hybrid;
mod text;

use crate::geometry::{Rect, union_all};
use crate::model::{Block, Color, DEFAULT_FONT_NAME, Line, Span, TextFlags, TextStyle};
use crate::source::{ContentSource, RawSpan};
use crate::style::median;

pub use hybrid::{extract_hybrid_ai, extract_hybrid_raw};
pub(crate) use text::collapse_whitespace;

use text::{join_nonempty, span_rect, span_size, span_text};

/// Which granularity the single-unit modes extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Span,
    Line,
    Block,
}

/// A span as read from the source, before any grouping.
struct RawRun {
    rect: Rect,
    text: String,
    style: TextStyle,
}

fn read_run(span: &RawSpan, block_bbox: Option<Rect>) -> Option<RawRun> {
    let text = span_text(span);
    if text.is_empty() {
        return None;
    }
    let rect = span_rect(span, block_bbox)?;
    Some(RawRun {
        rect,
        text,
        style: TextStyle {
            fontsize: span_size(span),
            color: span
                .color
                .as_ref()
                .map(Color::from_value)
                .unwrap_or_default(),
            font: span
                .font
                .clone()
                .filter(|font| !font.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FONT_NAME.to_string()),
            flags: TextFlags::from_bits_retain(span.flags.unwrap_or(0)),
        },
    })
}

/// Runs grouped as page -> block -> line, empty groups dropped.
fn collect_runs<S: ContentSource + ?Sized>(source: &S) -> Vec<(usize, Vec<Vec<RawRun>>)> {
    let mut blocks = Vec::new();
    for page in 0..source.page_count() {
        let Some(raw) = source.raw_page(page) else {
            continue;
        };
        for block in &raw.blocks {
            let lines: Vec<Vec<RawRun>> = block
                .lines
                .iter()
                .map(|line| {
                    line.spans
                        .iter()
                        .filter_map(|span| read_run(span, block.bbox))
                        .collect::<Vec<_>>()
                })
                .filter(|runs| !runs.is_empty())
                .collect();
            if !lines.is_empty() {
                blocks.push((page, lines));
            }
        }
    }
    blocks
}

pub fn extract_spans<S: ContentSource + ?Sized>(source: &S) -> Vec<Span> {
    collect_runs(source)
        .into_iter()
        .flat_map(|(page, lines)| {
            lines.into_iter().flatten().map(move |run| Span {
                page,
                rect: run.rect,
                text: run.text,
                style: run.style,
            })
        })
        .collect()
}

/// Lines start with the mean of their run sizes and the leftmost run's font.
/// Runs are joined left to right whatever order the source lists them in.
pub fn extract_lines<S: ContentSource + ?Sized>(source: &S) -> Vec<Line> {
    let mut lines = Vec::new();
    for (page, block_lines) in collect_runs(source) {
        for mut runs in block_lines {
            runs.sort_by(|a, b| a.rect.x0.total_cmp(&b.rect.x0));
            let Some(rect) = union_all(runs.iter().map(|run| &run.rect)) else {
                continue;
            };
            let text = join_nonempty(runs.iter().map(|run| run.text.as_str()), " ");
            let mean = runs.iter().map(|run| run.style.fontsize).sum::<f32>() / runs.len() as f32;
            let mut style = runs[0].style.clone();
            style.fontsize = mean;
            lines.push(Line {
                page,
                rect,
                text,
                style,
            });
        }
    }
    lines
}

/// Blocks start with the median of their run sizes and the first run's font.
pub fn extract_blocks<S: ContentSource + ?Sized>(source: &S) -> Vec<Block> {
    let mut blocks = Vec::new();
    for (page, block_lines) in collect_runs(source) {
        let runs: Vec<&RawRun> = block_lines.iter().flatten().collect();
        let Some(rect) = union_all(runs.iter().map(|run| &run.rect)) else {
            continue;
        };
        let line_texts: Vec<String> = block_lines
            .iter()
            .map(|line| join_nonempty(line.iter().map(|run| run.text.as_str()), " "))
            .collect();
        let text = join_nonempty(line_texts.iter().map(String::as_str), "\n");
        if text.is_empty() {
            continue;
        }
        let sizes: Vec<f32> = runs.iter().map(|run| run.style.fontsize).collect();
        let mut style = runs[0].style.clone();
        if let Some(size) = median(&sizes) {
            style.fontsize = size;
        }
        blocks.push(Block {
            page,
            rect,
            text,
            style,
        });
    }
    blocks
}

pub fn extract_units<S: ContentSource + ?Sized>(source: &S, granularity: Granularity) -> Vec<Span> {
    match granularity {
        Granularity::Span => extract_spans(source),
        Granularity::Line => extract_lines(source),
        Granularity::Block => extract_blocks(source),
    }
}
