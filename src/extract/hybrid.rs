use anyhow::{Context, Result};
use tracing::debug;

use crate::analyzer::LayoutAnalyzer;
use crate::geometry::{Rect, center, contains_point, union_all};
use crate::model::{HybridBlock, HybridLine, HybridSegment, TextStyle};
use crate::source::{ContentSource, RawLine, RawPage};
use crate::style::median;
use crate::table::{Run, TableSettings, split_segments};

use super::text::{collapse_whitespace, join_nonempty, span_rect, span_size, span_text};

/// One block per raw block, lines split into segments at wide gaps.
pub fn extract_hybrid_raw<S: ContentSource + ?Sized>(
    source: &S,
    settings: &TableSettings,
) -> Vec<HybridBlock> {
    let mut blocks = Vec::new();
    for page in 0..source.page_count() {
        let Some(raw) = source.raw_page(page) else {
            continue;
        };
        for raw_block in &raw.blocks {
            let line_runs: Vec<Vec<Run>> = raw_block
                .lines
                .iter()
                .map(|line| {
                    line.spans
                        .iter()
                        .filter_map(|span| {
                            let text = span_text(span);
                            if text.is_empty() {
                                return None;
                            }
                            Some(Run {
                                rect: span_rect(span, raw_block.bbox)?,
                                text,
                                size: span_size(span),
                            })
                        })
                        .collect::<Vec<_>>()
                })
                .filter(|runs| !runs.is_empty())
                .collect();
            let Some(rect) = raw_block
                .bbox
                .or_else(|| union_all(line_runs.iter().flatten().map(|run| &run.rect)))
            else {
                continue;
            };
            let gap = settings.segment_gap(rect.width());
            let lines: Vec<HybridLine> = line_runs
                .into_iter()
                .filter_map(|runs| build_line(runs, |runs| split_segments(runs, gap)))
                .collect();
            if let Some(block) = build_block(page, rect, lines) {
                blocks.push(block);
            }
        }
    }
    blocks
}

/// Blocks from analyzer regions. Each page is rasterized at `dpi`, regions
/// are scaled from pixels to page units and raw text is clipped to them by
/// glyph centroid. Every line becomes a single segment.
pub fn extract_hybrid_ai<S, A>(source: &S, analyzer: &A, dpi: u32) -> Result<Vec<HybridBlock>>
where
    S: ContentSource + ?Sized,
    A: LayoutAnalyzer + ?Sized,
{
    let mut blocks = Vec::new();
    for page in 0..source.page_count() {
        let Some(raw) = source.raw_page(page) else {
            continue;
        };
        let image = source
            .render_to_image(page, dpi)
            .with_context(|| format!("failed to rasterize page {}", page))?;
        let regions = analyzer
            .analyze_page(&image)
            .with_context(|| format!("layout analysis failed on page {}", page))?;
        let scale_x = raw.width / image.width.max(1) as f32;
        let scale_y = raw.height / image.height.max(1) as f32;
        debug!(page, regions = regions.len(), scale_x, scale_y, "layout regions");

        for region in regions {
            let rect = Rect::new(
                region.x0 * scale_x,
                region.y0 * scale_y,
                region.x1 * scale_x,
                region.y1 * scale_y,
            );
            let lines: Vec<HybridLine> = clip_lines(raw, &rect)
                .into_iter()
                .filter_map(|runs| build_line(runs, whole_line_segment))
                .collect();
            if let Some(block) = build_block(page, rect, lines) {
                blocks.push(block);
            }
        }
    }
    Ok(blocks)
}

fn clip_lines(raw: &RawPage, region: &Rect) -> Vec<Vec<Run>> {
    raw.blocks
        .iter()
        .flat_map(|block| block.lines.iter().map(move |line| (block.bbox, line)))
        .map(|(block_bbox, line)| clip_line(line, block_bbox, region))
        .filter(|runs| !runs.is_empty())
        .collect()
}

fn clip_line(line: &RawLine, block_bbox: Option<Rect>, region: &Rect) -> Vec<Run> {
    let mut runs = Vec::new();
    for span in &line.spans {
        let glyphs: Vec<_> = span.chars.iter().filter(|ch| ch.bbox.is_some()).collect();
        if glyphs.is_empty() {
            let Some(rect) = span_rect(span, block_bbox) else {
                continue;
            };
            let text = span_text(span);
            if !text.is_empty() && contains_point(region, center(&rect)) {
                runs.push(Run {
                    rect,
                    text,
                    size: span_size(span),
                });
            }
            continue;
        }
        let kept: Vec<_> = glyphs
            .into_iter()
            .filter(|ch| ch.bbox.is_some_and(|bbox| contains_point(region, center(&bbox))))
            .collect();
        let text = collapse_whitespace(&kept.iter().map(|ch| ch.c.as_str()).collect::<String>());
        if text.is_empty() {
            continue;
        }
        let Some(rect) = union_all(kept.iter().filter_map(|ch| ch.bbox.as_ref())) else {
            continue;
        };
        runs.push(Run {
            rect,
            text,
            size: span_size(span),
        });
    }
    runs
}

fn whole_line_segment(runs: Vec<Run>) -> Vec<HybridSegment> {
    let Some(rect) = union_all(runs.iter().map(|run| &run.rect)) else {
        return Vec::new();
    };
    vec![HybridSegment {
        rect,
        text: join_nonempty(runs.iter().map(|run| run.text.as_str()), " "),
        sizes: runs.iter().map(|run| run.size).collect(),
    }]
}

fn build_line<F>(mut runs: Vec<Run>, segment: F) -> Option<HybridLine>
where
    F: FnOnce(Vec<Run>) -> Vec<HybridSegment>,
{
    let rect = union_all(runs.iter().map(|run| &run.rect))?;
    runs.sort_by(|a, b| a.rect.x0.total_cmp(&b.rect.x0));
    let text = join_nonempty(runs.iter().map(|run| run.text.as_str()), " ");
    if text.is_empty() {
        return None;
    }
    Some(HybridLine {
        rect,
        text,
        segments: segment(runs),
    })
}

fn build_block(page: usize, rect: Rect, lines: Vec<HybridLine>) -> Option<HybridBlock> {
    if lines.is_empty() {
        return None;
    }
    let text = join_nonempty(lines.iter().map(|line| line.text.as_str()), "\n");
    let sizes: Vec<f32> = lines
        .iter()
        .flat_map(|line| line.segments.iter())
        .flat_map(|segment| segment.sizes.iter().copied())
        .collect();
    let mut style = TextStyle::default();
    if let Some(size) = median(&sizes) {
        style.fontsize = size;
    }
    Some(HybridBlock {
        page,
        rect,
        lines,
        text,
        style,
    })
}
