//! Column reconstruction from whitespace.
//!
//! Lines are split into segments at wide horizontal gaps; the segments'
//! x-ranges are merged into column bands, and translated segments are placed
//! into the band they overlap most.

use crate::geometry::{Rect, horizontal_overlap, union_all};
use crate::model::{HybridBlock, HybridLine, HybridSegment};

pub const SEGMENT_GAP_MIN_PT: f32 = 10.0;
pub const SEGMENT_GAP_BLOCK_RATIO: f32 = 0.12;
pub const MULTI_SEGMENT_LINE_RATIO: f32 = 0.30;
pub const MULTI_SEGMENT_MIN_LINES: usize = 2;
pub const BAND_MERGE_TOLERANCE_PT: f32 = 8.0;

#[derive(Debug, Clone, PartialEq)]
pub struct TableSettings {
    /// Gaps wider than `max(segment_gap_min, segment_gap_ratio * block width)` split a line.
    pub segment_gap_min: f32,
    pub segment_gap_ratio: f32,
    /// Share of lines that must carry two or more segments.
    pub multi_segment_line_ratio: f32,
    pub multi_segment_min_lines: usize,
    /// Two x-ranges closer than this belong to the same band.
    pub band_merge_tolerance: f32,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            segment_gap_min: SEGMENT_GAP_MIN_PT,
            segment_gap_ratio: SEGMENT_GAP_BLOCK_RATIO,
            multi_segment_line_ratio: MULTI_SEGMENT_LINE_RATIO,
            multi_segment_min_lines: MULTI_SEGMENT_MIN_LINES,
            band_merge_tolerance: BAND_MERGE_TOLERANCE_PT,
        }
    }
}

impl TableSettings {
    pub fn segment_gap(&self, block_width: f32) -> f32 {
        self.segment_gap_min
            .max(self.segment_gap_ratio * block_width.max(1.0))
    }
}

/// One text run of a line before segmentation.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub rect: Rect,
    pub text: String,
    pub size: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnBand {
    pub x0: f32,
    pub x1: f32,
}

/// Splits runs into left-to-right segments wherever the gap to the previous
/// run's right edge exceeds `gap`.
pub fn split_segments(mut runs: Vec<Run>, gap: f32) -> Vec<HybridSegment> {
    runs.sort_by(|a, b| a.rect.x0.total_cmp(&b.rect.x0));
    let mut segments = Vec::new();
    let mut current: Vec<Run> = Vec::new();
    let mut last_x1: Option<f32> = None;

    for run in runs {
        if let Some(prev) = last_x1
            && run.rect.x0 - prev > gap
            && !current.is_empty()
        {
            segments.push(close_segment(std::mem::take(&mut current)));
        }
        last_x1 = Some(run.rect.x1);
        current.push(run);
    }
    if !current.is_empty() {
        segments.push(close_segment(current));
    }
    segments
}

fn close_segment(runs: Vec<Run>) -> HybridSegment {
    let rect = union_all(runs.iter().map(|run| &run.rect)).unwrap_or_default();
    let text = runs
        .iter()
        .map(|run| run.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    HybridSegment {
        rect,
        text,
        sizes: runs.iter().map(|run| run.size).collect(),
    }
}

pub fn is_table_like(block: &HybridBlock, settings: &TableSettings) -> bool {
    if block.lines.is_empty() {
        return false;
    }
    let multi = block
        .lines
        .iter()
        .filter(|line| line.segments.len() >= 2)
        .count();
    let required = settings
        .multi_segment_min_lines
        .max((settings.multi_segment_line_ratio * block.lines.len() as f32).floor() as usize);
    if multi >= required {
        return true;
    }
    let ranges = segment_ranges(block);
    if ranges.is_empty() {
        return false;
    }
    merge_bands(ranges, settings.band_merge_tolerance).len() >= 2
}

/// Column bands of a block, sorted left to right. A block without segments
/// is a single band spanning its rect.
pub fn build_columns(block: &HybridBlock, settings: &TableSettings) -> Vec<ColumnBand> {
    let ranges = segment_ranges(block);
    if ranges.is_empty() {
        return vec![ColumnBand {
            x0: block.rect.x0,
            x1: block.rect.x1,
        }];
    }
    merge_bands(ranges, settings.band_merge_tolerance)
}

fn segment_ranges(block: &HybridBlock) -> Vec<(f32, f32)> {
    block
        .lines
        .iter()
        .flat_map(|line| line.segments.iter())
        .map(|segment| (segment.rect.x0, segment.rect.x1))
        .collect()
}

pub fn merge_bands(mut ranges: Vec<(f32, f32)>, tolerance: f32) -> Vec<ColumnBand> {
    ranges.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    let mut bands: Vec<ColumnBand> = Vec::new();
    for (x0, x1) in ranges {
        match bands.last_mut() {
            Some(last) if x0 <= last.x1 + tolerance => last.x1 = last.x1.max(x1),
            _ => bands.push(ColumnBand { x0, x1 }),
        }
    }
    bands
}

/// Cell rect for a segment: x-range of the band it overlaps most (first band
/// on ties), y-range of its line.
pub fn place_segment(columns: &[ColumnBand], segment: &HybridSegment, line: &HybridLine) -> Rect {
    let mut best: Option<(ColumnBand, f32)> = None;
    for band in columns {
        let overlap = horizontal_overlap(segment.rect.x0, segment.rect.x1, band.x0, band.x1);
        if best.is_none_or(|(_, score)| overlap > score) {
            best = Some((*band, overlap));
        }
    }
    match best {
        Some((band, _)) => Rect::new(band.x0, line.rect.y0, band.x1, line.rect.y1),
        None => Rect::new(segment.rect.x0, line.rect.y0, segment.rect.x1, line.rect.y1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TextStyle;

    fn run(x0: f32, x1: f32, y0: f32, text: &str) -> Run {
        Run {
            rect: Rect::new(x0, y0, x1, y0 + 10.0),
            text: text.to_string(),
            size: 10.0,
        }
    }

    fn line_from_runs(runs: Vec<Run>, gap: f32) -> HybridLine {
        let rect = union_all(runs.iter().map(|run| &run.rect)).unwrap();
        let text = runs
            .iter()
            .map(|r| r.text.clone())
            .collect::<Vec<_>>()
            .join(" ");
        HybridLine {
            rect,
            text,
            segments: split_segments(runs, gap),
        }
    }

    fn block(lines: Vec<HybridLine>, rect: Rect) -> HybridBlock {
        HybridBlock {
            page: 0,
            rect,
            text: lines
                .iter()
                .map(|l| l.text.clone())
                .collect::<Vec<_>>()
                .join("\n"),
            lines,
            style: TextStyle::default(),
        }
    }

    #[test]
    fn wide_gap_starts_a_new_segment() {
        let segments = split_segments(
            vec![run(120.0, 180.0, 0.0, "right"), run(0.0, 50.0, 0.0, "left"), run(52.0, 70.0, 0.0, "more")],
            10.0,
        );
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "left more");
        assert_eq!(segments[0].rect, Rect::new(0.0, 0.0, 70.0, 10.0));
        assert_eq!(segments[1].text, "right");
        assert_eq!(segments[1].sizes, vec![10.0]);
    }

    #[test]
    fn segment_gap_scales_with_block_width() {
        let settings = TableSettings::default();
        assert_eq!(settings.segment_gap(50.0), 10.0);
        assert!((settings.segment_gap(200.0) - 24.0).abs() < 1e-4);
    }

    #[test]
    fn three_two_column_lines_are_table_like() {
        let settings = TableSettings::default();
        let rect = Rect::new(0.0, 0.0, 200.0, 40.0);
        let gap = settings.segment_gap(rect.width());
        let lines = (0..3)
            .map(|i| {
                let y = i as f32 * 12.0;
                line_from_runs(vec![run(0.0, 60.0, y, "name"), run(120.0, 200.0, y, "value")], gap)
            })
            .collect::<Vec<_>>();
        assert!(lines.iter().all(|l| l.segments.len() == 2));
        assert!(is_table_like(&block(lines, rect), &settings));
    }

    #[test]
    fn aligned_single_segment_lines_are_not_table_like() {
        let settings = TableSettings::default();
        let rect = Rect::new(0.0, 0.0, 200.0, 40.0);
        let gap = settings.segment_gap(rect.width());
        let lines = (0..3)
            .map(|i| {
                let y = i as f32 * 12.0;
                line_from_runs(vec![run(0.0, 150.0 + i as f32 * 10.0, y, "prose")], gap)
            })
            .collect::<Vec<_>>();
        assert!(!is_table_like(&block(lines, rect), &settings));
        assert!(!is_table_like(&block(Vec::new(), rect), &settings));
    }

    #[test]
    fn bands_separated_by_twenty_points_stay_apart() {
        let bands = merge_bands(vec![(0.0, 50.0), (70.0, 120.0)], 8.0);
        assert_eq!(bands.len(), 2);
    }

    #[test]
    fn bands_within_tolerance_merge() {
        let bands = merge_bands(vec![(70.0, 120.0), (0.0, 50.0), (55.0, 80.0)], 8.0);
        assert_eq!(bands, vec![ColumnBand { x0: 0.0, x1: 120.0 }]);
    }

    #[test]
    fn block_without_segments_is_one_column() {
        let settings = TableSettings::default();
        let rect = Rect::new(5.0, 0.0, 95.0, 20.0);
        let columns = build_columns(&block(Vec::new(), rect), &settings);
        assert_eq!(columns, vec![ColumnBand { x0: 5.0, x1: 95.0 }]);
    }

    #[test]
    fn two_column_block_places_segment_into_left_band() {
        let settings = TableSettings::default();
        let rect = Rect::new(10.0, 0.0, 240.0, 30.0);
        let gap = settings.segment_gap(rect.width());
        let lines = vec![
            line_from_runs(vec![run(10.0, 100.0, 0.0, "left")], gap),
            line_from_runs(vec![run(150.0, 240.0, 15.0, "right")], gap),
        ];
        let block = block(lines, rect);
        assert!(is_table_like(&block, &settings));
        let columns = build_columns(&block, &settings);
        assert_eq!(
            columns,
            vec![
                ColumnBand { x0: 10.0, x1: 100.0 },
                ColumnBand { x0: 150.0, x1: 240.0 }
            ]
        );

        let segment = HybridSegment {
            rect: Rect::new(20.0, 15.0, 90.0, 25.0),
            text: "cell".to_string(),
            sizes: vec![10.0],
        };
        let cell = place_segment(&columns, &segment, &block.lines[1]);
        assert_eq!(cell, Rect::new(10.0, 15.0, 100.0, 25.0));
    }
}
