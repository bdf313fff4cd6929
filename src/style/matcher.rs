use tracing::debug;

use crate::geometry::{Rect, area, center, center_distance, contains_point, iou};
use crate::model::{Span, StyleRecord};

use super::StyleIndex;

pub const SPAN_IOU_HIGH: f32 = 0.80;
pub const SPAN_IOU_LOW: f32 = 0.10;
pub const LINE_AGGREGATE_IOU: f32 = 0.5;
pub const BLOCK_AGGREGATE_IOU: f32 = 0.4;

#[derive(Debug, Clone, PartialEq)]
pub struct MatchSettings {
    pub span_iou_high: f32,
    pub span_iou_low: f32,
    pub line_iou: f32,
    pub block_iou: f32,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            span_iou_high: SPAN_IOU_HIGH,
            span_iou_low: SPAN_IOU_LOW,
            line_iou: LINE_AGGREGATE_IOU,
            block_iou: BLOCK_AGGREGATE_IOU,
        }
    }
}

/// Which rung of the ladder produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    StrongOverlap,
    Containment,
    WeakOverlap,
    Nearest,
}

/// Picks the style record for `rect` among `candidates`:
/// strong IoU, then the smallest record containing the centroid, then weak
/// IoU, then the nearest centroid. Ties keep the earlier candidate.
pub fn match_style<'a>(
    rect: &Rect,
    candidates: &'a [StyleRecord],
    settings: &MatchSettings,
) -> Option<(&'a StyleRecord, MatchKind)> {
    let mut best: Option<(&StyleRecord, f32)> = None;
    for candidate in candidates {
        let score = iou(rect, &candidate.bbox);
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((candidate, score));
        }
    }
    let (best, best_iou) = best?;
    if best_iou >= settings.span_iou_high {
        return Some((best, MatchKind::StrongOverlap));
    }

    let centroid = center(rect);
    let smallest_containing = candidates
        .iter()
        .filter(|candidate| contains_point(&candidate.bbox, centroid))
        .fold(None, |acc: Option<&StyleRecord>, candidate| match acc {
            Some(current) if area(&current.bbox) <= area(&candidate.bbox) => Some(current),
            _ => Some(candidate),
        });
    if let Some(record) = smallest_containing {
        return Some((record, MatchKind::Containment));
    }

    if best_iou >= settings.span_iou_low {
        return Some((best, MatchKind::WeakOverlap));
    }

    let nearest = candidates
        .iter()
        .fold(None, |acc: Option<(&StyleRecord, f32)>, candidate| {
            let distance = center_distance(rect, &candidate.bbox);
            match acc {
                Some((current, current_distance)) if current_distance <= distance => {
                    Some((current, current_distance))
                }
                _ => Some((candidate, distance)),
            }
        })?;
    Some((nearest.0, MatchKind::Nearest))
}

/// Copies the matched record's style onto every span. Spans on pages with
/// no records keep their extracted style.
pub fn transfer_span_styles(spans: &mut [Span], index: &StyleIndex, settings: &MatchSettings) {
    let mut matched = 0usize;
    for span in spans.iter_mut() {
        let candidates = index.candidates(span.page);
        if let Some((record, kind)) = match_style(&span.rect, candidates, settings) {
            span.style = record.style.clone();
            matched += 1;
            debug!(page = span.page, ?kind, "span style matched");
        }
    }
    debug!(matched, total = spans.len(), "span style transfer finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Color, TextFlags, TextStyle};

    fn record(rect: Rect, size: f32, color: Color) -> StyleRecord {
        StyleRecord {
            bbox: rect,
            style: TextStyle {
                fontsize: size,
                color,
                font: format!("Font{}", size),
                flags: TextFlags::empty(),
            },
        }
    }

    #[test]
    fn exact_bbox_adopts_record() {
        let rect = Rect::new(10.0, 10.0, 100.0, 22.0);
        let candidates = vec![
            record(Rect::new(0.0, 0.0, 50.0, 12.0), 9.0, Color::BLACK),
            record(rect, 14.0, Color::Rgb(1.0, 0.0, 0.0)),
        ];
        let (matched, kind) = match_style(&rect, &candidates, &MatchSettings::default()).unwrap();
        assert_eq!(kind, MatchKind::StrongOverlap);
        assert_eq!(matched.style.fontsize, 14.0);
        assert_eq!(matched.style.color, Color::Rgb(1.0, 0.0, 0.0));
    }

    #[test]
    fn nested_rect_prefers_smallest_container() {
        let query = Rect::new(48.0, 48.0, 52.0, 52.0);
        let candidates = vec![
            record(Rect::new(0.0, 0.0, 200.0, 200.0), 12.0, Color::BLACK),
            record(Rect::new(40.0, 40.0, 70.0, 70.0), 7.0, Color::BLACK),
        ];
        let (matched, kind) = match_style(&query, &candidates, &MatchSettings::default()).unwrap();
        assert_eq!(kind, MatchKind::Containment);
        assert_eq!(matched.style.fontsize, 7.0);
    }

    #[test]
    fn weak_overlap_without_containment_uses_best_iou() {
        let query = Rect::new(0.0, 0.0, 10.0, 10.0);
        let candidates = vec![
            record(Rect::new(6.0, 6.0, 30.0, 30.0), 8.0, Color::BLACK),
            record(Rect::new(7.0, 0.0, 17.0, 10.0), 10.0, Color::BLACK),
        ];
        let (matched, kind) = match_style(&query, &candidates, &MatchSettings::default()).unwrap();
        assert_eq!(kind, MatchKind::WeakOverlap);
        assert_eq!(matched.style.fontsize, 10.0);
    }

    #[test]
    fn disjoint_rect_falls_back_to_nearest_centroid() {
        let query = Rect::new(0.0, 0.0, 10.0, 10.0);
        let candidates = vec![
            record(Rect::new(300.0, 300.0, 310.0, 310.0), 20.0, Color::BLACK),
            record(Rect::new(30.0, 0.0, 40.0, 10.0), 9.5, Color::BLACK),
        ];
        let (matched, kind) = match_style(&query, &candidates, &MatchSettings::default()).unwrap();
        assert_eq!(kind, MatchKind::Nearest);
        assert_eq!(matched.style.fontsize, 9.5);
    }

    #[test]
    fn empty_candidates_keep_default_style() {
        let mut spans = vec![Span {
            page: 0,
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            text: "x".to_string(),
            style: TextStyle::default(),
        }];
        transfer_span_styles(&mut spans, &StyleIndex::default(), &MatchSettings::default());
        assert_eq!(spans[0].style, TextStyle::default());
        assert!(match_style(&spans[0].rect, &[], &MatchSettings::default()).is_none());
    }
}
