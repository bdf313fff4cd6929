use std::collections::HashMap;

use crate::geometry::{center, contains_point, iou};
use crate::model::{Color, Span, Styled};

/// Derives the style of coarser units from already-styled spans.
///
/// A span belongs to a unit when their IoU reaches `iou_threshold` or the
/// span's centroid lies inside the unit. Size is the median of the member
/// sizes, color the most frequent member color (first seen wins ties), and
/// font/flags come from the first member in extraction order.
pub fn aggregate_styles<T: Styled>(units: &mut [T], spans: &[Span], iou_threshold: f32) {
    let mut spans_by_page: HashMap<usize, Vec<&Span>> = HashMap::new();
    for span in spans {
        spans_by_page.entry(span.page).or_default().push(span);
    }

    for unit in units.iter_mut() {
        let Some(page_spans) = spans_by_page.get(&unit.page()) else {
            continue;
        };
        let rect = *unit.rect();
        let members: Vec<&Span> = page_spans
            .iter()
            .copied()
            .filter(|span| {
                iou(&rect, &span.rect) >= iou_threshold
                    || contains_point(&rect, center(&span.rect))
            })
            .collect();
        let Some(first) = members.first() else {
            continue;
        };

        let sizes: Vec<f32> = members.iter().map(|span| span.style.fontsize).collect();
        let colors: Vec<Color> = members.iter().map(|span| span.style.color).collect();
        let font = first.style.font.clone();
        let flags = first.style.flags;

        let style = unit.style_mut();
        if let Some(size) = median(&sizes) {
            style.fontsize = size;
        }
        if let Some(color) = most_frequent_color(&colors) {
            style.color = color;
        }
        style.font = font;
        style.flags = flags;
    }
}

/// Median with the two middle values averaged for even counts.
pub fn median(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

pub fn most_frequent_color(colors: &[Color]) -> Option<Color> {
    let mut counts: Vec<(Color, usize)> = Vec::new();
    for color in colors {
        match counts.iter_mut().find(|(seen, _)| seen == color) {
            Some((_, count)) => *count += 1,
            None => counts.push((*color, 1)),
        }
    }
    let mut best: Option<(Color, usize)> = None;
    for (color, count) in counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((color, count));
        }
    }
    best.map(|(color, _)| color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::model::{Line, TextFlags, TextStyle};

    fn span(rect: Rect, size: f32, color: Color, font: &str) -> Span {
        Span {
            page: 0,
            rect,
            text: "t".to_string(),
            style: TextStyle {
                fontsize: size,
                color,
                font: font.to_string(),
                flags: if font == "Bold" {
                    TextFlags::BOLD
                } else {
                    TextFlags::empty()
                },
            },
        }
    }

    #[test]
    fn median_handles_odd_and_even_counts() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0]), Some(2.5));
        assert_eq!(median(&[7.0]), Some(7.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn color_ties_keep_first_seen() {
        let red = Color::Rgb(1.0, 0.0, 0.0);
        let blue = Color::Rgb(0.0, 0.0, 1.0);
        assert_eq!(most_frequent_color(&[red, blue]), Some(red));
        assert_eq!(most_frequent_color(&[red, blue, blue]), Some(blue));
    }

    #[test]
    fn line_takes_aggregated_style_of_member_spans() {
        let red = Color::Rgb(1.0, 0.0, 0.0);
        let spans = vec![
            span(Rect::new(0.0, 0.0, 40.0, 10.0), 10.0, red, "Bold"),
            span(Rect::new(42.0, 0.0, 80.0, 10.0), 12.0, Color::BLACK, "Regular"),
            span(Rect::new(82.0, 0.0, 100.0, 10.0), 14.0, red, "Regular"),
            span(Rect::new(0.0, 50.0, 100.0, 60.0), 30.0, Color::BLACK, "Other"),
        ];
        let mut lines = vec![Line {
            page: 0,
            rect: Rect::new(0.0, 0.0, 100.0, 10.0),
            text: "line".to_string(),
            style: TextStyle::default(),
        }];
        aggregate_styles(&mut lines, &spans, 0.5);
        let style = &lines[0].style;
        assert_eq!(style.fontsize, 12.0);
        assert_eq!(style.color, red);
        assert_eq!(style.font, "Bold");
        assert_eq!(style.flags, TextFlags::BOLD);
    }

    #[test]
    fn unit_without_members_keeps_default_style() {
        let spans = vec![span(Rect::new(0.0, 0.0, 10.0, 10.0), 9.0, Color::BLACK, "A")];
        let mut lines = vec![Line {
            page: 0,
            rect: Rect::new(500.0, 500.0, 600.0, 510.0),
            text: "far".to_string(),
            style: TextStyle::default(),
        }];
        aggregate_styles(&mut lines, &spans, 0.5);
        assert_eq!(lines[0].style, TextStyle::default());
    }
}
