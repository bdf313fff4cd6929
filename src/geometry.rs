//! Rectangle algebra in page units.
//!
//! Everything here is a free function over [`Rect`] so the matching and
//! segmentation code never depends on a document library's own rectangle.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle `(x0, y0, x1, y1)` with `x0 <= x1` and `y0 <= y1`.
///
/// Serialized as a four-element array, the layout used by most text-layer
/// dumps.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Rect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl Rect {
    /// Builds a rect, swapping corners when they arrive reversed.
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }
}

impl From<[f32; 4]> for Rect {
    fn from(value: [f32; 4]) -> Self {
        Rect::new(value[0], value[1], value[2], value[3])
    }
}

impl From<Rect> for [f32; 4] {
    fn from(rect: Rect) -> Self {
        [rect.x0, rect.y0, rect.x1, rect.y1]
    }
}

pub fn area(rect: &Rect) -> f32 {
    rect.width().max(0.0) * rect.height().max(0.0)
}

pub fn center(rect: &Rect) -> Point {
    Point::new((rect.x0 + rect.x1) / 2.0, (rect.y0 + rect.y1) / 2.0)
}

/// Inclusive on every edge.
pub fn contains_point(rect: &Rect, point: Point) -> bool {
    rect.x0 <= point.x && point.x <= rect.x1 && rect.y0 <= point.y && point.y <= rect.y1
}

pub fn center_distance(a: &Rect, b: &Rect) -> f32 {
    let ca = center(a);
    let cb = center(b);
    ((ca.x - cb.x).powi(2) + (ca.y - cb.y).powi(2)).sqrt()
}

pub fn intersection(a: &Rect, b: &Rect) -> Option<Rect> {
    let ix0 = a.x0.max(b.x0);
    let iy0 = a.y0.max(b.y0);
    let ix1 = a.x1.min(b.x1);
    let iy1 = a.y1.min(b.y1);
    if ix1 <= ix0 || iy1 <= iy0 {
        return None;
    }
    Some(Rect {
        x0: ix0,
        y0: iy0,
        x1: ix1,
        y1: iy1,
    })
}

pub fn intersection_area(a: &Rect, b: &Rect) -> f32 {
    intersection(a, b).map(|rect| area(&rect)).unwrap_or(0.0)
}

pub fn iou(a: &Rect, b: &Rect) -> f32 {
    let inter = intersection_area(a, b);
    if inter <= 0.0 {
        return 0.0;
    }
    let union = (area(a) + area(b) - inter).max(1e-9);
    (inter / union).clamp(0.0, 1.0)
}

pub fn union(a: &Rect, b: &Rect) -> Rect {
    Rect {
        x0: a.x0.min(b.x0),
        y0: a.y0.min(b.y0),
        x1: a.x1.max(b.x1),
        y1: a.y1.max(b.y1),
    }
}

pub fn union_all<'a, I>(rects: I) -> Option<Rect>
where
    I: IntoIterator<Item = &'a Rect>,
{
    rects
        .into_iter()
        .fold(None, |acc: Option<Rect>, rect| match acc {
            Some(current) => Some(union(&current, rect)),
            None => Some(*rect),
        })
}

pub fn padded(rect: &Rect, pad: f32) -> Rect {
    Rect {
        x0: rect.x0 - pad,
        y0: rect.y0 - pad,
        x1: rect.x1 + pad,
        y1: rect.y1 + pad,
    }
}

/// Length of the shared x-range of `[a0, a1]` and `[b0, b1]`, zero when disjoint.
pub fn horizontal_overlap(a0: f32, a1: f32, b0: f32, b1: f32) -> f32 {
    (a1.min(b1) - a0.max(b0)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iou_is_symmetric_and_bounded() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 20.0, 12.0);
        let ab = iou(&a, &b);
        let ba = iou(&b, &a);
        assert!((ab - ba).abs() < 1e-6);
        assert!((0.0..=1.0).contains(&ab));
    }

    #[test]
    fn iou_of_identical_rects_is_one() {
        let a = Rect::new(3.0, 4.0, 30.0, 14.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn iou_of_disjoint_rects_is_zero() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 20.0, 10.0);
        assert_eq!(iou(&a, &b), 0.0);
        let c = Rect::new(50.0, 50.0, 60.0, 60.0);
        assert_eq!(iou(&a, &c), 0.0);
    }

    #[test]
    fn new_normalizes_reversed_corners() {
        let rect = Rect::new(10.0, 20.0, 0.0, 5.0);
        assert_eq!(rect, Rect::new(0.0, 5.0, 10.0, 20.0));
        assert_eq!(rect.width(), 10.0);
        assert_eq!(rect.height(), 15.0);
    }

    #[test]
    fn contains_point_includes_edges() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(contains_point(&rect, Point::new(10.0, 0.0)));
        assert!(!contains_point(&rect, Point::new(10.1, 5.0)));
    }

    #[test]
    fn union_all_covers_every_rect() {
        let rects = [
            Rect::new(5.0, 5.0, 10.0, 10.0),
            Rect::new(0.0, 7.0, 3.0, 20.0),
        ];
        assert_eq!(union_all(&rects), Some(Rect::new(0.0, 5.0, 10.0, 20.0)));
        assert_eq!(union_all(std::iter::empty::<&Rect>()), None);
    }

    #[test]
    fn rect_deserializes_from_array() {
        let rect: Rect = serde_json::from_str("[1, 2, 3, 4]").unwrap();
        assert_eq!(rect, Rect::new(1.0, 2.0, 3.0, 4.0));
        assert_eq!(serde_json::to_string(&rect).unwrap(), "[1.0,2.0,3.0,4.0]");
    }
}
