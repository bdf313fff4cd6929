use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::geometry::Rect;

/// Text already prepared by the caller, placed at a box in the caller's
/// coordinate space.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OverlayItem {
    pub page: usize,
    pub bbox: Rect,
    #[serde(default, alias = "translated_text")]
    pub text: String,
    #[serde(default)]
    pub fontsize: Option<f32>,
}

/// Maps caller coordinates onto the page: `x * scale_x + offset_x`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct OverlayTransform {
    pub scale_x: f32,
    pub scale_y: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Default for OverlayTransform {
    fn default() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl OverlayTransform {
    pub fn apply(&self, rect: &Rect) -> Rect {
        Rect::new(
            rect.x0 * self.scale_x + self.offset_x,
            rect.y0 * self.scale_y + self.offset_y,
            rect.x1 * self.scale_x + self.offset_x,
            rect.y1 * self.scale_y + self.offset_y,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlaySet {
    pub items: Vec<OverlayItem>,
    pub transform: OverlayTransform,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OverlayFile {
    Items(Vec<OverlayItem>),
    Wrapped {
        items: Vec<OverlayItem>,
        #[serde(default)]
        transform: OverlayTransform,
    },
}

impl OverlaySet {
    pub fn parse(content: &str) -> Result<Self> {
        let parsed: OverlayFile =
            serde_json::from_str(content).with_context(|| "failed to parse overlay items")?;
        Ok(match parsed {
            OverlayFile::Items(items) => Self {
                items,
                transform: OverlayTransform::default(),
            },
            OverlayFile::Wrapped { items, transform } => Self { items, transform },
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read overlay items: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid overlay file: {}", path.display()))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bare_list_and_wrapped_form() {
        let bare = OverlaySet::parse(
            r#"[{"page":0,"bbox":[10,10,50,20],"translated_text":"Total","fontsize":9}]"#,
        )
        .unwrap();
        assert_eq!(bare.items[0].text, "Total");
        assert_eq!(bare.items[0].fontsize, Some(9.0));
        assert_eq!(bare.transform, OverlayTransform::default());

        let wrapped = OverlaySet::parse(
            r#"{"transform":{"scale_x":0.5,"scale_y":0.5},"items":[{"page":1,"bbox":[0,0,4,4],"text":"x"}]}"#,
        )
        .unwrap();
        assert_eq!(wrapped.items[0].page, 1);
        assert_eq!(wrapped.items[0].fontsize, None);
        assert_eq!(wrapped.transform.scale_x, 0.5);
        assert_eq!(wrapped.transform.offset_y, 0.0);
    }

    #[test]
    fn transform_scales_then_offsets() {
        let transform = OverlayTransform {
            scale_x: 0.5,
            scale_y: 2.0,
            offset_x: 10.0,
            offset_y: -5.0,
        };
        assert_eq!(
            transform.apply(&Rect::new(20.0, 10.0, 40.0, 20.0)),
            Rect::new(20.0, 15.0, 30.0, 35.0)
        );
    }
}
