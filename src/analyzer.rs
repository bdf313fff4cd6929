use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::geometry::Rect;
use crate::source::PageImage;

/// A layout-detection model: proposes text-region boxes for a rasterized
/// page, in the image's pixel space.
pub trait LayoutAnalyzer {
    fn analyze_page(&self, image: &PageImage) -> Result<Vec<Rect>>;
}

#[derive(Debug, Deserialize)]
struct RegionFile {
    pages: Vec<PageRegions>,
}

#[derive(Debug, Deserialize)]
struct PageRegions {
    page: usize,
    boxes: Vec<Rect>,
}

/// Replays regions produced ahead of time by an external detector.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedRegions {
    boxes: HashMap<usize, Vec<Rect>>,
}

impl PrecomputedRegions {
    pub fn new(boxes: HashMap<usize, Vec<Rect>>) -> Self {
        Self { boxes }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read regions: {}", path.display()))?;
        let parsed: RegionFile = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse regions: {}", path.display()))?;
        let mut boxes: HashMap<usize, Vec<Rect>> = HashMap::new();
        for entry in parsed.pages {
            boxes.entry(entry.page).or_default().extend(entry.boxes);
        }
        Ok(Self { boxes })
    }
}

impl LayoutAnalyzer for PrecomputedRegions {
    fn analyze_page(&self, image: &PageImage) -> Result<Vec<Rect>> {
        Ok(self.boxes.get(&image.page).cloned().unwrap_or_default())
    }
}
