//! Boundary to the document content model.
//!
//! A [`ContentSource`] hands out raw per-page text geometry and can rasterize
//! a page. [`JsonDocument`] implements it over a serialized text-layer dump so
//! the engine can run without linking a document library.

use anyhow::{Context, Result, anyhow};
use image::GenericImageView;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::geometry::Rect;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawChar {
    #[serde(default)]
    pub c: String,
    #[serde(default)]
    pub bbox: Option<Rect>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSpan {
    #[serde(default)]
    pub bbox: Option<Rect>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub chars: Vec<RawChar>,
    #[serde(default)]
    pub size: Option<f32>,
    #[serde(default)]
    pub font: Option<String>,
    #[serde(default)]
    pub flags: Option<u32>,
    #[serde(default)]
    pub color: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawLine {
    #[serde(default)]
    pub spans: Vec<RawSpan>,
}

/// A text block. Image blocks arrive without lines and are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawBlock {
    #[serde(default)]
    pub bbox: Option<Rect>,
    #[serde(default)]
    pub lines: Vec<RawLine>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPage {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub blocks: Vec<RawBlock>,
}

impl RawPage {
    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// A rasterized page. `data` holds encoded image bytes and may be empty when
/// only the pixel size is known.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub page: usize,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub mime: String,
}

pub trait ContentSource {
    fn page_count(&self) -> usize;
    fn raw_page(&self, page: usize) -> Option<&RawPage>;
    fn render_to_image(&self, page: usize, dpi: u32) -> Result<PageImage>;

    fn page_rect(&self, page: usize) -> Option<Rect> {
        self.raw_page(page).map(RawPage::rect)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageImageRef {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonPage {
    #[serde(flatten)]
    pub raw: RawPage,
    #[serde(default)]
    pub image: Option<PageImageRef>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonDocument {
    #[serde(default)]
    pub pages: Vec<JsonPage>,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl JsonDocument {
    pub fn new(pages: Vec<JsonPage>) -> Self {
        Self {
            pages,
            base_dir: None,
        }
    }

    pub fn from_pages(pages: Vec<RawPage>) -> Self {
        Self::new(
            pages
                .into_iter()
                .map(|raw| JsonPage { raw, image: None })
                .collect(),
        )
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read document: {}", path.display()))?;
        let mut doc: JsonDocument = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse document: {}", path.display()))?;
        doc.base_dir = path.parent().map(Path::to_path_buf);
        Ok(doc)
    }

    fn resolve_image_path(&self, path: &Path) -> PathBuf {
        match (&self.base_dir, path.is_relative()) {
            (Some(base), true) => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl ContentSource for JsonDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn raw_page(&self, page: usize) -> Option<&RawPage> {
        self.pages.get(page).map(|entry| &entry.raw)
    }

    fn render_to_image(&self, page: usize, dpi: u32) -> Result<PageImage> {
        let entry = self
            .pages
            .get(page)
            .ok_or_else(|| anyhow!("page {} out of range", page))?;
        if let Some(image_ref) = &entry.image {
            let path = self.resolve_image_path(&image_ref.path);
            let data = fs::read(&path)
                .with_context(|| format!("failed to read page image: {}", path.display()))?;
            let decoded = image::load_from_memory(&data)
                .with_context(|| format!("failed to decode page image: {}", path.display()))?;
            let (width, height) = decoded.dimensions();
            let mime = image::guess_format(&data)
                .map(|format| format.to_mime_type().to_string())
                .unwrap_or_else(|_| "image/png".to_string());
            return Ok(PageImage {
                page,
                width,
                height,
                data,
                mime,
            });
        }
        // No raster available: report the pixel size the page would have at `dpi`.
        let zoom = dpi as f32 / 72.0;
        Ok(PageImage {
            page,
            width: (entry.raw.width * zoom).round().max(1.0) as u32,
            height: (entry.raw.height * zoom).round().max(1.0) as u32,
            data: Vec::new(),
            mime: "image/png".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_text_layer_dump() {
        let doc: JsonDocument = serde_json::from_str(
            r#"{
                "pages": [{
                    "width": 612, "height": 792,
                    "blocks": [
                        {"bbox": [10, 10, 100, 30], "lines": [
                            {"spans": [{"bbox": [10, 10, 100, 30], "text": "Hello", "size": 12, "color": 0}]}
                        ]},
                        {"bbox": [0, 0, 50, 50]}
                    ]
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(doc.page_count(), 1);
        let page = doc.raw_page(0).unwrap();
        assert_eq!(page.blocks.len(), 2);
        assert!(page.blocks[1].lines.is_empty());
        assert_eq!(page.blocks[0].lines[0].spans[0].size, Some(12.0));
    }

    #[test]
    fn synthesizes_raster_size_without_image() {
        let doc = JsonDocument::from_pages(vec![RawPage {
            width: 72.0,
            height: 144.0,
            blocks: Vec::new(),
        }]);
        let image = doc.render_to_image(0, 150).unwrap();
        assert_eq!((image.width, image.height), (150, 300));
        assert!(image.data.is_empty());
        assert!(doc.render_to_image(3, 150).is_err());
    }

    #[test]
    fn page_image_mime_follows_its_encoding() {
        let dir = tempfile::tempdir().unwrap();
        image::RgbImage::new(8, 4)
            .save(dir.path().join("page.jpg"))
            .unwrap();
        let json = dir.path().join("doc.json");
        fs::write(
            &json,
            r#"{"pages": [{"width": 72, "height": 36, "image": {"path": "page.jpg"}}]}"#,
        )
        .unwrap();

        let doc = JsonDocument::load(&json).unwrap();
        let image = doc.render_to_image(0, 150).unwrap();
        assert_eq!((image.width, image.height), (8, 4));
        assert_eq!(image.mime, "image/jpeg");
    }
}
