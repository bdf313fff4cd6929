use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use resvg::render;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tiny_skia::Pixmap;
use tracing::{info, warn};
use usvg::{Options, Tree, fontdb};

use super::{Align, PagePlan, RenderCommand, RenderPlan};
use crate::source::{ContentSource, PageImage};

/// SVG of one page in page units, optionally over the page raster.
pub fn render_page_svg(page: &PagePlan, background: Option<&PageImage>) -> String {
    let mut svg = String::new();
    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = page.width,
        h = page.height
    ));
    match background.filter(|image| !image.data.is_empty()) {
        Some(image) => {
            let data_uri = format!("data:{};base64,{}", image.mime, BASE64.encode(&image.data));
            svg.push_str(&format!(
                r#"<image href="{uri}" xlink:href="{uri}" x="0" y="0" width="{w}" height="{h}" preserveAspectRatio="none"/>"#,
                uri = data_uri,
                w = page.width,
                h = page.height
            ));
        }
        None => svg.push_str(&format!(
            r##"<rect x="0" y="0" width="{w}" height="{h}" fill="#ffffff"/>"##,
            w = page.width,
            h = page.height
        )),
    }

    for command in &page.commands {
        match command {
            RenderCommand::Fill { rect, color } => svg.push_str(&format!(
                r#"<rect x="{x}" y="{y}" width="{w}" height="{h}" fill="{fill}"/>"#,
                x = rect.x0,
                y = rect.y0,
                w = rect.width(),
                h = rect.height(),
                fill = color.to_hex()
            )),
            RenderCommand::TextBox {
                rect,
                font,
                size,
                line_height,
                color,
                align,
                lines,
                ..
            } => {
                let (x, anchor) = match align {
                    Align::Left => (rect.x0, "start"),
                    Align::Center => ((rect.x0 + rect.x1) / 2.0, "middle"),
                    Align::Right => (rect.x1, "end"),
                };
                svg.push_str(&format!(
                    r#"<text x="{x}" y="{y}" font-size="{size}" fill="{color}" font-family="{family}" text-anchor="{anchor}">"#,
                    x = x,
                    y = rect.y0 + size,
                    size = size,
                    color = color.to_hex(),
                    family = escape_xml(font),
                    anchor = anchor
                ));
                for (idx, line) in lines.iter().enumerate() {
                    let dy = if idx == 0 { 0.0 } else { *line_height };
                    svg.push_str(&format!(
                        r#"<tspan x="{x}" dy="{dy}">{text}</tspan>"#,
                        x = x,
                        dy = dy,
                        text = escape_xml(line)
                    ));
                }
                svg.push_str("</text>");
            }
            RenderCommand::Text {
                origin,
                text,
                font,
                size,
                color,
            } => svg.push_str(&format!(
                r#"<text x="{x}" y="{y}" font-size="{size}" fill="{color}" font-family="{family}">{text}</text>"#,
                x = origin.x,
                y = origin.y,
                size = size,
                color = color.to_hex(),
                family = escape_xml(font),
                text = escape_xml(text)
            )),
        }
    }
    svg.push_str("</svg>");
    svg
}

/// Rasterizes an SVG to PNG bytes with system fonts plus the given files.
pub fn render_svg_png(svg: &str, font_files: &[PathBuf]) -> Result<Vec<u8>> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    for path in font_files {
        if let Err(err) = db.load_font_file(path) {
            warn!("failed to load preview font {}: {}", path.display(), err);
        }
    }
    let options = Options {
        fontdb: Arc::new(db),
        ..Options::default()
    };
    let tree = Tree::from_str(svg, &options).with_context(|| "failed to parse SVG")?;
    let size = tree.size().to_int_size();
    let mut pixmap =
        Pixmap::new(size.width(), size.height()).ok_or_else(|| anyhow!("empty SVG size"))?;
    let mut pixmap_mut = pixmap.as_mut();
    render(&tree, tiny_skia::Transform::identity(), &mut pixmap_mut);
    let image = image::RgbaImage::from_raw(size.width(), size.height(), pixmap.data().to_vec())
        .ok_or_else(|| anyhow!("failed to build image buffer from SVG"))?;
    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut cursor, image::ImageFormat::Png)
        .with_context(|| "failed to encode PNG from SVG")?;
    Ok(bytes)
}

/// Writes `page-<n>.svg` and `page-<n>.png` for every page of the plan.
pub fn write_previews<S: ContentSource + ?Sized>(
    plan: &RenderPlan,
    source: &S,
    dir: &Path,
    dpi: u32,
    font_files: &[PathBuf],
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create preview dir: {}", dir.display()))?;
    let mut written = Vec::new();
    for page in &plan.pages {
        let background = match source.render_to_image(page.page, dpi) {
            Ok(image) => Some(image),
            Err(err) => {
                warn!(page = page.page, "no page raster for preview: {:#}", err);
                None
            }
        };
        let svg = render_page_svg(page, background.as_ref());
        let svg_path = dir.join(format!("page-{}.svg", page.page + 1));
        fs::write(&svg_path, &svg)
            .with_context(|| format!("failed to write preview: {}", svg_path.display()))?;
        written.push(svg_path);

        match render_svg_png(&svg, font_files) {
            Ok(png) => {
                let png_path = dir.join(format!("page-{}.png", page.page + 1));
                fs::write(&png_path, png)
                    .with_context(|| format!("failed to write preview: {}", png_path.display()))?;
                written.push(png_path);
            }
            Err(err) => warn!(page = page.page, "preview rasterization failed: {:#}", err),
        }
    }
    info!(files = written.len(), dir = %dir.display(), "previews written");
    Ok(written)
}

pub fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
