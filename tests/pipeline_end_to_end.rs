use pdf_translate_rust::fonts::FontResolver;
use pdf_translate_rust::geometry::Rect;
use pdf_translate_rust::model::Color;
use pdf_translate_rust::providers::Passthrough;
use pdf_translate_rust::render::RenderCommand;
use pdf_translate_rust::settings::Settings;
use pdf_translate_rust::{
    BatchTranslator, JsonDocument, Pipeline, RecordingRenderer, RunInputs, RunMode, StyleIndex,
};

const SCANNED: &str = r#"{
  "pages": [{
    "width": 300, "height": 400,
    "blocks": [{
      "bbox": [10, 20, 240, 52],
      "lines": [
        {"spans": [
          {"bbox": [10, 20, 100, 32], "text": "name", "size": 10},
          {"bbox": [150, 20, 240, 32], "text": "price", "size": 10}
        ]},
        {"spans": [
          {"bbox": [10, 40, 100, 52], "text": "total", "size": 10},
          {"bbox": [150, 40, 240, 52], "text": "qty", "size": 10}
        ]}
      ]
    }]
  }]
}"#;

// Same geometry, but the pre-OCR original carries the real color.
const ORIGINAL: &str = r#"{
  "pages": [{
    "width": 300, "height": 400,
    "blocks": [{
      "lines": [
        {"spans": [
          {"bbox": [10, 20, 100, 32], "text": "name", "size": 10, "color": 16711680},
          {"bbox": [150, 20, 240, 32], "text": "price", "size": 10, "color": 16711680}
        ]},
        {"spans": [
          {"bbox": [10, 40, 100, 52], "text": "total", "size": 10, "color": 16711680},
          {"bbox": [150, 40, 240, 52], "text": "qty", "size": 10, "color": 16711680}
        ]}
      ]
    }]
  }]
}"#;

#[tokio::test]
async fn hybrid_table_cells_land_in_their_columns() {
    let scanned: JsonDocument = serde_json::from_str(SCANNED).unwrap();
    let original: JsonDocument = serde_json::from_str(ORIGINAL).unwrap();
    let settings = Settings::default();
    let styles = StyleIndex::from_source(&original);
    let fonts = FontResolver::new(&settings.fonts);
    let translator = BatchTranslator::new(Passthrough, 4);
    let pipeline = Pipeline::new(&settings, &styles, &fonts, &translator);
    let mut renderer = RecordingRenderer::new();

    let summary = pipeline
        .run_mode(RunMode::Hybrid, &scanned, &mut renderer, RunInputs::default())
        .await
        .unwrap();
    assert_eq!(summary.units, 4);
    assert_eq!(summary.erased, 1);
    assert_eq!(summary.fitted, 4);
    assert_eq!(summary.overflowed, 0);

    let mut cells: Vec<(String, Rect, Color)> = renderer
        .commands(0)
        .iter()
        .filter_map(|command| match command {
            RenderCommand::TextBox {
                text, rect, color, ..
            } => Some((text.clone(), *rect, *color)),
            _ => None,
        })
        .collect();
    cells.sort_by(|a, b| a.0.cmp(&b.0));
    let texts: Vec<&str> = cells.iter().map(|(text, _, _)| text.as_str()).collect();
    assert_eq!(texts, vec!["name", "price", "qty", "total"]);

    // Cells are padded by max(1.2, 0.2 * 10) = 2 on every side.
    for (text, rect, color) in &cells {
        let left_column = matches!(text.as_str(), "name" | "total");
        let (x0, x1) = if left_column { (8.0, 102.0) } else { (148.0, 242.0) };
        assert_eq!((rect.x0, rect.x1), (x0, x1), "column for {}", text);
        assert_eq!(*color, Color::Rgb(1.0, 0.0, 0.0));
    }
    let name = &cells[0].1;
    assert_eq!((name.y0, name.y1), (18.0, 34.0));
}

#[tokio::test]
async fn line_mode_keeps_one_unit_per_line() {
    let scanned: JsonDocument = serde_json::from_str(SCANNED).unwrap();
    let settings = Settings::default();
    let styles = StyleIndex::from_source(&scanned);
    let fonts = FontResolver::new(&settings.fonts);
    let translator = BatchTranslator::new(Passthrough, 1);
    let pipeline = Pipeline::new(&settings, &styles, &fonts, &translator);
    let mut renderer = RecordingRenderer::new();

    let summary = pipeline
        .run_mode(RunMode::Line, &scanned, &mut renderer, RunInputs::default())
        .await
        .unwrap();
    assert_eq!(summary.units, 2);
    assert_eq!(summary.erased, 4);
    assert_eq!(summary.translated, 2);
}
