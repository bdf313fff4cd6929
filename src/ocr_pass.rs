use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

const OCR_TOOL: &str = "ocrmypdf";

#[derive(Debug, Clone, PartialEq)]
pub struct OcrSettings {
    /// Tesseract language list, `+` separated.
    pub languages: String,
    pub dpi: u32,
    pub optimize: u8,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            languages: "hin+eng".to_string(),
            dpi: 1000,
            optimize: 3,
        }
    }
}

pub fn ocrmypdf_args(settings: &OcrSettings, input: &Path, output: &Path) -> Vec<String> {
    let dpi = settings.dpi.to_string();
    vec![
        "--language".to_string(),
        settings.languages.clone(),
        "--deskew".to_string(),
        "--rotate-pages".to_string(),
        "--force-ocr".to_string(),
        "--image-dpi".to_string(),
        dpi.clone(),
        "--oversample".to_string(),
        dpi,
        "--optimize".to_string(),
        settings.optimize.to_string(),
        input.to_string_lossy().into_owned(),
        output.to_string_lossy().into_owned(),
    ]
}

pub fn ocr_output_path(input: &Path, out_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    out_dir.join(format!("{}_ocr.pdf", stem))
}

fn run_ocrmypdf(settings: &OcrSettings, input: &Path, output: &Path) -> Result<()> {
    let output_result = Command::new(OCR_TOOL)
        .args(ocrmypdf_args(settings, input, output))
        .output()
        .with_context(|| format!("failed to run {}", OCR_TOOL))?;
    if !output_result.status.success() {
        let stderr = String::from_utf8_lossy(&output_result.stderr);
        return Err(anyhow!(
            "{} exited with {}: {}",
            OCR_TOOL,
            output_result.status,
            stderr.trim()
        ));
    }
    Ok(())
}

/// Runs the OCR pre-pass and returns the path to continue with. Any failure
/// is logged and the original input is returned instead.
pub fn run_ocr_pass(settings: &OcrSettings, input: &Path, out_dir: &Path) -> PathBuf {
    let output = ocr_output_path(input, out_dir);
    let result = std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))
        .and_then(|_| run_ocrmypdf(settings, input, &output));
    match result {
        Ok(()) => {
            info!(output = %output.display(), "ocr pre-pass finished");
            output
        }
        Err(err) => {
            warn!("ocr pre-pass skipped, using original input: {:#}", err);
            input.to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_ocrmypdf_command_line() {
        let args = ocrmypdf_args(
            &OcrSettings::default(),
            Path::new("in/scan.pdf"),
            Path::new("out/scan_ocr.pdf"),
        );
        insta::assert_snapshot!(args.join(" "), @"--language hin+eng --deskew --rotate-pages --force-ocr --image-dpi 1000 --oversample 1000 --optimize 3 in/scan.pdf out/scan_ocr.pdf");
    }

    #[test]
    fn output_lands_in_out_dir() {
        assert_eq!(
            ocr_output_path(Path::new("/docs/report.pdf"), Path::new("/tmp/run")),
            PathBuf::from("/tmp/run/report_ocr.pdf")
        );
    }

    #[test]
    fn missing_input_falls_back_to_original() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("missing.pdf");
        let settings = OcrSettings::default();
        assert_eq!(run_ocr_pass(&settings, &input, dir.path()), input);
    }
}
