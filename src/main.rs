use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "pdf-translate-rust",
    version,
    about = "Translate a document's text layer in place, keeping its layout"
)]
struct Cli {
    /// Text-layer document (JSON pages/blocks/lines/spans)
    input: PathBuf,

    /// Original pre-OCR document used for styles (defaults to the input)
    #[arg(short = 'O', long = "original")]
    original: Option<PathBuf>,

    /// Run mode: span, line, block, hybrid, overlay or all
    #[arg(short = 'm', long = "mode", default_value = "hybrid")]
    mode: String,

    /// Output render plan path (all mode derives one file per method)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Translation provider: none, openai[:model] or ollama[:model]
    #[arg(short = 'p', long = "provider")]
    provider: Option<String>,

    /// API key (overrides environment variables)
    #[arg(short = 'k', long = "key")]
    key: Option<String>,

    /// Translation direction: hi->en, en->hi or auto
    #[arg(short = 'd', long = "direction")]
    direction: Option<String>,

    /// Translation requests in flight at once
    #[arg(short = 'c', long = "concurrency")]
    concurrency: Option<usize>,

    /// Layout regions JSON; hybrid mode clips text to these regions
    #[arg(long = "ai-layout")]
    ai_layout: Option<PathBuf>,

    /// Overlay items JSON for overlay mode
    #[arg(long = "overlay-items")]
    overlay_items: Option<PathBuf>,

    /// Write SVG/PNG page previews into this directory
    #[arg(long = "preview")]
    preview: Option<PathBuf>,

    /// Run ocrmypdf on this scanned PDF and report the OCR'd copy (the input JSON is still what gets translated)
    #[arg(long = "ocr")]
    ocr: Option<PathBuf>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    pdf_translate_rust::logging::init(cli.verbose)?;

    let output = pdf_translate_rust::run(pdf_translate_rust::Config {
        input: cli.input,
        original: cli.original,
        mode: cli.mode,
        output: cli.output,
        provider: cli.provider,
        key: cli.key,
        direction: cli.direction,
        concurrency: cli.concurrency,
        ai_layout: cli.ai_layout,
        overlay_items: cli.overlay_items,
        preview: cli.preview,
        ocr: cli.ocr,
        settings_path: cli.read_settings,
    })
    .await?;

    println!("{}", output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn ocr_help_says_input_is_still_translated() {
        let command = Cli::command();
        let ocr = command
            .get_arguments()
            .find(|arg| arg.get_id() == "ocr")
            .unwrap();
        let help = ocr.get_help().unwrap().to_string();
        assert!(help.contains("report the OCR'd copy"));
        assert!(help.contains("input JSON is still what gets translated"));
    }
}
