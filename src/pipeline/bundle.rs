use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// `<dir>/<stem>.<label>.<ext>` for one sub-run of `output`.
pub fn labeled_output(output: &Path, label: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match output.extension() {
        Some(ext) => format!("{}.{}.{}", stem, label, ext.to_string_lossy()),
        None => format!("{}.{}", stem, label),
    };
    output.with_file_name(name)
}

pub fn bundle_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output.with_file_name(format!("{}_all_methods.zip", stem))
}

/// Zips the given files by base name. Missing files are logged and left out.
pub fn write_bundle(zip_path: &Path, files: &[(String, PathBuf)]) -> Result<usize> {
    if let Some(parent) = zip_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = File::create(zip_path)
        .with_context(|| format!("failed to create bundle: {}", zip_path.display()))?;
    let mut writer = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut written = 0;
    for (label, path) in files {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(err) => {
                warn!(label = %label, path = %path.display(), "missing output for bundle: {}", err);
                continue;
            }
        };
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| label.clone());
        writer
            .start_file(name, options)
            .with_context(|| "failed to write zip entry")?;
        writer
            .write_all(&data)
            .with_context(|| "failed to write zip entry content")?;
        written += 1;
    }
    writer
        .finish()
        .with_context(|| format!("failed to finish bundle: {}", zip_path.display()))?;
    Ok(written)
}
