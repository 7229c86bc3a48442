//! Artifact packaging: annotated PDFs are zipped into one downloadable file.

use anyhow::{Context, Result};
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;
use zip::write::SimpleFileOptions;

/// Zips every file in `annotated_dir` into `dest`. Returns the number of
/// files packaged; zero files still produces a valid (empty) archive.
pub fn package_artifacts(annotated_dir: &Path, dest: &Path) -> Result<usize> {
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = std::fs::File::create(dest)
        .with_context(|| format!("Failed to create archive: {}", dest.display()))?;
    let mut archive = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut count = 0;
    let mut buffer = Vec::new();

    if annotated_dir.exists() {
        let mut entries: Vec<_> = std::fs::read_dir(annotated_dir)?
            .filter_map(std::result::Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .collect();
        entries.sort();

        for path in entries {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow::anyhow!("Unrepresentable file name: {}", path.display()))?;

            archive.start_file(name, options)?;

            buffer.clear();
            std::fs::File::open(&path)?.read_to_end(&mut buffer)?;
            archive.write_all(&buffer)?;
            count += 1;
        }
    }

    archive.finish()?;
    info!("Packaged {} files into {}", count, dest.display());

    Ok(count)
}
