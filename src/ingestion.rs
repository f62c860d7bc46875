//! PDF ingestion: path validation, page extraction, and chunking.
//!
//! Validation runs over every path before any extraction starts, so a bad
//! argument fails the whole batch without leaving partial work behind.

use std::path::{Path, PathBuf};

use kdam::{tqdm, BarExt};
use tracing::debug;

use crate::{
    chunking::{self, ChunkingConfig, TextChunk},
    error::{Error, Result},
    pdf,
};

/// Check that a path points at an existing `.pdf` file.
pub fn validate_pdf_path(path: &Path) -> Result<()> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => {}
        other => {
            return Err(Error::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: other.unwrap_or_default().to_string(),
            });
        }
    }

    if !path.exists() {
        return Err(Error::NotFound {
            kind: "file",
            name: path.display().to_string(),
        });
    }

    Ok(())
}

/// Extract and chunk a batch of PDF documents.
///
/// All paths are validated up front; extraction only starts once the whole
/// batch passes. With `verbose` a progress bar tracks per-document
/// extraction.
pub fn extract_pdf_chunks(
    paths: &[PathBuf],
    config: &ChunkingConfig,
    verbose: bool,
) -> Result<Vec<TextChunk>> {
    for path in paths {
        validate_pdf_path(path)?;
    }

    let mut bar = verbose.then(|| tqdm!(total = paths.len(), desc = "Extracting PDFs"));

    let mut chunks = Vec::new();
    for path in paths {
        let pages = pdf::extract_page_texts(path)?;
        let extracted =
            chunking::chunk_pages(&path.to_string_lossy(), pages, config);
        debug!(
            path = %path.display(),
            chunks = extracted.len(),
            "extracted PDF document"
        );
        chunks.extend(extracted);

        if let Some(bar) = bar.as_mut() {
            let _ = bar.update(1);
        }
    }

    Ok(chunks)
}
