use std::path::Path;

use lopdf::Document;

use crate::error::Result;

/// Extract the raw text of every page in a PDF, in page order.
///
/// Returns one string per page, untouched by any normalization; the
/// chunker owns the cleanup. Pages without text content yield empty
/// strings.
pub fn extract_page_texts(path: &Path) -> Result<Vec<String>> {
    let document = Document::load(path)?;

    let mut pages = Vec::new();
    for (page_number, _) in document.get_pages() {
        pages.push(document.extract_text(&[page_number])?);
    }

    Ok(pages)
}
