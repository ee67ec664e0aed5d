//! Local PDF text extraction.
//!
//! Uses pdf-extract; layout fidelity is whatever its heuristics give.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("PDF file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to extract text from {path}: {reason}")]
    Extract { path: PathBuf, reason: String },
}

/// Turns a document on disk into plain text.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<String, ExtractError>;
}

/// pdf-extract backed extractor
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl TextExtractor for PdfExtractor {
    fn extract(&self, path: &Path) -> Result<String, ExtractError> {
        if !path.is_file() {
            return Err(ExtractError::NotFound(path.to_path_buf()));
        }

        // pdf-extract panics on some malformed inputs
        let pages = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_by_pages(path)
        }))
        .map_err(|payload| ExtractError::Extract {
            path: path.to_path_buf(),
            reason: panic_message(payload.as_ref()),
        })?
        .map_err(|e| ExtractError::Extract {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        tracing::debug!(path = %path.display(), pages = pages.len(), "extracted PDF");
        Ok(join_pages(pages))
    }
}

/// Concatenate page texts in order, each followed by a newline.
pub fn join_pages<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut text = String::new();
    for page in pages {
        text.push_str(page.as_ref());
        text.push('\n');
    }
    text
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "PDF parser panicked".to_string()
    }
}
