use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to extract text from PDF {path}: {message}")]
    Pdf { path: PathBuf, message: String },

    #[error("no text could be extracted from {0}")]
    Empty(PathBuf),
}

/// Returns the plain text of an audit report. PDFs go through `pdf-extract`
/// on the blocking pool; anything else is read as UTF-8.
pub async fn read_document(path: &Path) -> Result<String, DocumentError> {
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

    let text = if is_pdf {
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || pdf_extract::extract_text(&owned))
            .await
            .map_err(|e| DocumentError::Pdf {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
            .map_err(|e| DocumentError::Pdf {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
    } else {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|source| DocumentError::Io {
                path: path.to_path_buf(),
                source,
            })?
    };

    if text.trim().is_empty() {
        return Err(DocumentError::Empty(path.to_path_buf()));
    }
    debug!("read {} characters from {}", text.len(), path.display());
    Ok(text)
}
