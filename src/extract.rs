//! PDF text extraction with a vision fallback.
//!
//! The text layer is tried first. Scanned or handwritten notes usually have
//! no text layer (or a few stray characters), so anything at or below
//! `extraction.min_text_chars` is sent to the AI as a PDF document for
//! transcription instead. Extraction itself never fails: a failed
//! transcription comes back as a descriptive string.

use std::path::Path;
use thiserror::Error;

use crate::ai::NoteAi;
use crate::config::ExtractionConfig;

/// Prefix of the text returned when the vision transcription fails.
pub const VISION_FAILURE_PREFIX: &str = "PDF document processing failed";

/// Which path produced the extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    TextLayer,
    Vision,
    /// The vision call failed; `text` holds the failure message.
    Failed,
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub text: String,
    pub method: ExtractionMethod,
}

/// Text-layer extraction error.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("could not read PDF: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    #[error("PDF parser panicked")]
    Panicked,
}

/// Extracts text from the PDF at `path`, falling back to AI transcription.
pub async fn extract_text(path: &Path, config: &ExtractionConfig, ai: &dyn NoteAi) -> Extraction {
    let owned = path.to_path_buf();
    let primary = tokio::task::spawn_blocking(move || extract_text_layer(&owned))
        .await
        .unwrap_or(Err(ExtractError::Panicked));

    match primary {
        Ok(text) if text.trim().chars().count() > config.min_text_chars => {
            tracing::debug!(path = %path.display(), chars = text.len(), "text layer extracted");
            return Extraction {
                text,
                method: ExtractionMethod::TextLayer,
            };
        }
        Ok(_) => {
            tracing::warn!(
                path = %path.display(),
                "text layer empty or too short; using AI vision to read scanned notes"
            );
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "traditional extraction failed; falling back to AI vision"
            );
        }
    }

    extract_with_vision(path, ai).await
}

/// Reads every page's text layer; blank pages are dropped and each kept
/// page is followed by a newline.
pub fn extract_text_layer(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path)?;
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(&bytes))
        .map_err(|_| ExtractError::Panicked)?
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;

    let mut text = String::new();
    for page in pages {
        if !page.trim().is_empty() {
            text.push_str(&page);
            text.push('\n');
        }
    }
    Ok(text)
}

/// Sends the raw PDF to the AI for transcription.
pub async fn extract_with_vision(path: &Path, ai: &dyn NoteAi) -> Extraction {
    let result = match tokio::fs::read(path).await {
        Ok(bytes) => ai.transcribe_pdf(&bytes).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(text) => Extraction {
            text,
            method: ExtractionMethod::Vision,
        },
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "PDF document processing failed");
            Extraction {
                text: format!("{}: {}", VISION_FAILURE_PREFIX, e),
                method: ExtractionMethod::Failed,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FakeVision {
        reply: Option<String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl NoteAi for FakeVision {
        async fn transcribe_pdf(&self, _pdf: &[u8]) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .clone()
                .ok_or_else(|| anyhow::anyhow!("connection refused"))
        }

        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            unreachable!("extraction never calls complete")
        }
    }

    #[tokio::test]
    async fn unparseable_file_routes_to_vision() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("scan.pdf");
        std::fs::write(&path, b"not really a pdf").unwrap();
        let ai = FakeVision {
            reply: Some("Page 1: handwritten kinematics".to_string()),
            calls: AtomicUsize::new(0),
        };

        let out = extract_text(&path, &ExtractionConfig::default(), &ai).await;
        assert_eq!(out.method, ExtractionMethod::Vision);
        assert_eq!(out.text, "Page 1: handwritten kinematics");
        assert_eq!(ai.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn vision_failure_becomes_message() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("scan.pdf");
        std::fs::write(&path, b"garbage").unwrap();
        let ai = FakeVision {
            reply: None,
            calls: AtomicUsize::new(0),
        };

        let out = extract_text(&path, &ExtractionConfig::default(), &ai).await;
        assert_eq!(out.method, ExtractionMethod::Failed);
        assert!(out.text.starts_with(VISION_FAILURE_PREFIX));
        assert!(out.text.contains("connection refused"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = extract_text_layer(Path::new("/definitely/not/here.pdf")).unwrap_err();
        assert!(matches!(err, ExtractError::Io(_)));
        assert!(err.to_string().starts_with("could not read PDF: "));
    }
}
