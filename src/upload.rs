//! The upload workflow.
//!
//! ```text
//! PathEntered ─▶ Validated ─▶ TextExtracted ─▶ Analyzed ─▶ Persisted
//!      │             │              │
//!      └── abort ────┴── abort ─────┘        (no state change)
//! ```
//!
//! Validation and empty-text failures abort before anything is copied.
//! Analysis never aborts. The PDF copy and the store commit happen last;
//! if the commit fails the copy is removed again.

use anyhow::Context;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ai::NoteAi;
use crate::analyze::analyze_notes;
use crate::config::Config;
use crate::extract::{extract_text, ExtractionMethod};
use crate::models::{now_timestamp, truncate_chars, NoteRecord, NoteType, StoreData};
use crate::store::NoteStore;

/// Characters of extracted text kept in `text_preview`.
pub const PREVIEW_CHARS: usize = 500;

/// Reasons an upload is rejected.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("File must be a PDF: {0}")]
    NotPdf(String),
    #[error("Please enter a class name")]
    MissingClassName,
    #[error("Could not extract text from PDF")]
    NoText,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl UploadError {
    /// True for errors caused by the request rather than the system.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, UploadError::Storage(_))
    }
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub source: PathBuf,
    pub class_name: String,
    pub note_type: NoteType,
}

#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub note: NoteRecord,
    pub method: ExtractionMethod,
}

/// Checks that `name` carries a `.pdf` extension (any case).
pub fn has_pdf_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// Validates the source path and class name.
pub fn validate(request: &UploadRequest) -> Result<String, UploadError> {
    if !request.source.is_file() {
        return Err(UploadError::NotFound(request.source.clone()));
    }
    let name = request.source.to_string_lossy();
    if !has_pdf_extension(&name) {
        return Err(UploadError::NotPdf(name.into_owned()));
    }
    let class_name = request.class_name.trim();
    if class_name.is_empty() {
        return Err(UploadError::MissingClassName);
    }
    Ok(class_name.to_string())
}

/// Runs the full workflow and returns the persisted record.
pub async fn upload_note(
    config: &Config,
    store: &mut NoteStore,
    ai: &dyn NoteAi,
    request: UploadRequest,
) -> Result<UploadOutcome, UploadError> {
    let class_name = validate(&request)?;

    tracing::info!(path = %request.source.display(), class = %class_name, "extracting text from PDF");
    let extraction = extract_text(&request.source, &config.extraction, ai).await;
    if extraction.text.trim().is_empty() {
        return Err(UploadError::NoText);
    }

    tracing::info!(class = %class_name, "analyzing notes with AI");
    let analysis = analyze_notes(
        ai,
        &extraction.text,
        request.note_type,
        &class_name,
        config.ai.max_prompt_chars,
    )
    .await;

    let timestamp = now_timestamp();
    let note_id = unique_note_id(store.data(), &class_name, &timestamp);

    std::fs::create_dir_all(&config.storage.uploads_dir).with_context(|| {
        format!(
            "Failed to create uploads directory: {}",
            config.storage.uploads_dir.display()
        )
    })?;
    let upload_path = config
        .storage
        .uploads_dir
        .join(format!("{}.pdf", file_stem_for(&note_id)));
    std::fs::copy(&request.source, &upload_path).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            request.source.display(),
            upload_path.display()
        )
    })?;

    let note = NoteRecord {
        id: note_id,
        class_name,
        note_type: request.note_type,
        upload_date: timestamp,
        file_path: upload_path.to_string_lossy().into_owned(),
        analysis,
        text_preview: truncate_chars(&extraction.text, PREVIEW_CHARS),
    };

    let upload_path_for_cleanup = upload_path.clone();
    let stored = match store.commit(move |data| {
        // another process may have taken the id since it was generated
        let mut note = note;
        if data.contains_id(&note.id) {
            note.id = unique_note_id(data, &note.class_name, &note.upload_date);
        }
        data.add_note(note.clone());
        note
    }) {
        Ok(note) => note,
        Err(e) => {
            if let Err(rm) = std::fs::remove_file(&upload_path_for_cleanup) {
                tracing::warn!(
                    path = %upload_path_for_cleanup.display(),
                    error = %rm,
                    "could not remove copied PDF"
                );
            }
            return Err(UploadError::Storage(e));
        }
    };

    Ok(UploadOutcome {
        note: stored,
        method: extraction.method,
    })
}

/// `{class}_{timestamp}`, suffixed `_2`, `_3`, ... while it collides.
pub fn unique_note_id(data: &StoreData, class_name: &str, timestamp: &str) -> String {
    let base = format!("{}_{}", class_name, timestamp);
    if !data.contains_id(&base) {
        return base;
    }
    (2..)
        .map(|n| format!("{}_{}", base, n))
        .find(|candidate| !data.contains_id(candidate))
        .unwrap_or(base)
}

/// Filesystem-safe form of a note id or class name.
pub fn file_stem_for(note_id: &str) -> String {
    note_id
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Analysis;
    use tempfile::TempDir;

    fn request(source: PathBuf, class_name: &str) -> UploadRequest {
        UploadRequest {
            source,
            class_name: class_name.to_string(),
            note_type: NoteType::Notes,
        }
    }

    #[test]
    fn validate_rejects_missing_file() {
        let err = validate(&request(PathBuf::from("/nope/notes.pdf"), "Physics")).unwrap_err();
        assert!(matches!(err, UploadError::NotFound(_)));
        assert!(err.is_user_error());
    }

    #[test]
    fn validate_rejects_non_pdf() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("notes.txt");
        std::fs::write(&path, "hello").unwrap();
        let err = validate(&request(path, "Physics")).unwrap_err();
        assert!(matches!(err, UploadError::NotPdf(_)));
    }

    #[test]
    fn validate_accepts_uppercase_extension_and_trims_class() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("SCAN.PDF");
        std::fs::write(&path, "%PDF").unwrap();
        assert_eq!(validate(&request(path.clone(), "  Physics ")).unwrap(), "Physics");
        assert!(matches!(
            validate(&request(path, "   ")).unwrap_err(),
            UploadError::MissingClassName
        ));
    }

    #[test]
    fn ids_get_suffix_on_collision() {
        let mut data = StoreData::default();
        let ts = "2025-01-01T10:00:00.000000";
        let first = unique_note_id(&data, "Physics", ts);
        assert_eq!(first, "Physics_2025-01-01T10:00:00.000000");
        data.add_note(NoteRecord {
            id: first.clone(),
            class_name: "Physics".to_string(),
            note_type: NoteType::Notes,
            upload_date: ts.to_string(),
            file_path: String::new(),
            analysis: Analysis::default(),
            text_preview: String::new(),
        });
        assert_eq!(unique_note_id(&data, "Physics", ts), format!("{}_2", first));
    }

    #[test]
    fn file_stem_replaces_separators() {
        assert_eq!(
            file_stem_for("AP Bio/Chem_2025-01-01T10:00:00.5"),
            "AP Bio_Chem_2025-01-01T10_00_00.5"
        );
    }
}
