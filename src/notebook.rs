//! The shared library surface used by both the terminal menu and the web
//! server.
//!
//! A [`Notebook`] owns the configuration, the [`NoteStore`] and (for
//! uploads) an AI client. Read operations work without an AI client, so
//! read-only CLI subcommands never need the API key.

use anyhow::Result;
use std::sync::Arc;

use crate::ai::NoteAi;
use crate::combine::{combine_class_pdf, CombineMode, CombineOutcome};
use crate::config::Config;
use crate::models::{NoteRecord, StoreData};
use crate::search::{filter_notes, search_notes, NoteFilter};
use crate::store::NoteStore;
use crate::upload::{upload_note, UploadError, UploadOutcome, UploadRequest};
use crate::view::{class_notes, class_overview, library_stats, ClassSummary, LibraryStats};

pub struct Notebook {
    config: Config,
    store: NoteStore,
    ai: Option<Arc<dyn NoteAi>>,
}

impl Notebook {
    /// Creates the storage directories and loads the store.
    pub fn open(config: Config) -> Result<Self> {
        config.ensure_dirs()?;
        let store = NoteStore::open(config.storage.notes_file.clone())?;
        tracing::debug!(
            path = %store.path().display(),
            notes = store.data().notes.len(),
            "opened note store"
        );
        Ok(Self {
            config,
            store,
            ai: None,
        })
    }

    /// Attaches the AI client used by [`Notebook::upload`].
    pub fn with_ai(mut self, ai: Arc<dyn NoteAi>) -> Self {
        self.ai = Some(ai);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn data(&self) -> &StoreData {
        self.store.data()
    }

    /// Picks up writes made by other processes.
    pub fn reload(&mut self) -> Result<()> {
        self.store.reload()
    }

    pub async fn upload(&mut self, request: UploadRequest) -> Result<UploadOutcome, UploadError> {
        let ai = match self.ai.clone() {
            Some(ai) => ai,
            None => return Err(UploadError::Storage(anyhow::anyhow!("no AI client configured"))),
        };
        upload_note(&self.config, &mut self.store, ai.as_ref(), request).await
    }

    pub fn search(&self, term: &str, limit: Option<usize>) -> Vec<&NoteRecord> {
        search_notes(&self.data().notes, term, limit)
    }

    pub fn filter(&self, filter: &NoteFilter) -> Vec<&NoteRecord> {
        filter_notes(&self.data().notes, filter)
    }

    pub fn overview(&self) -> Vec<ClassSummary> {
        class_overview(self.data())
    }

    pub fn class_notes(&self, class_name: &str) -> Vec<&NoteRecord> {
        class_notes(self.data(), class_name)
    }

    pub fn class_names(&self) -> Vec<String> {
        self.data().classes.keys().cloned().collect()
    }

    pub fn stats(&self) -> LibraryStats {
        library_stats(self.data())
    }

    pub fn combine(&self, class_name: &str, mode: CombineMode) -> Result<CombineOutcome> {
        combine_class_pdf(&self.config, self.data(), class_name, mode)
    }

    /// Recomputes class aggregates from the note list and persists them.
    /// Returns how many classes changed.
    pub fn reindex(&mut self) -> Result<usize> {
        self.store.commit(|data| data.rebuild_classes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Analysis, NoteType};
    use tempfile::TempDir;

    fn record(id: &str, class: &str) -> NoteRecord {
        NoteRecord {
            id: id.to_string(),
            class_name: class.to_string(),
            note_type: NoteType::Notes,
            upload_date: "2025-01-01T00:00:00.000000".to_string(),
            file_path: String::new(),
            analysis: Analysis::default(),
            text_preview: String::new(),
        }
    }

    #[test]
    fn open_creates_directories() {
        let tmp = TempDir::new().unwrap();
        let config = Config::rooted_at(tmp.path());
        let notebook = Notebook::open(config.clone()).unwrap();
        assert!(config.storage.uploads_dir.is_dir());
        assert!(config.storage.generated_dir.is_dir());
        assert!(notebook.data().notes.is_empty());
    }

    #[tokio::test]
    async fn upload_without_ai_is_refused() {
        let tmp = TempDir::new().unwrap();
        let mut notebook = Notebook::open(Config::rooted_at(tmp.path())).unwrap();
        let source = tmp.path().join("notes.pdf");
        std::fs::write(&source, "%PDF-1.4").unwrap();
        let err = notebook
            .upload(UploadRequest {
                source,
                class_name: "Physics".to_string(),
                note_type: NoteType::Notes,
            })
            .await
            .unwrap_err();
        assert!(!err.is_user_error());
    }

    #[test]
    fn reindex_repairs_hand_edited_aggregates() {
        let tmp = TempDir::new().unwrap();
        let config = Config::rooted_at(tmp.path());
        std::fs::create_dir_all(config.storage.notes_file.parent().unwrap()).unwrap();

        let mut data = StoreData::default();
        data.add_note(record("a", "Physics"));
        data.add_note(record("b", "Physics"));
        data.classes.get_mut("Physics").unwrap().total_notes = 7;
        crate::store::save(&config.storage.notes_file, &data).unwrap();

        let mut notebook = Notebook::open(config).unwrap();
        assert_eq!(notebook.reindex().unwrap(), 1);
        assert_eq!(notebook.data().classes["Physics"].total_notes, 2);
        assert_eq!(notebook.reindex().unwrap(), 0);
        assert_eq!(notebook.class_names(), vec!["Physics".to_string()]);
    }
}
