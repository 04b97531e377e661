//! End-to-end library workflows with a scripted AI.

use async_trait::async_trait;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use sbnotes::ai::NoteAi;
use sbnotes::combine::{CombineMode, CombineOutcome};
use sbnotes::config::Config;
use sbnotes::extract::ExtractionMethod;
use sbnotes::models::NoteType;
use sbnotes::notebook::Notebook;
use sbnotes::store::NoteStore;
use sbnotes::upload::{UploadError, UploadRequest};

const LECTURE_TEXT: &str =
    "Lecture three covers projectile motion, air resistance and the range equation for launched bodies.";

const PHYSICS_REPLY: &str = r#"```json
{
  "summary": "Projectile motion with and without drag.",
  "key_topics": ["kinematics", "drag"],
  "important_concepts": ["range equation"],
  "difficulty_level": "Intermediate",
  "estimated_study_time": "2 hours",
  "related_topics": ["energy"],
  "transcription_quality": "Good"
}
```"#;

/// Scripted stand-in for the AI service.
struct ScriptedAi {
    transcription: Result<String, String>,
    replies: Mutex<Vec<Result<String, String>>>,
    transcribe_calls: AtomicUsize,
    complete_calls: AtomicUsize,
}

impl ScriptedAi {
    fn new(transcription: Result<&str, &str>, replies: Vec<Result<&str, &str>>) -> Arc<Self> {
        Arc::new(Self {
            transcription: transcription.map(str::to_string).map_err(str::to_string),
            replies: Mutex::new(
                replies
                    .into_iter()
                    .rev()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            transcribe_calls: AtomicUsize::new(0),
            complete_calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl NoteAi for ScriptedAi {
    async fn transcribe_pdf(&self, _pdf: &[u8]) -> anyhow::Result<String> {
        self.transcribe_calls.fetch_add(1, Ordering::SeqCst);
        self.transcription.clone().map_err(|e| anyhow::anyhow!(e))
    }

    async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.replies.lock().unwrap().pop();
        match next {
            Some(reply) => reply.map_err(|e| anyhow::anyhow!(e)),
            None => Ok(PHYSICS_REPLY.to_string()),
        }
    }
}

/// One-page PDF; `text` of `None` gives a page with no text layer.
fn write_pdf(path: &Path, text: Option<&str>) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let operations = match text {
        Some(text) => vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("Td", vec![50.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
        None => vec![
            Operation::new("re", vec![50.into(), 50.into(), 200.into(), 200.into()]),
            Operation::new("S", vec![]),
        ],
    };
    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

fn setup(ai: Arc<ScriptedAi>) -> (TempDir, Notebook) {
    let tmp = TempDir::new().unwrap();
    let config = Config::rooted_at(tmp.path());
    let notebook = Notebook::open(config).unwrap().with_ai(ai);
    (tmp, notebook)
}

fn source_pdf(tmp: &TempDir, name: &str, text: Option<&str>) -> PathBuf {
    let path = tmp.path().join(name);
    write_pdf(&path, text);
    path
}

fn request(source: PathBuf, class_name: &str, note_type: NoteType) -> UploadRequest {
    UploadRequest {
        source,
        class_name: class_name.to_string(),
        note_type,
    }
}

fn uploads_count(notebook: &Notebook) -> usize {
    std::fs::read_dir(&notebook.config().storage.uploads_dir)
        .unwrap()
        .count()
}

#[tokio::test]
async fn text_pdf_creates_physics_class() {
    let ai = ScriptedAi::new(Ok("unused"), vec![Ok(PHYSICS_REPLY)]);
    let (tmp, mut notebook) = setup(ai.clone());
    let source = source_pdf(&tmp, "lecture3.pdf", Some(LECTURE_TEXT));

    let outcome = notebook
        .upload(request(source, "Physics", NoteType::Notes))
        .await
        .unwrap();

    assert_eq!(outcome.method, ExtractionMethod::TextLayer);
    assert_eq!(ai.transcribe_calls.load(Ordering::SeqCst), 0);
    assert_eq!(ai.complete_calls.load(Ordering::SeqCst), 1);

    let note = &outcome.note;
    assert!(note.id.starts_with("Physics_"));
    assert_eq!(note.analysis.summary, "Projectile motion with and without drag.");
    assert!(note.text_preview.contains("projectile motion"));
    assert!(Path::new(&note.file_path).is_file());

    let data = notebook.data();
    let physics = &data.classes["Physics"];
    assert_eq!(physics.total_notes, 1);
    assert_eq!(physics.note_types.len(), 1);
    assert_eq!(physics.note_types["Notes"], 1);
}

#[tokio::test]
async fn scanned_pdf_falls_back_to_vision() {
    let ai = ScriptedAi::new(
        Ok("Handwritten notes on the chain rule and implicit differentiation."),
        vec![],
    );
    let (tmp, mut notebook) = setup(ai.clone());
    let source = source_pdf(&tmp, "scan.pdf", None);

    let outcome = notebook
        .upload(request(source, "Calculus", NoteType::Homework))
        .await
        .unwrap();

    assert_eq!(outcome.method, ExtractionMethod::Vision);
    assert_eq!(ai.transcribe_calls.load(Ordering::SeqCst), 1);
    assert!(outcome.note.text_preview.starts_with("Handwritten notes"));
    assert_eq!(notebook.data().classes["Calculus"].note_types["Homework"], 1);
}

#[tokio::test]
async fn empty_text_aborts_without_copying() {
    let ai = ScriptedAi::new(Ok("   "), vec![]);
    let (tmp, mut notebook) = setup(ai.clone());
    let source = source_pdf(&tmp, "blank.pdf", None);

    let err = notebook
        .upload(request(source, "Physics", NoteType::Notes))
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::NoText));
    assert_eq!(ai.complete_calls.load(Ordering::SeqCst), 0);
    assert!(notebook.data().notes.is_empty());
    assert!(notebook.data().classes.is_empty());
    assert_eq!(uploads_count(&notebook), 0);
}

#[tokio::test]
async fn failed_commit_removes_copied_pdf() {
    let ai = ScriptedAi::new(Ok("unused"), vec![Ok(PHYSICS_REPLY)]);
    let (tmp, mut notebook) = setup(ai.clone());
    let source = source_pdf(&tmp, "lecture3.pdf", Some(LECTURE_TEXT));
    // a directory in place of the store file makes the commit's read fail
    std::fs::create_dir_all(&notebook.config().storage.notes_file).unwrap();

    let err = notebook
        .upload(request(source.clone(), "Physics", NoteType::Notes))
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Storage(_)));
    assert!(!err.is_user_error());
    assert_eq!(ai.complete_calls.load(Ordering::SeqCst), 1);
    assert_eq!(uploads_count(&notebook), 0);
    assert!(notebook.data().notes.is_empty());
    assert!(source.is_file());
}

#[tokio::test]
async fn vision_failure_is_stored_as_degraded_note() {
    let ai = ScriptedAi::new(Err("service overloaded"), vec![]);
    let (tmp, mut notebook) = setup(ai);
    let source = source_pdf(&tmp, "scan.pdf", None);

    let outcome = notebook
        .upload(request(source, "Biology", NoteType::Exam))
        .await
        .unwrap();

    assert_eq!(outcome.method, ExtractionMethod::Failed);
    assert!(outcome
        .note
        .text_preview
        .starts_with("PDF document processing failed"));
    assert_eq!(notebook.data().notes.len(), 1);
}

#[tokio::test]
async fn analysis_failures_still_store_the_note() {
    let ai = ScriptedAi::new(
        Ok("unused"),
        vec![Ok("This is prose, not JSON at all."), Err("timeout")],
    );
    let (tmp, mut notebook) = setup(ai);

    let prose = notebook
        .upload(request(
            source_pdf(&tmp, "a.pdf", Some(LECTURE_TEXT)),
            "Physics",
            NoteType::Notes,
        ))
        .await
        .unwrap();
    assert!(prose.note.analysis.summary.starts_with("This is prose"));
    assert_eq!(prose.note.analysis.key_topics, vec!["Extracted from AI analysis"]);

    let failed = notebook
        .upload(request(
            source_pdf(&tmp, "b.pdf", Some(LECTURE_TEXT)),
            "Physics",
            NoteType::Exam,
        ))
        .await
        .unwrap();
    assert_eq!(failed.note.analysis.summary, "AI analysis failed");
    assert_eq!(failed.note.analysis.transcription_quality, "Failed");

    assert_eq!(notebook.data().classes["Physics"].total_notes, 2);
}

#[tokio::test]
async fn library_stays_consistent_and_searchable() {
    let ai = ScriptedAi::new(Ok("unused"), vec![]);
    let (tmp, mut notebook) = setup(ai);

    for (i, (class, note_type)) in [
        ("Physics", NoteType::Notes),
        ("Physics", NoteType::Notes),
        ("Calculus", NoteType::StudyPrep),
        ("Physics", NoteType::Exam),
    ]
    .into_iter()
    .enumerate()
    {
        let source = source_pdf(&tmp, &format!("n{}.pdf", i), Some(LECTURE_TEXT));
        notebook
            .upload(request(source, class, note_type))
            .await
            .unwrap();

        let data = notebook.data();
        for (name, aggregate) in &data.classes {
            let count = data.notes.iter().filter(|n| &n.class_name == name).count() as u64;
            assert_eq!(aggregate.total_notes, count);
        }
    }

    let ids: std::collections::HashSet<_> = notebook.data().notes.iter().map(|n| &n.id).collect();
    assert_eq!(ids.len(), 4);
    assert_eq!(uploads_count(&notebook), 4);

    assert_eq!(notebook.search("drag", None).len(), 4);
    assert_eq!(notebook.search("study prep", None).len(), 1);
    assert!(notebook.search("quantum", None).is_empty());

    let reopened = NoteStore::open(notebook.config().storage.notes_file.clone()).unwrap();
    assert_eq!(reopened.data(), notebook.data());
}

#[tokio::test]
async fn combine_interleaves_dividers_with_originals() {
    let ai = ScriptedAi::new(Ok("unused"), vec![]);
    let (tmp, mut notebook) = setup(ai);

    for i in 0..3 {
        let source = source_pdf(&tmp, &format!("day{}.pdf", i), Some(LECTURE_TEXT));
        notebook
            .upload(request(source, "Physics", NoteType::Notes))
            .await
            .unwrap();
    }

    match notebook.combine("Physics", CombineMode::WithDividers).unwrap() {
        CombineOutcome::Written { path, notes, pages, missing } => {
            assert_eq!(notes, 3);
            assert_eq!(pages, 6);
            assert!(missing.is_empty());
            assert!(path.ends_with("Physics_combined_notes.pdf"));
            assert_eq!(Document::load(&path).unwrap().get_pages().len(), 6);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }

    match notebook.combine("Physics", CombineMode::OriginalsOnly).unwrap() {
        CombineOutcome::Written { pages, .. } => assert_eq!(pages, 3),
        other => panic!("unexpected outcome: {:?}", other),
    }

    assert_eq!(
        notebook.combine("Chemistry", CombineMode::WithDividers).unwrap(),
        CombineOutcome::NoNotes
    );
}
