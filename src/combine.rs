//! Combined class PDFs.
//!
//! Notes of one class are concatenated oldest first into
//! `{generated_dir}/{class}_combined_notes.pdf` (class name made
//! filesystem-safe), optionally with a
//! [divider](crate::divider) page before each note. Dividers are written as
//! transient PDFs in the output directory and removed once merged.

use anyhow::{Context, Result};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::divider::render_divider;
use crate::models::{NoteRecord, StoreData};
use crate::upload::file_stem_for;

/// Page attributes a page may inherit from its page-tree ancestors.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];
/// Guard against cyclic `Parent` chains in malformed files.
const MAX_TREE_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineMode {
    /// Divider page before every note (terminal).
    WithDividers,
    /// Original PDFs only (web).
    OriginalsOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CombineOutcome {
    /// The class has no notes; nothing was written.
    NoNotes,
    /// None of the originals could be read and no dividers were requested.
    NothingToCombine { missing: Vec<String> },
    Written {
        path: PathBuf,
        notes: usize,
        pages: usize,
        /// Ids of notes whose original PDF was missing or unreadable.
        missing: Vec<String>,
    },
}

/// File name of a class's combined PDF; path separators become `_`.
pub fn output_file_name(class_name: &str) -> String {
    format!("{}_combined_notes.pdf", file_stem_for(class_name))
}

/// Deterministic output path for a class, always directly inside
/// `generated_dir`.
pub fn output_path(config: &Config, class_name: &str) -> PathBuf {
    config
        .storage
        .generated_dir
        .join(output_file_name(class_name))
}

/// Notes of `class_name`, oldest first.
pub fn notes_for_class<'a>(data: &'a StoreData, class_name: &str) -> Vec<&'a NoteRecord> {
    let mut notes: Vec<&NoteRecord> = data
        .notes
        .iter()
        .filter(|n| n.class_name == class_name)
        .collect();
    notes.sort_by(|a, b| a.upload_date.cmp(&b.upload_date));
    notes
}

/// Builds the combined PDF for `class_name`.
pub fn combine_class_pdf(
    config: &Config,
    data: &StoreData,
    class_name: &str,
    mode: CombineMode,
) -> Result<CombineOutcome> {
    let notes = notes_for_class(data, class_name);
    if notes.is_empty() {
        tracing::info!(class = class_name, "no notes found for class");
        return Ok(CombineOutcome::NoNotes);
    }

    let out_dir = &config.storage.generated_dir;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    let mut documents = Vec::new();
    let mut missing = Vec::new();

    for (i, note) in notes.iter().enumerate() {
        if mode == CombineMode::WithDividers {
            documents.push(divider_via_temp_file(out_dir, note, i + 1)?);
        }

        match load_original(Path::new(&note.file_path)) {
            Ok(doc) => documents.push(doc),
            Err(e) => {
                tracing::warn!(note = %note.id, error = %e, "original PDF not found, skipping");
                missing.push(note.id.clone());
            }
        }
    }

    if documents.is_empty() {
        return Ok(CombineOutcome::NothingToCombine { missing });
    }

    let mut merged = merge_documents(documents)?;
    let pages = merged.get_pages().len();
    let path = output_path(config, class_name);
    merged
        .save(&path)
        .with_context(|| format!("Failed to write combined PDF: {}", path.display()))?;

    tracing::info!(class = class_name, path = %path.display(), pages, "generated combined PDF");
    Ok(CombineOutcome::Written {
        path,
        notes: notes.len(),
        pages,
        missing,
    })
}

fn load_original(path: &Path) -> Result<Document> {
    if !path.is_file() {
        anyhow::bail!("file not found: {}", path.display());
    }
    Document::load(path).with_context(|| format!("Failed to parse PDF: {}", path.display()))
}

/// Renders a divider, writes it as a temporary PDF next to the output and
/// reads it back for merging. The temp file is deleted on return.
fn divider_via_temp_file(out_dir: &Path, note: &NoteRecord, day: usize) -> Result<Document> {
    let mut divider = render_divider(note, day)?;
    let mut tmp = tempfile::Builder::new()
        .prefix("divider_")
        .suffix(".pdf")
        .tempfile_in(out_dir)
        .with_context(|| format!("Failed to create divider file in {}", out_dir.display()))?;
    divider.save_to(tmp.as_file_mut())?;
    tmp.as_file_mut().flush()?;
    Document::load(tmp.path()).context("Failed to reload divider page")
}

/// Concatenates the pages of `documents`, in order, into one document.
pub fn merge_documents(documents: Vec<Document>) -> Result<Document> {
    let mut merged = Document::with_version("1.5");
    let mut next_id = 1;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();

    for mut doc in documents {
        doc.renumber_objects_with(next_id);
        next_id = doc.max_id + 1;

        for (_, page_id) in doc.get_pages() {
            pages.push((page_id, flatten_page(&doc, page_id)?));
        }

        for (id, object) in doc.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
                _ => {
                    merged.objects.insert(id, object);
                }
            }
        }
    }

    if pages.is_empty() {
        anyhow::bail!("no pages to merge");
    }

    merged.max_id = next_id - 1;
    let pages_id = merged.new_object_id();
    let kids: Vec<Object> = pages.iter().map(|(id, _)| Object::Reference(*id)).collect();
    let count = pages.len() as i64;

    for (id, mut page) in pages {
        page.set("Parent", pages_id);
        merged.objects.insert(id, Object::Dictionary(page));
    }
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", catalog_id);

    merged.renumber_objects();
    merged.compress();
    Ok(merged)
}

/// Copies inherited attributes down onto the page so it survives being
/// moved under a new page tree.
fn flatten_page(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut page = doc.get_dictionary(page_id)?.clone();
    for key in INHERITABLE_KEYS {
        if page.has(key) {
            continue;
        }
        if let Some(value) = inherited_value(doc, &page, key) {
            page.set(key.to_vec(), value);
        }
    }
    Ok(page)
}

fn inherited_value(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(id) = parent {
        if depth >= MAX_TREE_DEPTH {
            break;
        }
        let node = doc.get_dictionary(id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }
    None
}
