//! Substring search and structured filters over note records.
//!
//! Used by the terminal search prompt (`limit = Some(10)`), the `search`
//! subcommand, and the web browse page (no limit, plus class/type filters).

use crate::models::{NoteRecord, NoteType};

/// Result cap used by the terminal search.
pub const TERMINAL_RESULT_LIMIT: usize = 10;

/// Case-insensitive substring match against class, type, summary and
/// key topics.
pub fn matches_term(note: &NoteRecord, term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return false;
    }
    note.searchable_text().to_lowercase().contains(&needle)
}

/// Notes matching `term`, in store order, at most `limit` of them.
pub fn search_notes<'a>(
    notes: &'a [NoteRecord],
    term: &str,
    limit: Option<usize>,
) -> Vec<&'a NoteRecord> {
    notes
        .iter()
        .filter(|n| matches_term(n, term))
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

/// Browse filters; `None` means "all".
#[derive(Debug, Clone, Default)]
pub struct NoteFilter {
    pub class_name: Option<String>,
    pub note_type: Option<NoteType>,
    pub content: Option<String>,
}

impl NoteFilter {
    pub fn accepts(&self, note: &NoteRecord) -> bool {
        if let Some(ref class) = self.class_name {
            if &note.class_name != class {
                return false;
            }
        }
        if let Some(note_type) = self.note_type {
            if note.note_type != note_type {
                return false;
            }
        }
        match self.content.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => matches_term(note, term),
            _ => true,
        }
    }
}

/// All notes accepted by `filter`, in store order.
pub fn filter_notes<'a>(notes: &'a [NoteRecord], filter: &NoteFilter) -> Vec<&'a NoteRecord> {
    notes.iter().filter(|n| filter.accepts(n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Analysis;

    fn note(id: &str, class: &str, note_type: NoteType, summary: &str, topics: &[&str]) -> NoteRecord {
        NoteRecord {
            id: id.to_string(),
            class_name: class.to_string(),
            note_type,
            upload_date: "2025-01-01T00:00:00.000000".to_string(),
            file_path: format!("uploads/{}.pdf", id),
            analysis: Analysis {
                summary: summary.to_string(),
                key_topics: topics.iter().map(|s| s.to_string()).collect(),
                ..Analysis::default()
            },
            text_preview: "entropy appears only in the preview".to_string(),
        }
    }

    fn library() -> Vec<NoteRecord> {
        vec![
            note("a", "Physics", NoteType::Notes, "Projectile motion and drag.", &["kinematics"]),
            note("b", "Calculus", NoteType::Homework, "Chain rule drills.", &["derivatives"]),
            note("c", "Physics", NoteType::Exam, "Midterm review.", &["Thermodynamics"]),
        ]
    }

    #[test]
    fn term_only_in_summary_is_found() {
        let notes = library();
        let hits = search_notes(&notes, "DRAG", None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
    }

    #[test]
    fn topics_class_and_type_are_searchable() {
        let notes = library();
        assert_eq!(search_notes(&notes, "thermo", None)[0].id, "c");
        assert_eq!(search_notes(&notes, "physics", None).len(), 2);
        assert_eq!(search_notes(&notes, "homework", None)[0].id, "b");
    }

    #[test]
    fn absent_term_and_preview_only_terms_find_nothing() {
        let notes = library();
        assert!(search_notes(&notes, "quantum", None).is_empty());
        assert!(search_notes(&notes, "entropy", None).is_empty());
        assert!(search_notes(&notes, "   ", None).is_empty());
    }

    #[test]
    fn limit_keeps_store_order() {
        let notes: Vec<NoteRecord> = (0..15)
            .map(|i| note(&format!("n{}", i), "Biology", NoteType::Notes, "Cells.", &[]))
            .collect();
        let hits = search_notes(&notes, "biology", Some(TERMINAL_RESULT_LIMIT));
        assert_eq!(hits.len(), 10);
        assert_eq!(hits[0].id, "n0");
        assert_eq!(hits[9].id, "n9");
    }

    #[test]
    fn filters_combine() {
        let notes = library();
        let filter = NoteFilter {
            class_name: Some("Physics".to_string()),
            note_type: Some(NoteType::Exam),
            content: None,
        };
        let hits = filter_notes(&notes, &filter);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "c");

        let filter = NoteFilter {
            class_name: Some("Physics".to_string()),
            note_type: None,
            content: Some("motion".to_string()),
        };
        assert_eq!(filter_notes(&notes, &filter)[0].id, "a");
        assert_eq!(filter_notes(&notes, &NoteFilter::default()).len(), 3);
    }
}
