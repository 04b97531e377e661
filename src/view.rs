//! Dashboard aggregates: class overview, per-class drill-down and library
//! statistics.

use serde::Serialize;

use crate::models::{format_timestamp, NoteRecord, StoreData};

/// One row of the class overview table.
#[derive(Debug, Clone, Serialize)]
pub struct ClassSummary {
    pub class_name: String,
    pub total_notes: u64,
    /// `"Notes: 2, Exam: 1"`
    pub note_types: String,
    /// Date part of the last upload (`YYYY-MM-DD`).
    pub last_updated: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LibraryStats {
    pub total_notes: usize,
    pub total_classes: usize,
    pub latest_upload: Option<String>,
}

pub fn class_overview(data: &StoreData) -> Vec<ClassSummary> {
    data.classes
        .iter()
        .map(|(name, agg)| ClassSummary {
            class_name: name.clone(),
            total_notes: agg.total_notes,
            note_types: agg
                .note_types
                .iter()
                .map(|(t, c)| format!("{}: {}", t, c))
                .collect::<Vec<_>>()
                .join(", "),
            last_updated: format_timestamp(&agg.last_updated, "%Y-%m-%d"),
        })
        .collect()
}

/// Notes of `class_name`, newest first.
pub fn class_notes<'a>(data: &'a StoreData, class_name: &str) -> Vec<&'a NoteRecord> {
    let mut notes: Vec<&NoteRecord> = data
        .notes
        .iter()
        .filter(|n| n.class_name == class_name)
        .collect();
    notes.sort_by(|a, b| b.upload_date.cmp(&a.upload_date));
    notes
}

pub fn library_stats(data: &StoreData) -> LibraryStats {
    LibraryStats {
        total_notes: data.notes.len(),
        total_classes: data.classes.len(),
        latest_upload: data
            .notes
            .iter()
            .map(|n| n.upload_date.as_str())
            .max()
            .map(|ts| format_timestamp(ts, "%Y-%m-%d")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Analysis, NoteType};

    fn add(data: &mut StoreData, class: &str, note_type: NoteType, date: &str) {
        data.add_note(NoteRecord {
            id: format!("{}_{}", class, date),
            class_name: class.to_string(),
            note_type,
            upload_date: date.to_string(),
            file_path: String::new(),
            analysis: Analysis::default(),
            text_preview: String::new(),
        });
    }

    #[test]
    fn overview_lists_counts_per_class() {
        let mut data = StoreData::default();
        add(&mut data, "Physics", NoteType::Notes, "2025-01-01T08:00:00.000000");
        add(&mut data, "Physics", NoteType::Exam, "2025-01-05T08:00:00.000000");
        add(&mut data, "Calculus", NoteType::Homework, "2025-01-03T08:00:00.000000");

        let rows = class_overview(&data);
        assert_eq!(rows.len(), 2);
        let physics = rows.iter().find(|r| r.class_name == "Physics").unwrap();
        assert_eq!(physics.total_notes, 2);
        assert_eq!(physics.note_types, "Exam: 1, Notes: 1");
        assert_eq!(physics.last_updated, "2025-01-05");
    }

    #[test]
    fn class_notes_newest_first() {
        let mut data = StoreData::default();
        add(&mut data, "Physics", NoteType::Notes, "2025-01-01T08:00:00.000000");
        add(&mut data, "Physics", NoteType::Exam, "2025-01-05T08:00:00.000000");
        add(&mut data, "Calculus", NoteType::Homework, "2025-01-03T08:00:00.000000");

        let notes = class_notes(&data, "Physics");
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].note_type, NoteType::Exam);
        assert!(class_notes(&data, "Chemistry").is_empty());
    }

    #[test]
    fn stats_on_empty_and_populated_store() {
        let mut data = StoreData::default();
        let empty = library_stats(&data);
        assert_eq!(empty.total_notes, 0);
        assert!(empty.latest_upload.is_none());

        add(&mut data, "Physics", NoteType::Notes, "2025-01-01T08:00:00.000000");
        add(&mut data, "Calculus", NoteType::Notes, "2025-02-01T08:00:00.000000");
        let stats = library_stats(&data);
        assert_eq!(stats.total_notes, 2);
        assert_eq!(stats.total_classes, 2);
        assert_eq!(stats.latest_upload.as_deref(), Some("2025-02-01"));
    }
}
