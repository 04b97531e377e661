//! Terminal rendering shared by the interactive menu and the one-shot
//! subcommands.

use comfy_table::{Cell, Color, Table};

use crate::analyze::summary_excerpt;
use crate::combine::CombineOutcome;
use crate::extract::ExtractionMethod;
use crate::models::{format_timestamp, NoteRecord};
use crate::upload::UploadOutcome;
use crate::view::{ClassSummary, LibraryStats};

const SEARCH_SUMMARY_CHARS: usize = 100;
const CLASS_SUMMARY_CHARS: usize = 80;
const DATE_TIME: &str = "%Y-%m-%d %H:%M";

pub fn search_table(notes: &[&NoteRecord]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Class", "Type", "Date", "Summary"]);
    for note in notes {
        table.add_row(vec![
            Cell::new(&note.class_name).fg(Color::Cyan),
            Cell::new(note.note_type.label()).fg(Color::Magenta),
            Cell::new(format_timestamp(&note.upload_date, DATE_TIME)).fg(Color::Green),
            Cell::new(summary_excerpt(&note.analysis, SEARCH_SUMMARY_CHARS)),
        ]);
    }
    table
}

pub fn overview_table(rows: &[ClassSummary]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Class", "Total Notes", "Note Types", "Last Updated"]);
    for row in rows {
        table.add_row(vec![
            Cell::new(&row.class_name).fg(Color::Cyan),
            Cell::new(row.total_notes.to_string()).fg(Color::Magenta),
            Cell::new(&row.note_types).fg(Color::Green),
            Cell::new(&row.last_updated),
        ]);
    }
    table
}

pub fn class_table(notes: &[&NoteRecord]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "Type",
        "Date",
        "Summary",
        "Difficulty",
        "Study Time",
        "Quality",
    ]);
    for note in notes {
        let analysis = &note.analysis;
        table.add_row(vec![
            Cell::new(note.note_type.label()).fg(Color::Cyan),
            Cell::new(format_timestamp(&note.upload_date, DATE_TIME)).fg(Color::Magenta),
            Cell::new(summary_excerpt(analysis, CLASS_SUMMARY_CHARS)).fg(Color::Green),
            Cell::new(&analysis.difficulty_level).fg(Color::Yellow),
            Cell::new(&analysis.estimated_study_time),
            Cell::new(&analysis.transcription_quality).fg(Color::Blue),
        ]);
    }
    table
}

pub fn print_search_results(term: &str, notes: &[&NoteRecord]) {
    if notes.is_empty() {
        println!("No notes found matching your search");
        return;
    }
    println!("Search Results for '{}'", term);
    println!("{}", search_table(notes));
}

/// Prints the overview; returns false when the library is empty.
pub fn print_overview(rows: &[ClassSummary]) -> bool {
    if rows.is_empty() {
        println!("No notes uploaded yet");
        return false;
    }
    println!("Classes Overview");
    println!("{}", overview_table(rows));
    true
}

pub fn print_class_notes(class_name: &str, notes: &[&NoteRecord]) {
    if notes.is_empty() {
        println!("No notes found for {}", class_name);
        return;
    }
    println!("Notes for {}", class_name);
    println!("{}", class_table(notes));
}

pub fn print_upload(outcome: &UploadOutcome) {
    let note = &outcome.note;
    match outcome.method {
        ExtractionMethod::TextLayer => {}
        ExtractionMethod::Vision => println!("Text layer was empty; transcribed with AI vision."),
        ExtractionMethod::Failed => {
            println!("Warning: AI vision could not read the PDF; stored with placeholder text.")
        }
    }
    println!("Successfully uploaded notes for {}", note.class_name);
    println!("id:      {}", note.id);
    println!("file:    {}", note.file_path);
    println!("Summary: {}", note.analysis.summary);
}

pub fn print_combine(class_name: &str, outcome: &CombineOutcome) {
    match outcome {
        CombineOutcome::NoNotes => println!("No notes found for {}", class_name),
        CombineOutcome::NothingToCombine { missing } => {
            for id in missing {
                println!("Warning: Original PDF not found for {}", id);
            }
            println!("No pages to combine for {}", class_name);
        }
        CombineOutcome::Written {
            path,
            notes,
            pages,
            missing,
        } => {
            for id in missing {
                println!("Warning: Original PDF not found for {}", id);
            }
            println!(
                "Generated combined PDF: {} ({} notes, {} pages)",
                path.display(),
                notes,
                pages
            );
        }
    }
}

pub fn print_stats(stats: &LibraryStats) {
    println!("notes:         {}", stats.total_notes);
    println!("classes:       {}", stats.total_classes);
    println!(
        "latest upload: {}",
        stats.latest_upload.as_deref().unwrap_or("never")
    );
}
