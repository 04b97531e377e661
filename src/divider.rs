//! One-page divider PDFs placed before each note in a combined class PDF.
//!
//! Layout (A4, Helvetica):
//!
//! ```text
//!            Day 3 Notes: Physics
//! Type: Homework
//! Date: 2025-02-03 14:20
//!
//! AI Analysis Summary:
//! <summary, word-wrapped>
//!
//! Key Topics:
//! - topic 1 ... topic 5
//! ```

use anyhow::Result;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::models::{format_timestamp, NoteRecord};

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 56.0;
const SUMMARY_WRAP_COLUMNS: usize = 90;
/// Key topics listed on a divider.
pub const MAX_TOPICS: usize = 5;

struct Line {
    font: &'static str,
    size: f32,
    text: String,
    centered: bool,
    /// Extra space above this line.
    gap: f32,
}

impl Line {
    fn new(font: &'static str, size: f32, text: impl Into<String>) -> Self {
        Self {
            font,
            size,
            text: text.into(),
            centered: false,
            gap: 0.0,
        }
    }

    fn centered(mut self) -> Self {
        self.centered = true;
        self
    }

    fn after_gap(mut self, gap: f32) -> Self {
        self.gap = gap;
        self
    }
}

/// Text lines of the divider for `note`, the `day`-th note of its class.
fn layout(note: &NoteRecord, day: usize) -> Vec<Line> {
    let mut lines = vec![
        Line::new("F2", 16.0, format!("Day {} Notes: {}", day, note.class_name)).centered(),
        Line::new("F1", 12.0, format!("Type: {}", note.note_type)).after_gap(20.0),
        Line::new(
            "F1",
            12.0,
            format!(
                "Date: {}",
                format_timestamp(&note.upload_date, "%Y-%m-%d %H:%M")
            ),
        ),
        Line::new("F1", 12.0, "AI Analysis Summary:").after_gap(18.0),
    ];

    let summary = if note.analysis.summary.trim().is_empty() {
        "No summary available"
    } else {
        note.analysis.summary.as_str()
    };
    for wrapped in textwrap::wrap(summary, SUMMARY_WRAP_COLUMNS) {
        lines.push(Line::new("F1", 10.0, wrapped.into_owned()));
    }

    if !note.analysis.key_topics.is_empty() {
        lines.push(Line::new("F2", 12.0, "Key Topics:").after_gap(18.0));
        for topic in note.analysis.key_topics.iter().take(MAX_TOPICS) {
            lines.push(Line::new("F1", 10.0, format!("- {}", topic)));
        }
    }
    lines
}

/// Maps text to WinAnsiEncoding bytes; unmappable characters become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2026}' => 0x85,
            '\t' | '\n' | '\r' => b' ',
            _ => b'?',
        })
        .collect()
}

/// Rough Helvetica advance width, good enough for centering a title.
fn approx_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.55
}

fn content_for(lines: &[Line]) -> Content {
    let mut operations = Vec::new();
    let mut y = PAGE_HEIGHT - MARGIN;
    for line in lines {
        y -= line.gap + line.size * 1.6;
        if y < MARGIN {
            break;
        }
        let x = if line.centered {
            ((PAGE_WIDTH - approx_width(&line.text, line.size)) / 2.0).max(MARGIN)
        } else {
            MARGIN
        };
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec![line.font.into(), line.size.into()]));
        operations.push(Operation::new("Td", vec![x.into(), y.into()]));
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(win_ansi(&line.text))],
        ));
        operations.push(Operation::new("ET", vec![]));
    }
    Content { operations }
}

/// Renders the divider page for `note` as a standalone document.
pub fn render_divider(note: &NoteRecord, day: usize) -> Result<Document> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let content = content_for(&layout(note, day));
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
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
    doc.compress();
    Ok(doc)
}
