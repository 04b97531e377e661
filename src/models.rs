//! Core data models persisted in the note store.
//!
//! The JSON shape is the on-disk contract:
//!
//! ```json
//! { "notes": [NoteRecord, ...], "classes": { "<class>": ClassAggregate } }
//! ```

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Placeholder used for analysis fields the model did not provide.
pub const UNKNOWN: &str = "Unknown";

/// The fixed set of note categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteType {
    Notes,
    Homework,
    #[serde(rename = "Study Prep")]
    StudyPrep,
    Exam,
    Other,
}

impl NoteType {
    pub const ALL: [NoteType; 5] = [
        NoteType::Notes,
        NoteType::Homework,
        NoteType::StudyPrep,
        NoteType::Exam,
        NoteType::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            NoteType::Notes => "Notes",
            NoteType::Homework => "Homework",
            NoteType::StudyPrep => "Study Prep",
            NoteType::Exam => "Exam",
            NoteType::Other => "Other",
        }
    }
}

impl fmt::Display for NoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for NoteType {
    type Err = String;

    /// Accepts the display label case-insensitively, plus `study-prep` /
    /// `study_prep` for command lines.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', '_'], " ");
        NoteType::ALL
            .into_iter()
            .find(|t| t.label().to_lowercase() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown note type '{}': expected one of Notes, Homework, Study Prep, Exam, Other",
                    s
                )
            })
    }
}

/// AI-generated metadata for one note. Every field is best-effort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    #[serde(default = "unknown", deserialize_with = "lenient_string")]
    pub summary: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub key_topics: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub important_concepts: Vec<String>,
    #[serde(default = "unknown", deserialize_with = "lenient_string")]
    pub difficulty_level: String,
    #[serde(default = "unknown", deserialize_with = "lenient_string")]
    pub estimated_study_time: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub related_topics: Vec<String>,
    #[serde(default = "unknown", deserialize_with = "lenient_string")]
    pub transcription_quality: String,
}

impl Default for Analysis {
    fn default() -> Self {
        Self {
            summary: unknown(),
            key_topics: Vec::new(),
            important_concepts: Vec::new(),
            difficulty_level: unknown(),
            estimated_study_time: unknown(),
            related_topics: Vec::new(),
            transcription_quality: unknown(),
        }
    }
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

/// Renders any JSON value as display text: strings verbatim, `null` as
/// empty, everything else as compact JSON.
fn value_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let text = value_to_text(&value);
    Ok(if text.trim().is_empty() { unknown() } else { text })
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => Vec::new(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .filter(|s| !s.trim().is_empty())
            .collect(),
        other => {
            let text = value_to_text(&other);
            if text.trim().is_empty() {
                Vec::new()
            } else {
                vec![text]
            }
        }
    })
}

/// One uploaded PDF's metadata and analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub id: String,
    pub class_name: String,
    pub note_type: NoteType,
    pub upload_date: String,
    pub file_path: String,
    #[serde(default)]
    pub analysis: Analysis,
    #[serde(default)]
    pub text_preview: String,
}

impl NoteRecord {
    /// Text matched by search: class, type, summary and key topics.
    pub fn searchable_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.class_name,
            self.note_type,
            self.analysis.summary,
            self.analysis.key_topics.join(", ")
        )
    }
}

/// Per-class rollup counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassAggregate {
    pub total_notes: u64,
    #[serde(default)]
    pub note_types: BTreeMap<String, u64>,
    pub last_updated: String,
}

/// The whole persisted store.
///
/// Classes live in a `BTreeMap`, so both the file and every listing are
/// ordered by class name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub notes: Vec<NoteRecord>,
    #[serde(default)]
    pub classes: BTreeMap<String, ClassAggregate>,
}

impl StoreData {
    /// Appends a note and updates (or creates) its class aggregate.
    pub fn add_note(&mut self, note: NoteRecord) {
        let aggregate = self
            .classes
            .entry(note.class_name.clone())
            .or_insert_with(|| ClassAggregate {
                total_notes: 0,
                note_types: BTreeMap::new(),
                last_updated: note.upload_date.clone(),
            });
        aggregate.total_notes += 1;
        *aggregate
            .note_types
            .entry(note.note_type.label().to_string())
            .or_insert(0) += 1;
        aggregate.last_updated = note.upload_date.clone();
        self.notes.push(note);
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.notes.iter().any(|n| n.id == id)
    }

    /// Recomputes every class aggregate from the note list.
    ///
    /// Returns the number of classes whose aggregate changed.
    pub fn rebuild_classes(&mut self) -> usize {
        let mut rebuilt: BTreeMap<String, ClassAggregate> = BTreeMap::new();
        for note in &self.notes {
            let aggregate =
                rebuilt
                    .entry(note.class_name.clone())
                    .or_insert_with(|| ClassAggregate {
                        total_notes: 0,
                        note_types: BTreeMap::new(),
                        last_updated: note.upload_date.clone(),
                    });
            aggregate.total_notes += 1;
            *aggregate
                .note_types
                .entry(note.note_type.label().to_string())
                .or_insert(0) += 1;
            if note.upload_date > aggregate.last_updated {
                aggregate.last_updated = note.upload_date.clone();
            }
        }

        let changed = rebuilt
            .iter()
            .filter(|(name, agg)| self.classes.get(*name) != Some(agg))
            .count()
            + self
                .classes
                .keys()
                .filter(|name| !rebuilt.contains_key(*name))
                .count();
        self.classes = rebuilt;
        changed
    }
}

/// Current local time in the store's timestamp format.
pub fn now_timestamp() -> String {
    chrono::Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

/// Formats a stored ISO-8601 timestamp with `fmt`; falls back to the raw
/// string when it does not parse.
pub fn format_timestamp(ts: &str, fmt: &str) -> String {
    if let Ok(dt) = NaiveDateTime::from_str(ts) {
        return dt.format(fmt).to_string();
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(ts) {
        return dt.naive_local().format(fmt).to_string();
    }
    ts.to_string()
}

/// First `max` characters of `text` plus `...` when it was longer.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
