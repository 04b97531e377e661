//! Server-rendered HTML for the web front end.
//!
//! Every page shares one layout: a sidebar with navigation and library
//! statistics, and a content column. All user-derived text goes through
//! [`esc`] / [`attr`] before it reaches the markup.

use std::fmt::Write;

use crate::models::{format_timestamp, NoteRecord, NoteType};
use crate::search::NoteFilter;
use crate::upload::UploadOutcome;
use crate::view::{ClassSummary, LibraryStats};

const STYLE: &str = "\
body{font-family:system-ui,sans-serif;margin:0;display:flex;color:#222}\
nav{width:220px;min-height:100vh;background:#f4f6fa;padding:1rem;box-sizing:border-box}\
nav a{display:block;padding:.3rem 0;color:#1f77b4;text-decoration:none}\
main{flex:1;padding:1.5rem 2rem;max-width:1000px}\
h1.brand{color:#1f77b4;margin:.2rem 0 1rem}\
table{border-collapse:collapse;width:100%}td,th{border-bottom:1px solid #ddd;padding:.4rem;text-align:left}\
.notice{padding:.6rem 1rem;border-radius:4px;margin:1rem 0}\
.success{background:#e6f4ea}.error{background:#fce8e6}.warning{background:#fef7e0}.info{background:#e8f0fe}\
details{border:1px solid #ddd;border-radius:4px;margin:.5rem 0;padding:.5rem}\
.metric{margin:.4rem 0}.metric b{display:block;font-size:1.4rem}\
pre{white-space:pre-wrap;background:#fafafa;padding:.5rem}";

/// Status banner shown above page content.
#[derive(Debug, Clone)]
pub enum Notice {
    Success(String),
    Error(String),
    Warning(String),
    Info(String),
}

impl Notice {
    pub fn render(&self) -> String {
        let (class, text) = match self {
            Notice::Success(t) => ("success", t),
            Notice::Error(t) => ("error", t),
            Notice::Warning(t) => ("warning", t),
            Notice::Info(t) => ("info", t),
        };
        format!(r#"<div class="notice {}">{}</div>"#, class, esc(text))
    }
}

pub fn esc(text: &str) -> String {
    html_escape::encode_text(text).into_owned()
}

pub fn attr(text: &str) -> String {
    html_escape::encode_double_quoted_attribute(text).into_owned()
}

pub fn class_href(class_name: &str) -> String {
    format!("/classes/{}", urlencoding::encode(class_name))
}

pub fn generated_href(class_name: &str) -> String {
    format!("/generated/{}", urlencoding::encode(class_name))
}

/// Wraps `body` in the shared layout.
pub fn layout(title: &str, stats: &LibraryStats, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="utf-8"><title>{title} - SB Notes</title><style>{style}</style></head>
<body>
<nav>
<h1 class="brand">SB Notes</h1>
<a href="/">Dashboard</a>
<a href="/upload">Upload Notes</a>
<a href="/notes">View Notes</a>
<a href="/generate">Generate PDFs</a>
<h3>Statistics</h3>
<div class="metric">Total Notes<b>{notes}</b></div>
<div class="metric">Classes<b>{classes}</b></div>
<div class="metric">Latest Upload<b>{latest}</b></div>
</nav>
<main>
<h2>{title}</h2>
{body}
</main>
</body>
</html>"#,
        title = esc(title),
        style = STYLE,
        notes = stats.total_notes,
        classes = stats.total_classes,
        latest = esc(stats.latest_upload.as_deref().unwrap_or("-")),
        body = body,
    )
}

pub fn dashboard(rows: &[ClassSummary]) -> String {
    if rows.is_empty() {
        return Notice::Info("No notes uploaded yet. Upload your first note to get started!".into())
            .render();
    }
    let mut html = String::from(
        "<table><tr><th>Class</th><th>Total Notes</th><th>Note Types</th><th>Last Updated</th></tr>",
    );
    for row in rows {
        let _ = write!(
            html,
            r#"<tr><td><a href="{}">{}</a></td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
            attr(&class_href(&row.class_name)),
            esc(&row.class_name),
            row.total_notes,
            esc(&row.note_types),
            esc(&row.last_updated)
        );
    }
    html.push_str("</table>");
    html
}

fn note_type_options(selected: Option<NoteType>, include_all: bool) -> String {
    let mut html = String::new();
    if include_all {
        html.push_str(r#"<option value="">All</option>"#);
    }
    for t in NoteType::ALL {
        let _ = write!(
            html,
            r#"<option value="{0}"{1}>{0}</option>"#,
            t.label(),
            if selected == Some(t) { " selected" } else { "" }
        );
    }
    html
}

pub fn upload_form(notice: Option<&Notice>) -> String {
    format!(
        r#"{notice}
<form method="post" action="/upload" enctype="multipart/form-data">
<p><label>PDF file <input type="file" name="file" accept=".pdf,application/pdf" required></label></p>
<p><label>Class Name <input type="text" name="class_name" placeholder="e.g., Calculus, Physics"></label></p>
<p><label>Note Type <select name="note_type">{options}</select></label></p>
<p><button type="submit">Upload &amp; Analyze</button></p>
</form>"#,
        notice = notice.map(Notice::render).unwrap_or_default(),
        options = note_type_options(None, false),
    )
}

fn topic_list(topics: &[String]) -> String {
    if topics.is_empty() {
        return "<p>No topics identified</p>".to_string();
    }
    let mut html = String::from("<ul>");
    for topic in topics {
        let _ = write!(html, "<li>{}</li>", esc(topic));
    }
    html.push_str("</ul>");
    html
}

pub fn upload_result(outcome: &UploadOutcome, warning: Option<&Notice>) -> String {
    let analysis = &outcome.note.analysis;
    format!(
        r#"{success}{warning}
<h3>Analysis Results</h3>
<p><b>Summary:</b> {summary}</p>
<p><b>Difficulty Level:</b> {difficulty}</p>
<p><b>Study Time:</b> {time}</p>
<p><b>Transcription Quality:</b> {quality}</p>
<p><b>Key Topics:</b></p>{topics}
<p><a href="{href}">View all {class} notes</a></p>"#,
        success = Notice::Success("Successfully uploaded and analyzed notes!".into()).render(),
        warning = warning.map(Notice::render).unwrap_or_default(),
        summary = esc(&analysis.summary),
        difficulty = esc(&analysis.difficulty_level),
        time = esc(&analysis.estimated_study_time),
        quality = esc(&analysis.transcription_quality),
        topics = topic_list(&analysis.key_topics),
        href = attr(&class_href(&outcome.note.class_name)),
        class = esc(&outcome.note.class_name),
    )
}

fn note_details(note: &NoteRecord) -> String {
    let a = &note.analysis;
    format!(
        r#"<details><summary>{class} - {kind} ({date})</summary>
<p><b>Summary:</b> {summary}</p>
<p><b>Key Topics:</b></p>{topics}
<p><b>Text Preview:</b></p><pre>{preview}</pre>
<p><b>Class:</b> {class} &middot; <b>Type:</b> {kind} &middot; <b>Difficulty:</b> {difficulty} &middot; <b>Study Time:</b> {time} &middot; <b>Quality:</b> {quality}</p>
</details>"#,
        class = esc(&note.class_name),
        kind = note.note_type.label(),
        date = format_timestamp(&note.upload_date, "%Y-%m-%d %H:%M"),
        summary = esc(&a.summary),
        topics = topic_list(&a.key_topics),
        preview = esc(&note.text_preview),
        difficulty = esc(&a.difficulty_level),
        time = esc(&a.estimated_study_time),
        quality = esc(&a.transcription_quality),
    )
}

pub fn notes_page(notes: &[&NoteRecord], filter: &NoteFilter, classes: &[String]) -> String {
    let mut class_options = String::from(r#"<option value="">All</option>"#);
    for class in classes {
        let selected = filter.class_name.as_deref() == Some(class.as_str());
        let _ = write!(
            class_options,
            r#"<option value="{}"{}>{}</option>"#,
            attr(class),
            if selected { " selected" } else { "" },
            esc(class)
        );
    }

    let mut html = format!(
        r#"<form method="get" action="/notes">
<label>Class <select name="class_name">{classes}</select></label>
<label>Type <select name="note_type">{types}</select></label>
<label>Search in content <input type="text" name="q" value="{q}" placeholder="Enter keywords..."></label>
<button type="submit">Filter</button>
</form>
<h3>Notes ({count} found)</h3>"#,
        classes = class_options,
        types = note_type_options(filter.note_type, true),
        q = attr(filter.content.as_deref().unwrap_or("")),
        count = notes.len(),
    );
    for note in notes {
        html.push_str(&note_details(note));
    }
    html
}

pub fn class_page(class_name: &str, notes: &[&NoteRecord]) -> String {
    let mut html = format!(
        r#"<p>{} notes. <a href="/generate?class_name={}">Generate combined PDF</a></p>"#,
        notes.len(),
        attr(&urlencoding::encode(class_name))
    );
    html.push_str(
        "<table><tr><th>Type</th><th>Date</th><th>Summary</th><th>Difficulty</th><th>Study Time</th><th>Quality</th></tr>",
    );
    for note in notes {
        let a = &note.analysis;
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            note.note_type.label(),
            format_timestamp(&note.upload_date, "%Y-%m-%d %H:%M"),
            esc(&a.summary),
            esc(&a.difficulty_level),
            esc(&a.estimated_study_time),
            esc(&a.transcription_quality)
        );
    }
    html.push_str("</table>");
    html
}

pub fn generate_page(
    classes: &[String],
    selected: Option<&str>,
    notes: &[&NoteRecord],
    notice: Option<&Notice>,
    download: Option<&str>,
) -> String {
    if classes.is_empty() {
        return Notice::Info("No classes available. Upload some notes first!".into()).render();
    }
    let mut options = String::new();
    for class in classes {
        let is_selected = selected == Some(class.as_str());
        let _ = write!(
            options,
            r#"<option value="{}"{}>{}</option>"#,
            attr(class),
            if is_selected { " selected" } else { "" },
            esc(class)
        );
    }

    let mut html = format!(
        r#"{notice}
<form method="get" action="/generate">
<label>Select class <select name="class_name">{options}</select></label>
<button type="submit">Show</button>
</form>"#,
        notice = notice.map(Notice::render).unwrap_or_default(),
        options = options,
    );

    if let Some(class_name) = selected {
        let _ = write!(
            html,
            "<h3>{} Notes</h3><p>Found {} notes for this class</p><ul>",
            esc(class_name),
            notes.len()
        );
        for note in notes {
            let _ = write!(
                html,
                "<li>{} - {}</li>",
                note.note_type.label(),
                format_timestamp(&note.upload_date, "%Y-%m-%d")
            );
        }
        html.push_str("</ul>");
        let _ = write!(
            html,
            r#"<form method="post" action="/generate"><input type="hidden" name="class_name" value="{}"><button type="submit">Generate Combined PDF</button></form>"#,
            attr(class_name)
        );
    }

    if let Some(class_name) = download {
        let _ = write!(
            html,
            r#"<p><a href="{}">Download PDF</a></p>"#,
            attr(&generated_href(class_name))
        );
    }
    html
}
