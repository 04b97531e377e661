//! AI analysis of extracted note text.
//!
//! One prompt, one attempt. The reply is expected to be a JSON object with
//! seven fields; a reply that is not becomes a degraded record built from
//! the raw text, and a failed call becomes a record marked `Failed`. Neither
//! case is an error for the caller.

use crate::ai::NoteAi;
use crate::models::{truncate_chars, Analysis, NoteType, UNKNOWN};

/// Characters of the raw reply kept as the summary of a degraded record.
const DEGRADED_SUMMARY_CHARS: usize = 200;

/// Builds the analysis prompt, cutting `text` to `max_chars` characters.
pub fn build_prompt(text: &str, note_type: NoteType, class_name: &str, max_chars: usize) -> String {
    let excerpt: String = text.chars().take(max_chars).collect();
    format!(
        "Analyze the following {note_type} for {class_name}. This content was extracted from \
scanned/handwritten notes using AI vision, so it may contain transcription artifacts.

Please provide:
1. A concise summary (2-3 sentences)
2. Key topics/concepts covered
3. Important formulas, definitions, or concepts
4. Difficulty level (Beginner/Intermediate/Advanced)
5. Estimated study time needed
6. Related topics that might be connected
7. Content quality assessment (how well the notes were transcribed)

Notes content:
{excerpt}

Please format your response as JSON with these keys:
- summary
- key_topics
- important_concepts
- difficulty_level
- estimated_study_time
- related_topics
- transcription_quality
"
    )
}

/// Removes a surrounding Markdown code fence, if any.
pub fn strip_code_fence(reply: &str) -> &str {
    let mut s = reply.trim();
    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim()
}

/// Parses a model reply into an [`Analysis`], degrading when it is not a
/// JSON object.
pub fn parse_analysis(reply: &str) -> Analysis {
    let body = strip_code_fence(reply);
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value @ serde_json::Value::Object(_)) => match serde_json::from_value(value) {
            Ok(analysis) => analysis,
            Err(e) => {
                tracing::warn!(error = %e, "analysis JSON had unexpected shape");
                degraded_analysis(reply)
            }
        },
        Ok(_) | Err(_) => {
            tracing::warn!("analysis reply was not a JSON object; keeping raw summary");
            degraded_analysis(reply)
        }
    }
}

/// Record used when the reply could not be parsed.
pub fn degraded_analysis(reply: &str) -> Analysis {
    let head: String = reply.chars().take(DEGRADED_SUMMARY_CHARS).collect();
    Analysis {
        summary: format!("{}...", head),
        key_topics: vec!["Extracted from AI analysis".to_string()],
        important_concepts: vec!["See full analysis".to_string()],
        difficulty_level: UNKNOWN.to_string(),
        estimated_study_time: UNKNOWN.to_string(),
        related_topics: Vec::new(),
        transcription_quality: UNKNOWN.to_string(),
    }
}

/// Record used when the model call itself failed.
pub fn failed_analysis() -> Analysis {
    Analysis {
        summary: "AI analysis failed".to_string(),
        key_topics: Vec::new(),
        important_concepts: Vec::new(),
        difficulty_level: UNKNOWN.to_string(),
        estimated_study_time: UNKNOWN.to_string(),
        related_topics: Vec::new(),
        transcription_quality: "Failed".to_string(),
    }
}

/// Runs the analysis prompt against `ai`. Never fails.
pub async fn analyze_notes(
    ai: &dyn NoteAi,
    text: &str,
    note_type: NoteType,
    class_name: &str,
    max_chars: usize,
) -> Analysis {
    let prompt = build_prompt(text, note_type, class_name, max_chars);
    match ai.complete(&prompt).await {
        Ok(reply) => parse_analysis(&reply),
        Err(e) => {
            tracing::error!(error = %e, class = class_name, "error analyzing notes with AI");
            failed_analysis()
        }
    }
}

/// Short form of a summary for table cells.
pub fn summary_excerpt(analysis: &Analysis, max_chars: usize) -> String {
    truncate_chars(&analysis.summary, max_chars)
}
