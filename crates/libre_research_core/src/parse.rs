//! crates/libre_research_core/src/parse.rs
//!
//! Turns the model's free-form answer into a `GeneratedResearch`.
//!
//! Models asked for "JSON only" still wrap it in code fences, prepend chatter,
//! or emit LaTeX-style backslashes that are not valid JSON escapes. Each
//! candidate below is tried in order and the first object with a non-empty
//! summary wins.

use crate::domain::{GeneratedResearch, ReportSection, SourceReference};
use crate::ports::{PortError, PortResult};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::debug;

static CODE_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("code block pattern is valid")
});

#[derive(Deserialize)]
struct RawResearch {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    sections: Vec<ReportSection>,
    #[serde(default)]
    sources: Vec<SourceReference>,
}

/// Parses a model response into structured research.
///
/// Returns `PortError::Upstream` when no candidate parses into an object with
/// a summary; the caller records that as a failed report.
pub fn parse_research(text: &str) -> PortResult<GeneratedResearch> {
    for (label, candidate) in candidates(text) {
        if let Some(research) = try_parse(&candidate) {
            debug!("Parsed research response from {}", label);
            return Ok(research);
        }
    }

    let preview: String = text.chars().take(200).collect();
    Err(PortError::Upstream(format!(
        "Model response was not a valid research object: {}",
        preview
    )))
}

fn candidates(text: &str) -> Vec<(&'static str, String)> {
    let mut out = vec![("raw text", text.trim().to_string())];

    if let Some(block) = CODE_BLOCK.captures(text).and_then(|c| c.get(1)) {
        let block = block.as_str().trim().to_string();
        out.push(("code block (escapes fixed)", fix_invalid_escapes(&block)));
        out.insert(1, ("code block", block));
    }

    if let Some(span) = brace_span(text) {
        out.push(("brace span", span.to_string()));
        out.push(("brace span (escapes fixed)", fix_invalid_escapes(span)));
    }

    out
}

fn try_parse(candidate: &str) -> Option<GeneratedResearch> {
    let value: serde_json::Value = serde_json::from_str(candidate).ok()?;
    if !value.is_object() {
        return None;
    }
    let raw: RawResearch = serde_json::from_value(value.clone()).ok()?;
    if raw.summary.trim().is_empty() {
        return None;
    }
    Some(GeneratedResearch {
        summary: raw.summary,
        sections: raw.sections,
        sources: raw.sources,
        raw: value,
    })
}

/// The text between the first `{` and the last `}`, inclusive.
fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Doubles every backslash that does not start a valid JSON escape.
fn fix_invalid_escapes(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c != '\\' {
            out.push(c);
            i += 1;
            continue;
        }

        match chars.get(i + 1) {
            Some('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't') => {
                out.push(c);
                out.push(chars[i + 1]);
                i += 2;
            }
            Some('u') if is_unicode_escape(&chars[i + 2..]) => {
                out.push(c);
                i += 1;
            }
            _ => {
                out.push_str("\\\\");
                i += 1;
            }
        }
    }

    out
}

fn is_unicode_escape(rest: &[char]) -> bool {
    rest.len() >= 4 && rest[..4].iter().all(|c| c.is_ascii_hexdigit())
}
