//! Best-effort recovery of structured records from free-form model output.
//!
//! Nothing in here fails: malformed input degrades to a simpler reading of
//! the text or to placeholder values, and the outcome says which happened.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{CreativeSuggestion, StructuredSummary};
use crate::services::prompts::{
    DESCRIPTION_PREFIX, SUGGESTION_MARKER, SummarySection, TEXT_PREFIX,
};

pub const SUMMARY_PLACEHOLDER: &str = "summary unavailable";
pub const ENDING_STATE_PLACEHOLDER: &str = "ending state unspecified";
pub const CHARACTERS_PLACEHOLDER: &str = "characters unavailable";
pub const SETTINGS_PLACEHOLDER: &str = "settings unavailable";
pub const KEY_EVENTS_PLACEHOLDER: &str = "key events unavailable";

const BULLETS: [char; 3] = ['-', '•', '*'];

// Markers may arrive wrapped in markdown (`**[RESUMO]**`, `## [RESUMO]`); the
// decoration on the marker's own line belongs to the match, not to a body.
static SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    let alternatives: Vec<String> = SummarySection::ALL
        .iter()
        .map(|section| format!("({})", regex::escape(section.marker())))
        .collect();
    Regex::new(&format!(r"(?i)[#* \t]*(?:{})[* \t]*", alternatives.join("|")))
        .expect("valid section marker regex")
});

static EVENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:\d+\.\s*|[-•*]\s+)(.+?)\s*$").expect("valid key event regex")
});

/// Result of reading a suggestion list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionParse {
    /// Records came from `[SUGESTÃO n]` blocks.
    Marked(Vec<CreativeSuggestion>),
    /// No usable blocks; each non-blank line was taken as a suggestion.
    LineFallback(Vec<CreativeSuggestion>),
}

impl SuggestionParse {
    pub fn suggestions(&self) -> &[CreativeSuggestion] {
        match self {
            SuggestionParse::Marked(items) | SuggestionParse::LineFallback(items) => items,
        }
    }

    pub fn into_suggestions(self) -> Vec<CreativeSuggestion> {
        match self {
            SuggestionParse::Marked(items) | SuggestionParse::LineFallback(items) => items,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, SuggestionParse::LineFallback(_))
    }
}

pub fn parse_suggestions(text: &str, count: usize) -> SuggestionParse {
    let marked = parse_marked_suggestions(text, count);
    if !marked.is_empty() {
        return SuggestionParse::Marked(marked);
    }
    SuggestionParse::LineFallback(parse_line_suggestions(text, count))
}

fn parse_marked_suggestions(text: &str, count: usize) -> Vec<CreativeSuggestion> {
    let mut suggestions = Vec::new();

    for segment in text.split(SUGGESTION_MARKER).skip(1) {
        if suggestions.len() >= count {
            break;
        }

        let mut suggestion_text = None;
        let mut description = None;
        for line in segment.lines().map(str::trim) {
            if let Some(rest) = line.strip_prefix(TEXT_PREFIX) {
                suggestion_text.get_or_insert_with(|| rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix(DESCRIPTION_PREFIX) {
                description.get_or_insert_with(|| rest.trim().to_string());
            }
        }

        if let Some(text) = suggestion_text.filter(|t| !t.is_empty()) {
            suggestions.push(CreativeSuggestion {
                text,
                description: description.filter(|d| !d.is_empty()),
            });
        }
    }

    suggestions
}

fn parse_line_suggestions(text: &str, count: usize) -> Vec<CreativeSuggestion> {
    text.lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(|c: char| c.is_ascii_digit() || ".-) ".contains(c))
                .trim()
        })
        .filter(|line| !line.is_empty())
        .take(count)
        .map(|line| CreativeSuggestion {
            text: line.to_string(),
            description: None,
        })
        .collect()
}

/// Result of reading a chapter summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryParse {
    /// At least one section marker was found. `missing` lists the sections
    /// that fell back to placeholders because their marker was absent.
    Structured {
        summary: StructuredSummary,
        missing: Vec<SummarySection>,
    },
    /// No marker at all; the raw text stands in as the summary.
    Raw(StructuredSummary),
}

impl SummaryParse {
    pub fn summary(&self) -> &StructuredSummary {
        match self {
            SummaryParse::Structured { summary, .. } | SummaryParse::Raw(summary) => summary,
        }
    }

    pub fn into_summary(self) -> StructuredSummary {
        match self {
            SummaryParse::Structured { summary, .. } | SummaryParse::Raw(summary) => summary,
        }
    }
}

pub fn parse_summary(text: &str) -> SummaryParse {
    let sections = locate_sections(text);
    if sections.iter().all(Option::is_none) {
        let raw = text.trim();
        return SummaryParse::Raw(StructuredSummary {
            summary: if raw.is_empty() {
                SUMMARY_PLACEHOLDER.to_string()
            } else {
                raw.to_string()
            },
            characters: vec![CHARACTERS_PLACEHOLDER.to_string()],
            settings: vec![SETTINGS_PLACEHOLDER.to_string()],
            key_events: vec![KEY_EVENTS_PLACEHOLDER.to_string()],
            ending_state: ENDING_STATE_PLACEHOLDER.to_string(),
        });
    }

    let content = |section: SummarySection| sections[section_index(section)];
    let missing = SummarySection::ALL
        .into_iter()
        .filter(|section| content(*section).is_none())
        .collect();

    let summary = StructuredSummary {
        summary: narrative(content(SummarySection::Summary), SUMMARY_PLACEHOLDER),
        characters: list(
            content(SummarySection::Characters),
            bullet_items,
            CHARACTERS_PLACEHOLDER,
        ),
        settings: list(content(SummarySection::Settings), bullet_items, SETTINGS_PLACEHOLDER),
        key_events: list(
            content(SummarySection::KeyEvents),
            event_items,
            KEY_EVENTS_PLACEHOLDER,
        ),
        ending_state: narrative(content(SummarySection::EndingState), ENDING_STATE_PLACEHOLDER),
    };

    SummaryParse::Structured { summary, missing }
}

fn section_index(section: SummarySection) -> usize {
    match section {
        SummarySection::Summary => 0,
        SummarySection::Characters => 1,
        SummarySection::Settings => 2,
        SummarySection::KeyEvents => 3,
        SummarySection::EndingState => 4,
    }
}

/// Finds the body of each section: from the end of its first marker up to
/// the next marker of any kind, or the end of the text.
fn locate_sections(text: &str) -> [Option<&str>; 5] {
    let mut found: Vec<(usize, usize, usize)> = Vec::new();
    for caps in SECTION_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let Some(group) = (1..=SummarySection::ALL.len()).find(|i| caps.get(*i).is_some()) else {
            continue;
        };
        found.push((group - 1, whole.start(), whole.end()));
    }

    let mut sections: [Option<&str>; 5] = [None; 5];
    for (pos, &(index, _, body_start)) in found.iter().enumerate() {
        if sections[index].is_some() {
            continue;
        }
        let body_end = found
            .get(pos + 1)
            .map(|&(_, next_start, _)| next_start)
            .unwrap_or(text.len());
        sections[index] = Some(&text[body_start..body_end]);
    }
    sections
}

fn narrative(content: Option<&str>, placeholder: &str) -> String {
    match content.map(str::trim).filter(|c| !c.is_empty()) {
        Some(body) => body.to_string(),
        None => placeholder.to_string(),
    }
}

fn list(content: Option<&str>, extract: fn(&str) -> Vec<String>, placeholder: &str) -> Vec<String> {
    let Some(body) = content else {
        return vec![placeholder.to_string()];
    };

    let mut items = extract(body);
    if items.is_empty() {
        items = body
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
    }
    if items.is_empty() {
        items.push(placeholder.to_string());
    }
    items
}

fn bullet_items(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter_map(strip_bullet)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// A bullet counts only when whitespace follows it, so `**` is not an item.
fn strip_bullet(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(BULLETS)?;
    rest.starts_with(char::is_whitespace).then(|| rest.trim())
}

fn event_items(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| EVENT_RE.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|item| item.as_str().to_string())
        .collect()
}
