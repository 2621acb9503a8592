use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

fn default_length_in_pages() -> u32 {
    8
}

fn default_language() -> String {
    "pt-BR".to_string()
}

fn default_suggestion_count() -> u32 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviousChapter {
    pub title: String,
    pub summary: String,
    #[serde(default)]
    pub generated_text: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    #[default]
    Single,
    Full,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateChapterRequest {
    pub project_id: String,
    pub chapter_id: String,
    pub project_title: String,
    pub chapter_title: String,
    pub chapter_summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    pub tone: String,
    pub writing_style: String,
    pub setting: String,
    #[serde(default = "default_length_in_pages")]
    pub length_in_pages: u32,
    #[serde(default)]
    pub previous_chapters: Vec<PreviousChapter>,
    #[serde(default)]
    pub mode: GenerationMode,
    #[serde(default = "default_language")]
    pub language: String,
}

impl GenerateChapterRequest {
    /// Target length of the chapter in words, at roughly 250 words per page.
    pub fn target_word_count(&self) -> u32 {
        self.length_in_pages * 250
    }

    pub fn is_first_chapter(&self) -> bool {
        self.previous_chapters.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateChapterResponse {
    pub text: String,
    pub tokens_used: usize,
    pub metadata: GenerationMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Title,
    Character,
    Plot,
    Setting,
}

impl SuggestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionKind::Title => "title",
            SuggestionKind::Character => "character",
            SuggestionKind::Plot => "plot",
            SuggestionKind::Setting => "setting",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativeSuggestion {
    pub text: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreativeSuggestionsRequest {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub context: String,
    pub genre: String,
    pub tone: String,
    #[serde(default = "default_suggestion_count")]
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreativeSuggestionsResponse {
    pub suggestions: Vec<CreativeSuggestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeChapterRequest {
    pub chapter_text: String,
    #[serde(default)]
    pub chapter_title: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeChapterResponse {
    pub summary: String,
    pub tokens_used: usize,
}

/// A chapter summary recovered from model output. Every field is populated,
/// with placeholders standing in for sections the model left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredSummary {
    pub summary: String,
    pub characters: Vec<String>,
    pub settings: Vec<String>,
    pub key_events: Vec<String>,
    pub ending_state: String,
}

impl StructuredSummary {
    /// Flattens the summary into the single text field returned to clients.
    pub fn to_text(&self) -> String {
        let mut out = self.summary.trim().to_string();

        push_list(&mut out, "PERSONAGENS", &self.characters, false);
        push_list(&mut out, "AMBIENTAÇÕES", &self.settings, false);
        push_list(&mut out, "EVENTOS-CHAVE", &self.key_events, true);

        out.push_str("\n\nESTADO FINAL:\n");
        out.push_str(self.ending_state.trim());
        out
    }
}

fn push_list(out: &mut String, label: &str, items: &[String], numbered: bool) {
    if items.is_empty() {
        return;
    }
    out.push_str("\n\n");
    out.push_str(label);
    out.push(':');
    for (idx, item) in items.iter().enumerate() {
        if numbered {
            out.push_str(&format!("\n{}. {}", idx + 1, item));
        } else {
            out.push_str(&format!("\n- {}", item));
        }
    }
}

/// Approximate token count: whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
