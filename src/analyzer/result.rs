//! Suggestion and result types, and normalization of model output.
//!
//! Every suggestion, whether it comes from a model session or the rule-based
//! fallback, passes through [`normalize_suggestion`] so cached results have
//! the same structure regardless of how they were produced.
//!
//! # Offsets
//!
//! Offsets and lengths count Unicode scalar values (`char`s), not bytes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::backend::RawSuggestion;

/// Characters of surrounding text kept on each side of a suggestion.
pub const CONTEXT_WINDOW_CHARS: usize = 20;

/// Category used when the model does not name one.
pub const DEFAULT_CATEGORY: &str = "grammar";

/// Issue category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Spelling,
    Grammar,
    Punctuation,
    Style,
    Clarity,
    /// A failure reported in an error or log message
    Error,
    Other(String),
}

impl Category {
    /// Parse a category name (case-insensitive).
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "spelling" => Category::Spelling,
            "grammar" => Category::Grammar,
            "punctuation" => Category::Punctuation,
            "style" => Category::Style,
            "clarity" => Category::Clarity,
            "error" => Category::Error,
            other => Category::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::Spelling => "spelling",
            Category::Grammar => "grammar",
            Category::Punctuation => "punctuation",
            Category::Style => "style",
            Category::Clarity => "clarity",
            Category::Error => "error",
            Category::Other(name) => name,
        }
    }

    /// Fixed category to severity mapping.
    pub fn severity(&self) -> Severity {
        match self {
            Category::Spelling | Category::Grammar | Category::Error => Severity::Error,
            Category::Punctuation => Severity::Warning,
            Category::Style | Category::Clarity | Category::Other(_) => Severity::Info,
        }
    }
}

impl From<String> for Category {
    fn from(name: String) -> Self {
        Category::parse(&name)
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How serious a suggestion is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Where a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Model,
    Fallback,
}

/// One normalized analysis finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub category: Category,
    pub severity: Severity,
    /// Absolute offset into the analyzed text
    pub offset: usize,
    pub length: usize,
    pub original_text: String,
    pub replacement_text: String,
    pub message: String,
    pub explanation: String,
    pub context_before: String,
    pub context_after: String,
    pub created_at: DateTime<Utc>,
}

impl Suggestion {
    /// Key used for de-duplication across overlapping chunks.
    pub fn dedup_key(&self) -> (usize, usize, Category) {
        (self.offset, self.length, self.category.clone())
    }
}

/// Final outcome of one analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Ordered by offset, unique by (offset, length, category)
    pub suggestions: Vec<Suggestion>,
    pub source_text_length: usize,
    pub was_chunked: bool,
    pub chunk_count: usize,
    pub cached: bool,
    pub cached_at: Option<DateTime<Utc>>,
    pub origin: Origin,
    /// Input exceeded the configured maximum and only a prefix was analyzed
    pub truncated: bool,
}

impl AnalysisResult {
    /// An empty, uncached result.
    pub fn empty(origin: Origin, source_text_length: usize) -> Self {
        Self {
            suggestions: Vec::new(),
            source_text_length,
            was_chunked: false,
            chunk_count: 0,
            cached: false,
            cached_at: None,
            origin,
            truncated: false,
        }
    }

    pub fn issue_count(&self) -> usize {
        self.suggestions.len()
    }

    /// Count of suggestions at a given severity.
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.suggestions
            .iter()
            .filter(|s| s.severity == severity)
            .count()
    }
}

/// Tone and empathy assessment of a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToneReport {
    /// 0 (hostile) to 100 (warm)
    pub score: f64,
    pub label: String,
    pub issues: Vec<String>,
    pub suggestions: Vec<String>,
    pub origin: Origin,
}

impl ToneReport {
    pub const NEUTRAL_SCORE: f64 = 50.0;

    /// Report used whenever no usable model answer is available.
    pub fn neutral(origin: Origin) -> Self {
        Self {
            score: Self::NEUTRAL_SCORE,
            label: "neutral".to_string(),
            issues: Vec::new(),
            suggestions: Vec::new(),
            origin,
        }
    }
}

/// Normalize a raw suggestion against the text it was produced from.
///
/// `source` is the exact text the model saw (the chunk text, overlap
/// included); `base_offset` is where that text starts in the analyzed input.
/// The returned suggestion carries an absolute offset. Returns `None` when
/// the span does not lie within `source`.
pub fn normalize_suggestion(
    raw: &RawSuggestion,
    source: &[char],
    base_offset: usize,
    created_at: DateTime<Utc>,
) -> Option<Suggestion> {
    let category = raw
        .category
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .map(Category::parse)
        .unwrap_or(Category::Grammar);
    let offset = raw.offset;
    let length = raw.span_length();
    let in_bounds = offset
        .checked_add(length)
        .is_some_and(|end| end <= source.len());
    let absolute = base_offset.checked_add(offset);
    let Some(absolute) = absolute.filter(|_| in_bounds) else {
        tracing::debug!(
            "Dropping suggestion at {}+{} outside a {}-char source",
            offset,
            length,
            source.len()
        );
        return None;
    };
    let (context_before, context_after) = context_windows(source, offset, length);

    Some(Suggestion {
        severity: category.severity(),
        category,
        offset: absolute,
        length,
        original_text: raw.original.clone(),
        replacement_text: raw.replacement.clone(),
        message: raw.message.clone(),
        explanation: raw.explanation.clone(),
        context_before,
        context_after,
        created_at,
    })
}

/// Text immediately before and after a span, clamped to the source bounds.
pub fn context_windows(source: &[char], offset: usize, length: usize) -> (String, String) {
    let start = offset.min(source.len());
    let end = offset.saturating_add(length).min(source.len());
    let before_start = start.saturating_sub(CONTEXT_WINDOW_CHARS);
    let after_end = end.saturating_add(CONTEXT_WINDOW_CHARS).min(source.len());

    (
        source[before_start..start].iter().collect(),
        source[end..after_end].iter().collect(),
    )
}
