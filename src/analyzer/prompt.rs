//! Prompt templates for the open-ended prompt capability.
//!
//! The proofreading capability takes raw text, so these are only rendered
//! when a request is routed to `CapabilityKind::Prompt`. Templates live in
//! `src/analyzer/prompts/` and are embedded at compile time.

/// Shown in place of an empty context string.
const NO_CONTEXT: &str = "none given";

/// Which prompt a request needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Grammar,
    ErrorLog,
    Tone,
}

impl PromptKind {
    fn template(&self) -> &'static str {
        match self {
            PromptKind::Grammar => include_str!("prompts/proofread.txt"),
            PromptKind::ErrorLog => include_str!("prompts/error_log.txt"),
            PromptKind::Tone => include_str!("prompts/tone.txt"),
        }
    }
}

/// Render the prompt for `text`.
///
/// The text is substituted last so placeholders inside user input are left
/// alone.
pub fn build_prompt(kind: PromptKind, text: &str, context: &str) -> String {
    let context = context.trim();
    let context = if context.is_empty() {
        NO_CONTEXT
    } else {
        context
    };

    kind.template()
        .replace("{context}", context)
        .replace("{text}", text)
}
