//! Deterministic rule-based analyzer.
//!
//! Serves every request the model cannot: no backend, pool timeout, failed
//! calls, or a disabled surface. Rules are regexes evaluated in order; the
//! first rule to claim a span wins and later overlapping matches are
//! dropped.
//!
//! A rule may name a `span` capture group to report only part of its match,
//! which stands in for the lookaround the `regex` crate does not support.

use chrono::Utc;
use regex::Regex;

use super::backend::RawSuggestion;
use super::chunk::merge_chunk_results;
use super::result::{normalize_suggestion, AnalysisResult, Category, Origin, Suggestion};

/// One pattern and the suggestion it produces.
#[derive(Debug, Clone)]
pub struct FallbackRule {
    regex: Regex,
    category: Category,
    message: String,
    /// Replacement template; `$1`, `$name` expand from the match
    replacement: String,
    explanation: String,
}

impl FallbackRule {
    pub fn new(
        pattern: &str,
        category: Category,
        message: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            category,
            message: message.into(),
            replacement: String::new(),
            explanation: String::new(),
        })
    }

    pub fn with_replacement(mut self, template: impl Into<String>) -> Self {
        self.replacement = template.into();
        self
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }

    pub fn category(&self) -> &Category {
        &self.category
    }
}

struct RuleDef {
    pattern: &'static str,
    category: &'static str,
    message: &'static str,
    replacement: &'static str,
    explanation: &'static str,
}

const fn def(
    pattern: &'static str,
    category: &'static str,
    message: &'static str,
    replacement: &'static str,
    explanation: &'static str,
) -> RuleDef {
    RuleDef {
        pattern,
        category,
        message,
        replacement,
        explanation,
    }
}

const TEXT_RULES: &[RuleDef] = &[
    def(r"\b[Tt]eh\b", "spelling", "Possible misspelling", "the", "Did you mean \"the\"?"),
    def(r"(?i)\brecieve", "spelling", "Possible misspelling", "receive", "\"i\" before \"e\" except after \"c\"."),
    def(r"(?i)\bseperat", "spelling", "Possible misspelling", "separat", ""),
    def(r"(?i)\bdefinate?ly\b", "spelling", "Possible misspelling", "definitely", ""),
    def(r"(?i)\boccured\b", "spelling", "Possible misspelling", "occurred", ""),
    def(r"(?i)\buntill\b", "spelling", "Possible misspelling", "until", ""),
    def(r"(?i)\bwich\b", "spelling", "Possible misspelling", "which", ""),
    def(r"(?i)\balot\b", "spelling", "Possible misspelling", "a lot", "\"A lot\" is two words."),
    def(r"(?i)\baccomodat", "spelling", "Possible misspelling", "accommodat", ""),
    def(r"(?i)\badress", "spelling", "Possible misspelling", "address", ""),
    def(r"(?i)\bbeleiv", "spelling", "Possible misspelling", "believ", ""),
    def(r"(?i)\bgoverment", "spelling", "Possible misspelling", "government", ""),
    def(r"(?i)\benviroment", "spelling", "Possible misspelling", "environment", ""),
    def(r"(?i)\bneccess?ar", "spelling", "Possible misspelling", "necessar", ""),
    def(r"(?i)\btomm?orr?ow\b", "spelling", "Possible misspelling", "tomorrow", ""),
    def(
        r"(?i)\b(?:(the)\s+the|(and)\s+and|(to)\s+to|(of)\s+of|(is)\s+is|(in)\s+in|(a)\s+a)\b",
        "grammar",
        "Repeated word",
        "$1$2$3$4$5$6$7",
        "The same word appears twice in a row.",
    ),
    def(
        r"(?i)\b(could|would|should|must|might) of\b",
        "grammar",
        "Use \"have\" after a modal verb",
        "$1 have",
        "\"Could of\" is a mishearing of \"could've\".",
    ),
    def(
        r"(?m)(?:^|\s)(?P<span>i)(?:\s|'|$)",
        "grammar",
        "Capitalize the pronoun \"I\"",
        "I",
        "",
    ),
    def(
        r"\s+(?P<p>[,.;:!?])",
        "punctuation",
        "Remove the space before punctuation",
        "$p",
        "",
    ),
    def(
        r",(?P<w>[A-Za-z])",
        "punctuation",
        "Add a space after the comma",
        ", $w",
        "",
    ),
    def(
        r"\b(?P<span> {2,})\b",
        "style",
        "Multiple spaces between words",
        " ",
        "",
    ),
    def(
        r"(?i)\bvery unique\b",
        "clarity",
        "\"Unique\" does not take an intensifier",
        "unique",
        "",
    ),
    def(
        r"(?i)\b(?:in order to)\b",
        "clarity",
        "Wordy phrase",
        "to",
        "\"To\" is usually enough.",
    ),
];

const ERROR_LOG_RULES: &[RuleDef] = &[
    def(
        r"(?i)\bconnection refused\b|\bECONNREFUSED\b",
        "error",
        "The target service refused the connection",
        "",
        "Check that the service is running and listening on the expected host and port.",
    ),
    def(
        r"(?i)\baddress already in use\b|\bEADDRINUSE\b",
        "error",
        "The port is already taken",
        "",
        "Stop the other process bound to this port or configure a different one.",
    ),
    def(
        r"(?i)\b(?:timed out|timeout)\b|\bETIMEDOUT\b",
        "error",
        "An operation timed out",
        "",
        "Check network reachability of the remote side, then consider raising the timeout.",
    ),
    def(
        r"(?i)\bpermission denied\b|\bEACCES\b|\bEPERM\b",
        "error",
        "Permission denied",
        "",
        "Check file ownership and mode, or run with an account that has access.",
    ),
    def(
        r"(?i)\bno such file or directory\b|\bENOENT\b|\bfile not found\b",
        "error",
        "A file or directory is missing",
        "",
        "Verify the path, the working directory, and that the file was created before use.",
    ),
    def(
        r"(?i)\bno space left on device\b|\bENOSPC\b|\bdisk quota exceeded\b",
        "error",
        "The disk is full",
        "",
        "Free disk space or move the output to a larger volume.",
    ),
    def(
        r"(?i)\btoo many open files\b|\bEMFILE\b",
        "error",
        "File descriptor limit reached",
        "",
        "Close unused handles or raise the open file limit (ulimit -n).",
    ),
    def(
        r"(?i)\bout of memory\b|\bOOM(?:Killed)?\b|\bcannot allocate memory\b",
        "error",
        "The process ran out of memory",
        "",
        "Reduce the working set or raise the memory limit of the process.",
    ),
    def(
        r"(?i)\bsegmentation fault\b|\bSIGSEGV\b",
        "error",
        "The process crashed with a segmentation fault",
        "",
        "Run under a debugger or with a core dump enabled to find the faulting access.",
    ),
    def(
        r"(?i)\bNullPointerException\b|\bnull pointer\b|\bcannot read propert(?:y|ies) of (?:undefined|null)\b|\bis not a function\b",
        "error",
        "A value was unexpectedly null or undefined",
        "",
        "Check that the value is initialized before it is used.",
    ),
    def(
        r"(?i)\bpanicked at\b",
        "error",
        "The program panicked",
        "",
        "The message after \"panicked at\" names the source location; RUST_BACKTRACE=1 prints the call stack.",
    ),
    def(
        r"(?i)\bmaximum call stack size exceeded\b|\bstack overflow\b",
        "error",
        "Stack overflow",
        "",
        "Look for unbounded recursion.",
    ),
    def(
        r"(?i)\bdeadlock(?: detected)?\b",
        "error",
        "A deadlock was detected",
        "",
        "Acquire locks in a consistent order and keep critical sections short.",
    ),
    def(
        r"(?i)\b(?:certificate|ssl|tls)\b[^\n]{0,40}?\b(?:expired|verify failed|verification failed|invalid)\b",
        "error",
        "TLS certificate problem",
        "",
        "Check the certificate chain and expiry date, and that the host name matches.",
    ),
    def(
        r"(?i)\b401 unauthorized\b|\b403 forbidden\b|\bunauthori[sz]ed\b",
        "error",
        "The request was not authorized",
        "",
        "Check the credentials or token, and that it has not expired.",
    ),
    def(
        r"(?i)\b50[0-4]\b(?:\s+(?:internal server error|bad gateway|service unavailable|gateway time-?out))",
        "error",
        "The server returned an error",
        "",
        "The fault is on the server side; check its logs and retry later.",
    ),
    def(
        r"(?i)\bsyntax ?error\b|\bunexpected token\b",
        "error",
        "Syntax error",
        "",
        "Check the reported line for a missing bracket, quote or separator.",
    ),
    def(
        r"\b(?:FATAL|CRITICAL|ERROR)\b",
        "error",
        "Error-level log entry",
        "",
        "Read the surrounding lines for the cause.",
    ),
];

fn compile(defs: &[RuleDef]) -> Vec<FallbackRule> {
    defs
        .iter()
        .filter_map(|def| {
            match FallbackRule::new(def.pattern, Category::parse(def.category), def.message) {
                Ok(rule) => Some(
                    rule.with_replacement(def.replacement)
                        .with_explanation(def.explanation),
                ),
                Err(e) => {
                    tracing::warn!("Skipping fallback rule {:?}: {}", def.pattern, e);
                    None
                }
            }
        })
        .collect()
}

/// Ordered set of fallback rules.
#[derive(Debug, Clone)]
pub struct FallbackAnalyzer {
    rules: Vec<FallbackRule>,
}

impl FallbackAnalyzer {
    pub fn new(rules: Vec<FallbackRule>) -> Self {
        Self { rules }
    }

    /// Built-in grammar and spelling rules.
    pub fn text() -> Self {
        Self::new(compile(TEXT_RULES))
    }

    /// Built-in rules for error and log messages.
    pub fn error_log() -> Self {
        Self::new(compile(ERROR_LOG_RULES))
    }

    pub fn rules(&self) -> &[FallbackRule] {
        &self.rules
    }

    /// Analyze `text` and wrap the findings in a fallback result.
    pub fn analyze(&self, text: &str) -> AnalysisResult {
        let source: Vec<char> = text.chars().collect();
        let mut result = AnalysisResult::empty(Origin::Fallback, source.len());
        result.suggestions = self.suggest(text, &source);
        result.chunk_count = 1;
        result
    }

    fn suggest(&self, text: &str, source: &[char]) -> Vec<Suggestion> {
        let now = Utc::now();
        let char_starts: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let to_char = |byte: usize| char_starts.partition_point(|&b| b < byte);

        // Byte spans already reported, in claim order
        let mut claimed: Vec<(usize, usize)> = Vec::new();
        let mut suggestions = Vec::new();

        for rule in &self.rules {
            for caps in rule.regex.captures_iter(text) {
                let Some(span) = caps.name("span").or_else(|| caps.get(0)) else {
                    continue;
                };
                if span.is_empty() {
                    continue;
                }
                let (start, end) = (span.start(), span.end());
                if claimed.iter().any(|&(s, e)| start < e && s < end) {
                    continue;
                }
                claimed.push((start, end));

                let mut replacement = String::new();
                caps.expand(&rule.replacement, &mut replacement);

                let offset = to_char(start);
                let raw = RawSuggestion {
                    category: Some(rule.category.as_str().to_string()),
                    offset,
                    length: Some(to_char(end) - offset),
                    end_index: None,
                    original: span.as_str().to_string(),
                    replacement,
                    message: rule.message.clone(),
                    explanation: rule.explanation.clone(),
                };
                suggestions.extend(normalize_suggestion(&raw, source, 0, now));
            }
        }

        merge_chunk_results(vec![suggestions])
    }
}
