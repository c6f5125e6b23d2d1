//! Analysis command handlers: check, errors, tone

use anyhow::{Context, Result};
use std::sync::Arc;

use lexicheck::analyzer::{AnalysisEngine, Origin, Severity, UnavailableProvider};
use lexicheck::{AnalysisResult, Config, ToneReport};

use super::{line_col, read_input, truncate_string};
use crate::cli::InputArgs;

/// Longest message or replacement shown per line in text output.
const MAX_FIELD_CHARS: usize = 60;

/// Build an engine for the CLI.
///
/// This build ships no on-device model, so every request is served by the
/// rule-based analyzer.
fn build_engine(config: Config) -> AnalysisEngine {
    AnalysisEngine::new(config, Arc::new(UnavailableProvider))
}

/// Handle `lexicheck check`.
#[cfg(not(tarpaulin_include))]
pub fn handle_check(args: &InputArgs, config: Config, json: bool, verbose: bool) -> Result<()> {
    let text = read_input(args.file.as_deref())?;
    let engine = build_engine(config);
    let result = engine.analyze(&text, &args.context);
    print_result(&text, &result, json)?;
    finish(&engine, verbose);
    Ok(())
}

/// Handle `lexicheck errors`.
#[cfg(not(tarpaulin_include))]
pub fn handle_errors(args: &InputArgs, config: Config, json: bool, verbose: bool) -> Result<()> {
    let text = read_input(args.file.as_deref())?;
    let engine = build_engine(config);
    let result = engine.analyze_error(&text, &args.context);
    print_result(&text, &result, json)?;
    finish(&engine, verbose);
    Ok(())
}

/// Handle `lexicheck tone`.
#[cfg(not(tarpaulin_include))]
pub fn handle_tone(args: &InputArgs, config: Config, json: bool, verbose: bool) -> Result<()> {
    let text = read_input(args.file.as_deref())?;
    let engine = build_engine(config);
    let report = engine.analyze_tone(&text, &args.context);
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize tone report")?
        );
    } else {
        print!("{}", format_tone(&report));
    }
    finish(&engine, verbose);
    Ok(())
}

fn print_result(text: &str, result: &AnalysisResult, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(result).context("Failed to serialize result")?
        );
    } else {
        print!("{}", format_result(text, result));
    }
    Ok(())
}

fn finish(engine: &AnalysisEngine, verbose: bool) {
    if verbose {
        eprint!("{}", engine.get_stats().format_summary());
    }
    engine.shutdown();
}

fn origin_label(origin: Origin) -> &'static str {
    match origin {
        Origin::Model => "model",
        Origin::Fallback => "rules",
    }
}

/// Render an analysis result for the terminal.
pub fn format_result(text: &str, result: &AnalysisResult) -> String {
    let mut output = String::new();

    if result.suggestions.is_empty() {
        output.push_str(&format!(
            "No issues found ({}).\n",
            origin_label(result.origin)
        ));
    } else {
        for s in &result.suggestions {
            let (line, col) = line_col(text, s.offset);
            let mut entry = format!(
                "{:>4}:{:<3} {:<7} {:<11} {}",
                line,
                col,
                s.severity.to_string(),
                s.category.to_string(),
                truncate_string(&s.message, MAX_FIELD_CHARS)
            );
            if !s.replacement_text.is_empty() {
                entry.push_str(&format!(
                    "  \"{}\" -> \"{}\"",
                    truncate_string(&s.original_text, MAX_FIELD_CHARS),
                    truncate_string(&s.replacement_text, MAX_FIELD_CHARS)
                ));
            }
            output.push_str(entry.trim_end());
            output.push('\n');
            if !s.explanation.is_empty() {
                output.push_str(&format!("           {}\n", s.explanation));
            }
        }

        output.push_str(&format!(
            "\n{} issue(s): {} error, {} warning, {} info ({})\n",
            result.issue_count(),
            result.count_by_severity(Severity::Error),
            result.count_by_severity(Severity::Warning),
            result.count_by_severity(Severity::Info),
            origin_label(result.origin)
        ));
    }

    if result.truncated {
        output.push_str(&format!(
            "Note: input was cut to the first {} characters.\n",
            result.source_text_length
        ));
    }

    output
}

/// Render a tone report for the terminal.
pub fn format_tone(report: &ToneReport) -> String {
    let mut output = format!(
        "Tone: {} (score {:.0}/100, {})\n",
        report.label,
        report.score,
        origin_label(report.origin)
    );

    if !report.issues.is_empty() {
        output.push_str("\nIssues:\n");
        for issue in &report.issues {
            output.push_str(&format!("  - {}\n", issue));
        }
    }
    if !report.suggestions.is_empty() {
        output.push_str("\nSuggestions:\n");
        for suggestion in &report.suggestions {
            output.push_str(&format!("  - {}\n", suggestion));
        }
    }

    output
}
