//! CLI definitions for lexicheck
//!
//! This module contains the clap CLI structure definitions, separated from main.rs
//! so command handlers and tests can share them.

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, Subcommand};
use clap_complete::Shell as CompletionShell;
use std::path::PathBuf;

/// Build clap styles for consistent CLI appearance.
///
/// - Green: headers, usage, command names
/// - White: descriptions, placeholders (renders as light gray on dark terminals)
pub fn build_cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::White.on_default())
        .valid(AnsiColor::White.on_default())
        .invalid(AnsiColor::Red.on_default())
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
}

#[derive(Parser)]
#[command(name = "lexicheck")]
#[command(about = "[ lexicheck ] - grammar, error-log and tone checks with a rule-based fallback")]
#[command(
    long_about = "lexicheck - check text for grammar, spelling and style issues, explain
failures in error logs, and assess the tone of a message.

Analysis runs on on-device model capabilities when the host provides them,
and on a deterministic rule set otherwise. Results are the same shape either
way and say where they came from.

QUICK START:
    lexicheck check notes.txt          Grammar and spelling check
    echo 'Teh end' | lexicheck check   Read from stdin
    lexicheck errors build.log         Explain failures in a log
    lexicheck tone reply.txt           Tone and empathy report
    lexicheck config show              Show the active configuration"
)]
#[command(version)]
#[command(styles = build_cli_styles())]
pub struct Cli {
    /// Emit results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Use this config file instead of ~/.config/lexicheck/config.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Input shared by the analysis commands.
#[derive(clap::Args, Debug, Clone)]
pub struct InputArgs {
    /// File to read (stdin when omitted)
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Short description of where the text is used (e.g. "email to a customer")
    #[arg(long, short, default_value = "")]
    pub context: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check text for grammar, spelling and style issues
    #[command(long_about = "Check text for grammar, spelling, punctuation and style issues.

Long input is cut to engine.max_text_chars and split into chunks that fit
the model's token budget. Each finding carries its character offset, a
suggested replacement and surrounding context.

EXAMPLES:
    lexicheck check draft.md
    lexicheck check --context 'support reply' reply.txt
    cat draft.md | lexicheck check --json")]
    Check(InputArgs),

    /// Explain failures in an error message or log
    #[command(long_about = "Explain failures in an error message or log excerpt.

Each finding points at the line or phrase showing the failure and gives
the likely cause and a remediation.

EXAMPLES:
    lexicheck errors build.log
    journalctl -u app --since today | lexicheck errors")]
    Errors(InputArgs),

    /// Assess the tone and empathy of a message
    #[command(long_about = "Assess the tone and empathy of a message.

Reports a score from 0 (hostile) to 100 (warm), a short label, phrases
that could land badly, and suggestions. Without a model the report is a
neutral default.

EXAMPLE:
    lexicheck tone reply.txt")]
    Tone(InputArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    #[command(long_about = "Generate shell completion scripts.

EXAMPLES:
    lexicheck completions --shell bash > ~/.local/share/bash-completion/completions/lexicheck
    lexicheck completions --shell zsh > ~/.zfunc/_lexicheck")]
    Completions {
        /// Shell to generate completions for
        #[arg(long, value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration as TOML
    #[command(long_about = "Display the active configuration in TOML format.

Values missing from the config file are shown with their defaults.

EXAMPLE:
    lexicheck config show")]
    Show,
    /// Print the configuration file path
    Path,
    /// Reset configuration to defaults
    #[command(long_about = "Write the default configuration to the config file.

An existing file is first copied to config.toml.bak (or .bak.1, .bak.2, ...).

EXAMPLE:
    lexicheck config reset")]
    Reset,
}
