//! Diagnostic rendering for errors with source context
//!
//! Pretty printing of syntax errors with source snippets, highlighted
//! error locations, and suggestions where one exists.

use super::{LexerError, LoomError, ParseError};
use crate::shared::SpanInfo;
use std::fmt::Write;

/// Diagnostic renderer configuration
#[derive(Debug)]
pub struct DiagnosticConfig {
    /// Number of context lines before/after error
    pub context_lines: usize,
    /// Use unicode characters
    pub use_unicode: bool,
    /// Use ANSI colors
    pub use_colors: bool,
    /// Show source snippets
    pub show_source: bool,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        DiagnosticConfig {
            context_lines: 2,
            use_unicode: true,
            use_colors: true,
            show_source: true,
        }
    }
}

/// Source information for rendering
#[derive(Debug)]
pub struct SourceInfo<'a> {
    /// Source file name/path
    pub filename: &'a str,
    /// Full source text
    pub source: &'a str,
}

/// Render a `LoomError` with diagnostic information
pub fn render_diagnostic(
    error: &LoomError<SpanInfo>,
    source: Option<&SourceInfo<'_>>,
    config: &DiagnosticConfig,
) -> String {
    let mut output = String::new();

    write_error_header(&mut output, error, config);

    if let Some(src) = source {
        if config.show_source {
            write_source_snippet(&mut output, error.info(), src, config);
        }
    }

    if let Some(suggestion) = get_error_suggestion(error) {
        write_suggestion(&mut output, &suggestion, config);
    }

    output
}

/// Write the main error header
fn write_error_header(output: &mut String, error: &LoomError<SpanInfo>, config: &DiagnosticConfig) {
    let error_type = match error {
        LoomError::ELexerError(_, _) => "lexer error",
        LoomError::EParseError(_, _) => "parse error",
    };

    if config.use_colors {
        use colored::Colorize;
        let _ = writeln!(
            output,
            "{}: {}",
            error_type.bright_red().bold(),
            error.to_string().bold()
        );
    } else {
        let _ = writeln!(output, "{}: {}", error_type, error);
    }
}

/// Write source code snippet with error highlighting
fn write_source_snippet(
    output: &mut String,
    span: &SpanInfo,
    source_info: &SourceInfo<'_>,
    config: &DiagnosticConfig,
) {
    let lines: Vec<&str> = source_info.source.lines().collect();
    if lines.is_empty() {
        return;
    }

    let start_line = span.start_line.saturating_sub(1); // 0-based
    let start_col = span.start_column;
    let end_line = span.end_line.saturating_sub(1);
    let end_col = span.end_column;

    let context_start = start_line.saturating_sub(config.context_lines);
    let context_end = (end_line + config.context_lines).min(lines.len() - 1);

    let _ = writeln!(output);

    if config.use_unicode {
        let _ = writeln!(
            output,
            "  ╭─[{}:{}:{}]",
            source_info.filename,
            start_line + 1,
            start_col + 1
        );
    } else {
        let _ = writeln!(
            output,
            "  --> {}:{}:{}",
            source_info.filename,
            start_line + 1,
            start_col + 1
        );
    }

    let sep = if config.use_unicode { "│" } else { "|" };

    for line_num in context_start..=context_end {
        if line_num >= lines.len() {
            break;
        }

        let line = lines[line_num];
        let display_num = line_num + 1;
        let on_error_line = line_num >= start_line && line_num <= end_line;

        if on_error_line && config.use_colors {
            use colored::Colorize;
            let _ = writeln!(
                output,
                "  {:>4} {} {}",
                display_num.to_string().bright_red().bold(),
                sep,
                line
            );
        } else {
            let _ = writeln!(output, "  {:>4} {} {}", display_num, sep, line);
        }

        if on_error_line {
            let underline_start = if line_num == start_line { start_col } else { 0 };
            let underline_end = if line_num == end_line {
                end_col.max(underline_start + 1)
            } else {
                line.len()
            };

            let _ = write!(output, "       {} ", sep);
            for _ in 0..underline_start {
                let _ = write!(output, " ");
            }
            for _ in underline_start..underline_end {
                if config.use_colors {
                    use colored::Colorize;
                    let _ = write!(output, "{}", "^".bright_red().bold());
                } else {
                    let _ = write!(output, "^");
                }
            }
            let _ = writeln!(output);
        }
    }

    if config.use_unicode {
        let _ = writeln!(output, "  ╰────");
    } else {
        let _ = writeln!(output, "  ----");
    }
}

/// Write suggestion
fn write_suggestion(output: &mut String, suggestion: &str, config: &DiagnosticConfig) {
    let _ = writeln!(output);
    if config.use_colors {
        use colored::Colorize;
        let _ = writeln!(output, "{}: {}", "help".bright_cyan().bold(), suggestion);
    } else {
        let _ = writeln!(output, "help: {}", suggestion);
    }
}

/// Get helpful suggestion for an error
fn get_error_suggestion(error: &LoomError<SpanInfo>) -> Option<String> {
    match error {
        LoomError::EParseError(ParseError::UnexpectedToken { expected, .. }, _) => {
            Some(format!("expected {}", expected))
        }
        LoomError::EParseError(ParseError::EmptyCodeBlock, _) => {
            Some("a lambda body needs at least one expression after the |".to_string())
        }
        LoomError::EParseError(ParseError::InvalidMultiplicity { .. }, _) => {
            Some("write the smaller bound first, e.g. [1..*]".to_string())
        }
        LoomError::ELexerError(LexerError::UnterminatedString, _) => {
            Some("add a closing quote (') to terminate the string".to_string())
        }
        LoomError::ELexerError(LexerError::UnterminatedIsland, _) => {
            Some("close the island block with }#".to_string())
        }
        _ => None,
    }
}

/// Render multiple errors (useful for batch compilation)
pub fn render_diagnostics(
    errors: &[LoomError<SpanInfo>],
    source: Option<SourceInfo<'_>>,
    config: &DiagnosticConfig,
) -> String {
    let mut output = String::new();

    for (idx, error) in errors.iter().enumerate() {
        if idx > 0 {
            let _ = writeln!(output, "\n{}", "─".repeat(60));
        }
        output.push_str(&render_diagnostic(error, source.as_ref(), config));
    }

    output
}
