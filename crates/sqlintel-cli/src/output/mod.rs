//! Output formatting

use sqlintel_core::{Diagnostic, Severity, SuggestionList};

use crate::args::OutputFormat;

/// Output formatter for one source file
pub struct OutputFormatter {
    format: OutputFormat,
    file_name: String,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, file_name: String) -> Self {
        Self { format, file_name }
    }

    /// Print diagnostics in the configured format
    pub fn print_diagnostics(&self, diagnostics: &[Diagnostic], source: &str) {
        match self.format {
            OutputFormat::Human => self.print_human(diagnostics, source),
            OutputFormat::Json => self.print_json(diagnostics),
            OutputFormat::Sarif => self.print_sarif(diagnostics, source),
        }
    }

    fn print_human(&self, diagnostics: &[Diagnostic], source: &str) {
        for diag in diagnostics {
            let severity_str = match diag.severity {
                Severity::Error => "\x1b[31merror\x1b[0m",
                Severity::Warning => "\x1b[33mwarning\x1b[0m",
                Severity::Info => "\x1b[34minfo\x1b[0m",
            };

            eprintln!("{}[{}]: {}", severity_str, diag.rule_id, diag.message);

            let (line, col) = offset_to_line_col(source, diag.range.start);
            eprintln!("  --> {}:{}:{}", self.file_name, line, col);

            if let Some(source_line) = get_source_line(source, line) {
                eprintln!("   |");
                eprintln!("{:>3} | {}", line, source_line);

                let padding = " ".repeat(col.saturating_sub(1));
                let room = source_line.chars().count().saturating_sub(col - 1);
                let underline = "^".repeat(diag.range.len().min(room).max(1));
                eprintln!("   | {}{}", padding, underline);
            }

            if let Some(help) = &diag.help {
                eprintln!("   = help: {}", help);
            }
            if diag.stale_metadata {
                eprintln!("   = note: checked against stale schema metadata");
            }

            eprintln!();
        }
    }

    fn print_json(&self, diagnostics: &[Diagnostic]) {
        let output = serde_json::json!({
            "file": self.file_name,
            "diagnostics": diagnostics
        });
        println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
    }

    fn print_sarif(&self, diagnostics: &[Diagnostic], source: &str) {
        let results: Vec<serde_json::Value> = diagnostics
            .iter()
            .map(|d| {
                let (start_line, start_col) = offset_to_line_col(source, d.range.start);
                let (end_line, end_col) = offset_to_line_col(source, d.range.end);
                serde_json::json!({
                    "ruleId": d.rule_id,
                    "level": match d.severity {
                        Severity::Error => "error",
                        Severity::Warning => "warning",
                        Severity::Info => "note",
                    },
                    "message": {
                        "text": d.message
                    },
                    "locations": [{
                        "physicalLocation": {
                            "artifactLocation": {
                                "uri": self.file_name
                            },
                            "region": {
                                "startLine": start_line,
                                "startColumn": start_col,
                                "endLine": end_line,
                                "endColumn": end_col
                            }
                        }
                    }]
                })
            })
            .collect();

        let sarif = serde_json::json!({
            "$schema": "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json",
            "version": "2.1.0",
            "runs": [{
                "tool": {
                    "driver": {
                        "name": "sqlintel",
                        "version": env!("CARGO_PKG_VERSION")
                    }
                },
                "results": results
            }]
        });

        println!("{}", serde_json::to_string_pretty(&sarif).unwrap_or_default());
    }

    /// Print a ranked completion list. SARIF has no notion of completions,
    /// so it falls back to JSON.
    pub fn print_suggestions(&self, list: &SuggestionList, cursor: usize) {
        match self.format {
            OutputFormat::Human => {
                for item in &list.items {
                    let stale = if item.stale { " (stale)" } else { "" };
                    println!(
                        "{:<10} {:<32} {}{}",
                        format!("{:?}", item.kind).to_lowercase(),
                        item.label,
                        item.detail,
                        stale
                    );
                }
                if list.more_available {
                    println!("... more available");
                }
            }
            OutputFormat::Json | OutputFormat::Sarif => {
                let output = serde_json::json!({
                    "file": self.file_name,
                    "cursor": cursor,
                    "suggestions": list,
                });
                println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
            }
        }
    }
}

/// Convert byte offset to line and column (1-indexed)
pub fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;

    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    (line, col)
}

/// Get a specific line from source (1-indexed)
fn get_source_line(source: &str, line: usize) -> Option<&str> {
    source.lines().nth(line.saturating_sub(1))
}
