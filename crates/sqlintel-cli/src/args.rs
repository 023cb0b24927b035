//! CLI argument definitions

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "sqlintel")]
#[command(author, version, about = "SQL intelligence engine harness")]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Options shared by every command that needs schema metadata
#[derive(ClapArgs, Clone, Default)]
pub struct SchemaArgs {
    /// Schema definition files
    #[arg(short, long = "schema", value_name = "FILE")]
    pub schema: Vec<PathBuf>,

    /// Directory containing schema files
    #[arg(long = "schema-dir", value_name = "DIR")]
    pub schema_dir: Option<PathBuf>,

    /// SQL dialect
    #[arg(short, long, env = "SQLINTEL_DIALECT")]
    pub dialect: Option<String>,

    /// Path to config file (default: search for sqlintel.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Lint SQL files
    Lint {
        /// SQL files to lint (supports glob patterns)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[command(flatten)]
        schema: SchemaArgs,

        /// Also run the checks meant for right before execution
        #[arg(long)]
        pre_execute: bool,

        /// Rule ids to disable
        #[arg(long, value_name = "RULE")]
        disable: Vec<String>,
    },

    /// Show ranked completions at a position in a SQL file
    Suggest {
        /// SQL file
        file: PathBuf,

        /// Byte offset of the cursor (default: end of file)
        #[arg(long, conflicts_with = "at")]
        offset: Option<usize>,

        /// Cursor as LINE:COLUMN, both 1-based
        #[arg(long, value_name = "LINE:COL")]
        at: Option<String>,

        #[command(flatten)]
        schema: SchemaArgs,
    },

    /// Parse SQL and display the statement trees (for debugging)
    Parse {
        /// SQL file to parse
        file: PathBuf,

        /// SQL dialect
        #[arg(short, long, env = "SQLINTEL_DIALECT")]
        dialect: Option<String>,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Display schema information
    Schema {
        #[command(flatten)]
        schema: SchemaArgs,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable output with colors
    #[default]
    Human,
    /// JSON output
    Json,
    /// SARIF output (for GitHub Code Scanning)
    Sarif,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true)
    }
}

/// Parse `LINE:COL` (1-based) into a byte offset of `source`
pub fn resolve_position(source: &str, at: &str) -> Result<usize, String> {
    let (line, col) = at
        .split_once(':')
        .ok_or_else(|| format!("Expected LINE:COL, got '{at}'"))?;
    let line: usize = line
        .trim()
        .parse()
        .map_err(|_| format!("Invalid line in '{at}'"))?;
    let col: usize = col
        .trim()
        .parse()
        .map_err(|_| format!("Invalid column in '{at}'"))?;
    if line == 0 || col == 0 {
        return Err(format!("Positions are 1-based, got '{at}'"));
    }

    let mut offset = 0;
    for (index, text) in source.split_inclusive('\n').enumerate() {
        if index + 1 == line {
            let content = text.trim_end_matches(['\n', '\r']);
            let within = content
                .char_indices()
                .nth(col - 1)
                .map(|(i, _)| i)
                .unwrap_or(content.len());
            return Ok(offset + within);
        }
        offset += text.len();
    }
    if line == source.split_inclusive('\n').count() + 1 {
        return Ok(source.len());
    }
    Err(format!("Line {line} is past the end of the file"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_position() {
        let source = "SELECT 1;\nSELECT name\nFROM users";
        assert_eq!(resolve_position(source, "1:1"), Ok(0));
        assert_eq!(resolve_position(source, "2:8"), Ok(17));
        assert_eq!(resolve_position(source, "3:99"), Ok(source.len()));
        assert!(resolve_position(source, "0:1").is_err());
        assert!(resolve_position(source, "9:1").is_err());
        assert!(resolve_position(source, "nope").is_err());
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("json".parse::<OutputFormat>(), Ok(OutputFormat::Json));
        assert_eq!("SARIF".parse::<OutputFormat>(), Ok(OutputFormat::Sarif));
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
