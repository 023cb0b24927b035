//! sqlintel CLI - drives the SQL intelligence engine over files

mod args;
mod config;
mod output;

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use sqlintel_core::parser::{parse_all, ParserAdapter};
use sqlintel_core::{
    ConnectionCapabilities, ConnectionKey, Engine, LintMode, MetadataCache, Severity,
    SharedMetadataCache, SnapshotBuilder, SqlDialect, SqlParser,
};

use crate::args::{resolve_position, Args, Command, OutputFormat};
use crate::config::Config;
use crate::output::{offset_to_line_col, OutputFormatter};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let level = match (args.quiet, args.verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::WARN,
        (false, 1) => tracing::Level::INFO,
        (false, 2) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    match run(args).await {
        Ok(has_findings) => {
            if has_findings {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            eprintln!("Error: {:?}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> Result<bool> {
    let quiet = args.quiet;
    match args.command {
        Command::Lint {
            files,
            schema,
            pre_execute,
            disable,
        } => {
            let config =
                Config::load(schema.config.as_deref())?.merge_with_args(&schema, &disable);
            let engine = open_engine(&config, quiet)?;
            let format = config.output_format();
            let mode = if pre_execute {
                LintMode::PreExecute
            } else {
                LintMode::OnChange
            };

            let query_files = expand_files(&files)?;
            if query_files.is_empty() {
                miette::bail!("No SQL files matched");
            }

            let mut total_errors = 0;
            let mut total_warnings = 0;
            for query_file in &query_files {
                let content = fs::read_to_string(query_file).into_diagnostic()?;
                let diagnostics = engine.lint(&content, mode);
                tracing::info!(
                    file = %query_file.display(),
                    findings = diagnostics.len(),
                    "linted"
                );

                for diag in &diagnostics {
                    match diag.severity {
                        Severity::Error => total_errors += 1,
                        Severity::Warning => total_warnings += 1,
                        Severity::Info => {}
                    }
                }
                if !diagnostics.is_empty() || format != OutputFormat::Human {
                    let formatter =
                        OutputFormatter::new(format, query_file.display().to_string());
                    formatter.print_diagnostics(&diagnostics, &content);
                }
            }

            if !quiet && format == OutputFormat::Human {
                if total_errors > 0 || total_warnings > 0 {
                    eprintln!(
                        "Found {} error(s), {} warning(s) in {} file(s)",
                        total_errors,
                        total_warnings,
                        query_files.len()
                    );
                } else {
                    eprintln!("All {} file(s) passed", query_files.len());
                }
            }

            Ok(total_errors > 0)
        }

        Command::Suggest {
            file,
            offset,
            at,
            schema,
        } => {
            let config = Config::load(schema.config.as_deref())?.merge_with_args(&schema, &[]);
            let engine = open_engine(&config, quiet)?;
            let content = fs::read_to_string(&file).into_diagnostic()?;
            let cursor = match (offset, at) {
                (Some(offset), _) => offset,
                (None, Some(at)) => {
                    resolve_position(&content, &at).map_err(|e| miette::miette!(e))?
                }
                (None, None) => content.len(),
            };

            let buffer = engine.open_buffer();
            let result = buffer.analyze(content.as_str(), cursor).await;
            if !quiet && config.output_format() == OutputFormat::Human {
                let (line, col) = offset_to_line_col(&content, cursor);
                eprintln!(
                    "{}:{}:{} in {:?}",
                    file.display(),
                    line,
                    col,
                    result.clause_context.clause
                );
            }
            let formatter =
                OutputFormatter::new(config.output_format(), file.display().to_string());
            formatter.print_suggestions(&result.suggestions, cursor);
            buffer.close();

            Ok(false)
        }

        Command::Parse {
            file,
            dialect,
            format,
        } => {
            let config = Config::load(None)?;
            let dialect = resolve_dialect(dialect.as_deref().or(config.dialect.as_deref()))?;
            let content = fs::read_to_string(&file).into_diagnostic()?;
            let parser = SqlParser::new(dialect);
            let outcomes = parse_all(&parser, &content);
            let has_errors = outcomes.iter().any(|o| !o.is_parsed());

            match format.unwrap_or_else(|| config.output_format()) {
                OutputFormat::Human => {
                    for (i, outcome) in outcomes.iter().enumerate() {
                        let tree = outcome.tree();
                        println!("Statement {} ({:?}):", i + 1, tree.kind);
                        println!("  {}", parser.format(tree));
                        for clause in &tree.clauses {
                            println!(
                                "  clause {:?} at {}..{}",
                                clause.kind, clause.keyword.start, clause.keyword.end
                            );
                        }
                        for table in &tree.tables {
                            println!("  table {} as {:?}", table.qualified_name(), table.alias);
                        }
                        for column in &tree.columns {
                            println!(
                                "  column {:?}.{} in {:?}",
                                column.qualifier, column.name, column.clause
                            );
                        }
                        if let Some(failure) = outcome.failure() {
                            println!(
                                "  error at {}..{}: {}",
                                failure.range.start, failure.range.end, failure.message
                            );
                        }
                        println!();
                    }
                }
                OutputFormat::Json | OutputFormat::Sarif => {
                    let statements: Vec<_> = outcomes
                        .iter()
                        .map(|o| {
                            serde_json::json!({
                                "tree": o.tree(),
                                "error": o.failure().map(|f| &f.message),
                            })
                        })
                        .collect();
                    let json = serde_json::to_string_pretty(&statements).into_diagnostic()?;
                    println!("{}", json);
                }
            }

            Ok(has_errors)
        }

        Command::Schema { schema } => {
            let config = Config::load(schema.config.as_deref())?.merge_with_args(&schema, &[]);
            let dialect = resolve_dialect(config.dialect.as_deref())?;
            let cache = load_metadata(&config, dialect, quiet)?;
            let snapshot = cache.current();

            if config.output_format() != OutputFormat::Human {
                let json = serde_json::to_string_pretty(snapshot.as_ref()).into_diagnostic()?;
                println!("{}", json);
                return Ok(false);
            }

            println!("Schema Information (version {}):", snapshot.version);
            println!("==================");
            for (schema_name, schema) in &snapshot.schemas {
                println!("\nSchema: {}", schema_name);
                for table in schema.tables.values() {
                    println!("  {:?}: {}", table.kind, table.name);
                    for col in &table.columns {
                        let nullable = match col.nullable {
                            Some(false) => " NOT NULL",
                            Some(true) => " NULL",
                            None => "",
                        };
                        let key = if col.primary_key { " PRIMARY KEY" } else { "" };
                        println!("    - {} {}{}{}", col.name, col.data_type, nullable, key);
                    }
                }
            }

            Ok(false)
        }
    }
}

fn resolve_dialect(name: Option<&str>) -> Result<SqlDialect> {
    match name {
        Some(name) => name.parse().into_diagnostic(),
        None => Ok(SqlDialect::default()),
    }
}

/// Build a metadata cache from the configured schema files
fn load_metadata(
    config: &Config,
    dialect: SqlDialect,
    quiet: bool,
) -> Result<Arc<SharedMetadataCache>> {
    let schema_files = config.schema_files()?;
    if schema_files.is_empty() {
        miette::bail!(
            "No schema files specified. Use --schema, --schema-dir, or configure in sqlintel.toml"
        );
    }

    let mut builder = SnapshotBuilder::new(dialect);
    for schema_file in &schema_files {
        let content = fs::read_to_string(schema_file).into_diagnostic()?;
        builder.parse(&content);
    }
    let (draft, warnings) = builder.build();
    if !warnings.is_empty() && !quiet {
        eprintln!("Warning: Schema parsing produced {} warnings", warnings.len());
        for warning in &warnings {
            tracing::info!(%warning, "schema warning");
        }
    }

    let cache = Arc::new(SharedMetadataCache::new());
    cache.publish(ConnectionKey::new("cli"), draft);
    Ok(cache)
}

fn open_engine(config: &Config, quiet: bool) -> Result<Engine> {
    let dialect = resolve_dialect(config.dialect.as_deref())?;
    let cache = load_metadata(config, dialect, quiet)?;
    let engine = Engine::new(cache, config.engine_config());
    engine.prime(ConnectionCapabilities::new(dialect));
    Ok(engine)
}

/// Expand glob patterns; plain paths pass through
fn expand_files(patterns: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for pattern in patterns {
        let pattern_str = pattern.display().to_string();
        if pattern_str.contains('*') {
            files.extend(glob::glob(&pattern_str).into_diagnostic()?.flatten());
        } else {
            files.push(pattern.clone());
        }
    }
    Ok(files)
}
