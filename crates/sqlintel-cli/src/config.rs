//! Configuration file handling

use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use sqlintel_core::EngineConfig;
use std::path::{Path, PathBuf};

use crate::args::{OutputFormat, SchemaArgs};

const CONFIG_FILE: &str = "sqlintel.toml";

/// Configuration for sqlintel
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Schema file paths or patterns
    #[serde(default)]
    pub schema: Vec<String>,

    /// Schema directory
    pub schema_dir: Option<String>,

    /// SQL dialect (postgresql, mysql, sqlite, generic)
    #[serde(default)]
    pub dialect: Option<String>,

    /// Output format (human, json, sarif)
    #[serde(default)]
    pub format: Option<String>,

    /// Rule ids to disable (e.g., ["unused-cte"])
    #[serde(default)]
    pub disable: Vec<String>,

    /// Engine tunables
    #[serde(default)]
    pub engine: EngineConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).into_diagnostic()?;
        let config: Config = toml::from_str(&contents).into_diagnostic()?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Try to find and load sqlintel.toml in current directory or parent directories
    pub fn find_and_load() -> Result<Option<Self>> {
        let mut current_dir = std::env::current_dir().into_diagnostic()?;

        loop {
            let config_path = current_dir.join(CONFIG_FILE);
            if config_path.exists() {
                return Ok(Some(Self::from_file(&config_path)?));
            }

            if !current_dir.pop() {
                break;
            }
        }

        Ok(None)
    }

    /// Explicit path if given, otherwise search upward
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::find_and_load()?.unwrap_or_default()),
        }
    }

    /// Merge CLI arguments into configuration.
    /// CLI arguments take precedence over config file values.
    pub fn merge_with_args(mut self, args: &SchemaArgs, disable: &[String]) -> Self {
        if !args.schema.is_empty() {
            self.schema = args.schema.iter().map(|p| p.display().to_string()).collect();
        }

        if let Some(dir) = &args.schema_dir {
            self.schema_dir = Some(dir.display().to_string());
        }

        if let Some(dialect) = &args.dialect {
            self.dialect = Some(dialect.clone());
        }

        if let Some(fmt) = args.format {
            self.format = Some(format!("{:?}", fmt).to_lowercase());
        }

        if !disable.is_empty() {
            self.disable = disable.to_vec();
        }

        self
    }

    pub fn output_format(&self) -> OutputFormat {
        self.format
            .as_deref()
            .and_then(|f| f.parse().ok())
            .unwrap_or_default()
    }

    /// Engine settings with the top-level `disable` list folded in
    pub fn engine_config(&self) -> EngineConfig {
        let mut engine = self.engine.clone();
        for rule in &self.disable {
            if !engine.disabled_rules.contains(rule) {
                engine.disabled_rules.push(rule.clone());
            }
        }
        engine
    }

    /// Schema files named directly, plus every `.sql` file under `schema_dir`
    pub fn schema_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in &self.schema {
            if entry.contains('*') {
                files.extend(glob::glob(entry).into_diagnostic()?.flatten());
            } else {
                files.push(PathBuf::from(entry));
            }
        }

        if let Some(dir) = &self.schema_dir {
            let pattern = format!("{}/**/*.sql", dir);
            files.extend(glob::glob(&pattern).into_diagnostic()?.flatten());
        }

        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_with_engine_table() {
        let config: Config = toml::from_str(
            r#"
            schema = ["db/schema.sql"]
            dialect = "mysql"
            disable = ["unused-cte"]

            [engine]
            debounce_ms = 50
            disabled_rules = ["missing-where"]
            "#,
        )
        .unwrap();
        assert_eq!(config.dialect.as_deref(), Some("mysql"));
        assert_eq!(config.engine.debounce_ms, 50);
        assert_eq!(config.engine.max_suggestions, 50);
        assert_eq!(
            config.engine_config().disabled_rules,
            vec!["missing-where".to_string(), "unused-cte".to_string()]
        );
    }

    #[test]
    fn test_args_override_file() {
        let config = Config {
            dialect: Some("mysql".to_string()),
            format: Some("json".to_string()),
            ..Config::default()
        };
        let args = SchemaArgs {
            dialect: Some("sqlite".to_string()),
            ..SchemaArgs::default()
        };
        let merged = config.merge_with_args(&args, &[]);
        assert_eq!(merged.dialect.as_deref(), Some("sqlite"));
        assert_eq!(merged.output_format(), OutputFormat::Json);
    }
}
