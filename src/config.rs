//! Configuration file loading and CLI merging.
//!
//! The file is a flat `key = value` subset of TOML:
//!
//! ```toml
//! database_path = "/var/lib/indexer/catalog.db"
//! completion_threshold = 100   # percent
//! db_max_connections = 5
//! db_busy_timeout_ms = 5000
//! log_queries = false
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use indexer_core::{CompletionThreshold, DatabaseOptions};

use crate::cli::Cli;

/// Database file used when neither the CLI nor the config names one.
pub const DEFAULT_DATABASE_PATH: &str = "indexer.db";

/// Values read from the config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Path to the SQLite catalog.
    pub database_path: Option<PathBuf>,
    /// Completion threshold in percent (1..=100).
    pub completion_threshold: Option<u32>,
    /// Database pool max connections (1..=20).
    pub db_max_connections: Option<u32>,
    /// Database busy timeout in milliseconds (0..=120000).
    pub db_busy_timeout_ms: Option<u32>,
    /// Trace every SQL statement.
    pub log_queries: Option<bool>,
}

impl FileConfig {
    /// Validates config values against runtime constraints.
    pub fn validate(&self) -> Result<()> {
        if let Some(threshold) = self.completion_threshold
            && CompletionThreshold::new(threshold).is_err()
        {
            bail!(
                "Invalid config value for `completion_threshold`: {threshold}. Expected range: 1..=100"
            );
        }

        if let Some(value) = self.db_max_connections
            && !(1..=20).contains(&value)
        {
            bail!("Invalid config value for `db_max_connections`: {value}. Expected range: 1..=20");
        }

        if let Some(value) = self.db_busy_timeout_ms
            && value > 120_000
        {
            bail!("Invalid config value for `db_busy_timeout_ms`: {value}. Expected range: 0..=120000");
        }

        Ok(())
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Path that was consulted, if any.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Effective settings after merging CLI flags over file values.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_path: PathBuf,
    pub db_options: DatabaseOptions,
    pub threshold: CompletionThreshold,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/usenet-indexer/config.toml`
/// 2. `$HOME/.config/usenet-indexer/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("usenet-indexer")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("usenet-indexer")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config named on the command line, or the default one if present.
///
/// An explicit path must exist; a missing default file is not an error.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        let config = load_file_config(path)?;
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: Some(config),
        });
    }

    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

/// Merges CLI flags over file values over built-in defaults.
pub fn resolve_settings(cli: &Cli, file: Option<&FileConfig>) -> Result<Settings> {
    let file = file.cloned().unwrap_or_default();

    let database_path = cli
        .db
        .clone()
        .or(file.database_path)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH));

    let defaults = DatabaseOptions::default();
    let db_options = DatabaseOptions {
        max_connections: file.db_max_connections.unwrap_or(defaults.max_connections),
        busy_timeout_ms: file.db_busy_timeout_ms.unwrap_or(defaults.busy_timeout_ms),
        log_statements: cli.debug_db || file.log_queries.unwrap_or(false),
    };

    let threshold = match cli.command.threshold().or(file.completion_threshold) {
        Some(percent) => CompletionThreshold::new(percent)?,
        None => CompletionThreshold::default(),
    };

    Ok(Settings {
        database_path,
        db_options,
        threshold,
    })
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {}", line_index + 1);

        match key {
            "database_path" => {
                let parsed = parse_string_literal(value).with_context(context)?;
                cfg.database_path = Some(PathBuf::from(parsed));
            }
            "completion_threshold" => {
                cfg.completion_threshold = Some(parse_integer_u32(value).with_context(context)?);
            }
            "db_max_connections" => {
                cfg.db_max_connections = Some(parse_integer_u32(value).with_context(context)?);
            }
            "db_busy_timeout_ms" => {
                cfg.db_busy_timeout_ms = Some(parse_integer_u32(value).with_context(context)?);
            }
            "log_queries" => {
                cfg.log_queries = Some(parse_boolean(value).with_context(context)?);
            }
            unknown => {
                bail!(
                    "Unknown configuration key: '{}' on line {}",
                    unknown,
                    line_index + 1
                );
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u32(raw_value: &str) -> Result<u32> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i64>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u32::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u32"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected boolean value (true or false)"),
    }
}
