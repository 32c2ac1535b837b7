//! Centralized configuration for phonebook-server.
//!
//! All environment variables are loaded and validated at startup to fail fast
//! on misconfiguration rather than at request time. Defaults reproduce the
//! fixed local setup: port 8080, SQLite under `./data`, and the templates
//! shipped next to this crate.

use std::env;
use std::path::PathBuf;

use thiserror::Error;

const DEFAULT_TEMPLATE_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/templates");

/// Storage backend provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageProvider {
    /// In-memory storage (data lost on restart)
    Memory,
    /// SQLite file-based storage
    Sqlite,
}

impl StorageProvider {
    fn from_str(s: &str) -> Result<Self, ConfigError> {
        if s.eq_ignore_ascii_case("sqlite") {
            Ok(Self::Sqlite)
        } else if s.eq_ignore_ascii_case("memory") {
            Ok(Self::Memory)
        } else {
            Err(ConfigError {
                field: "STORAGE_PROVIDER",
                message: format!("unknown provider '{}': expected 'sqlite' or 'memory'", s),
            })
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_str(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Configuration error.
#[derive(Debug, Error)]
#[error("Configuration error for {field}: {message}")]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 8080)
    pub port: u16,
    /// Storage provider (default: sqlite)
    pub storage_provider: StorageProvider,
    /// SQLite database path
    pub db_path: PathBuf,
    /// Directory the HTML templates are loaded from on each request
    pub template_dir: PathBuf,
    /// Log format
    pub log_format: LogFormat,
}

impl Config {
    /// Load and validate configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parse_port(env::var("PORT").ok().as_deref())?;

        let storage_provider = StorageProvider::from_str(
            &env::var("STORAGE_PROVIDER")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "sqlite".into()),
        )?;

        let db_path = env::var("DB_PATH")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/phonebook.db"));

        let template_dir = env::var("TEMPLATE_DIR")
            .ok()
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TEMPLATE_DIR));

        let log_format =
            LogFormat::from_str(&env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".into()));

        Ok(Self {
            port,
            storage_provider,
            db_path,
            template_dir,
            log_format,
        })
    }

    /// Templates are read per request, so a missing directory only shows up
    /// as 500s later. Say so at startup.
    pub fn warn_if_templates_missing(&self) {
        if !self.template_dir.is_dir() {
            tracing::warn!(
                template_dir = %self.template_dir.display(),
                "TEMPLATE_DIR does not exist: every page will fail with a template error"
            );
        }
    }
}

fn parse_port(raw: Option<&str>) -> Result<u16, ConfigError> {
    match raw {
        None | Some("") => Ok(8080),
        Some(s) => s.parse().map_err(|e| ConfigError {
            field: "PORT",
            message: format!("invalid port '{}': {}", s, e),
        }),
    }
}
