// src/config.rs
use serde::Deserialize;
use std::path::PathBuf;

pub const ENV_PREFIX: &str = "WORKTIME_";
pub const DEFAULT_REGISTRY_TITLE: &str = "项目及成员管理";

// --- Configuration ---

/// Run settings, read from `WORKTIME_*` environment variables (and `.env`).
/// Command-line flags take precedence.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Report recoverable problems (unknown employees, gap days, bad cells).
    #[serde(default)]
    pub strict: bool,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    /// Expected registry sheet name (title cell for CSV); empty disables the check.
    #[serde(default = "default_registry_title")]
    pub registry_title: String,
    #[serde(default = "default_registry_header_rows")]
    pub registry_header_rows: usize,
    #[serde(default = "default_identity_columns")]
    pub identity_columns: usize,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_registry_title() -> String {
    DEFAULT_REGISTRY_TITLE.to_string()
}

fn default_registry_header_rows() -> usize {
    2
}

fn default_identity_columns() -> usize {
    6
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            strict: false,
            output_dir: default_output_dir(),
            log_file: None,
            registry_title: default_registry_title(),
            registry_header_rows: default_registry_header_rows(),
            identity_columns: default_identity_columns(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        // Load .env file if it exists
        dotenv::dotenv().ok();

        envy::prefixed(ENV_PREFIX).from_env::<AppConfig>()
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(ENV_PREFIX).from_iter(vars)
    }

    /// Column holding the first day of the month in a timesheet row.
    pub fn first_day_column(&self) -> usize {
        self.identity_columns + 1
    }
}
