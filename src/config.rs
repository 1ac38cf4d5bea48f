//! Runtime configuration read from `HEALTHPREDICT_*` environment variables.

use std::path::PathBuf;

pub const DATA_PATH_VAR: &str = "HEALTHPREDICT_DATA_PATH";
pub const MODEL_PATH_VAR: &str = "HEALTHPREDICT_MODEL_PATH";
pub const LOG_MODE_VAR: &str = "HEALTHPREDICT_LOG_MODE";
pub const LOG_FILE_VAR: &str = "HEALTHPREDICT_LOG_FILE";

const DEFAULT_DATA_PATH: &str = "data/patients.csv";
const DEFAULT_MODEL_PATH: &str = "model";
const DEFAULT_LOG_FILE: &str = "healthpredict.log";

/// Where log output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// File when stdout is a terminal, stdout otherwise.
    Auto,
    File,
    Stdout,
}

impl LogMode {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Self::File,
            "stdout" => Self::Stdout,
            _ => Self::Auto,
        }
    }

    /// Whether to log to a file, given whether stdout is interactive.
    ///
    /// Writing logs to the terminal would corrupt the alternate screen.
    #[must_use]
    pub fn use_file(self, interactive: bool) -> bool {
        match self {
            Self::File => true,
            Self::Stdout => false,
            Self::Auto => interactive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Visit CSV file
    pub data_path: PathBuf,
    /// Directory holding `model.json` and friends
    pub model_path: PathBuf,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, falling back to defaults for
    /// unset or blank values.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            data_path: get(DATA_PATH_VAR)
                .unwrap_or_else(|| DEFAULT_DATA_PATH.to_string())
                .into(),
            model_path: get(MODEL_PATH_VAR)
                .unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string())
                .into(),
            log_mode: get(LOG_MODE_VAR)
                .map(|v| LogMode::parse(&v))
                .unwrap_or(LogMode::Auto),
            log_file: get(LOG_FILE_VAR)
                .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string())
                .into(),
        }
    }
}
