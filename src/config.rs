use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

use directories::BaseDirs;

/// Folder name used beneath the user's home directory for catalog data.
const DATA_DIR_NAME: &str = ".library-catalog";
/// Log file written inside the data directory unless overridden.
const LOG_FILE_NAME: &str = "library-catalog.log";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "LIBRARY_CATALOG_DIR";
/// Environment variable overriding the log file location.
pub const LOG_FILE_ENV: &str = "LIBRARY_CATALOG_LOG";

/// Where the catalog keeps its resources and its log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub log_file: PathBuf,
}

impl Config {
    /// Resolve the configuration from the environment, falling back to
    /// `~/.library-catalog` (or the working directory when no home exists).
    pub fn from_env() -> Self {
        let data_dir = non_empty_var(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);
        let log_file = non_empty_var(LOG_FILE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(LOG_FILE_NAME));

        Self { data_dir, log_file }
    }

    /// Configuration rooted at an explicit directory.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let log_file = data_dir.join(LOG_FILE_NAME);
        Self { data_dir, log_file }
    }
}

fn non_empty_var(key: &str) -> Option<OsString> {
    env::var_os(key).filter(|value| !value.is_empty())
}

fn default_data_dir() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(DATA_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_defaults_into_data_dir() {
        let config = Config::with_data_dir("/tmp/catalog");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/catalog"));
        assert_eq!(
            config.log_file,
            PathBuf::from("/tmp/catalog").join(LOG_FILE_NAME)
        );
    }
}
