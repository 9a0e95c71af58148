//! Default paths for classifiedsd
//!
//! Paths are user-writable by default (no root required):
//! - Config: `$XDG_CONFIG_HOME/classifieds/config.toml` or `~/.config/classifieds/config.toml`
//! - Data: `$XDG_DATA_HOME/classifiedsd` or `~/.local/share/classifiedsd`

use std::path::PathBuf;

/// Environment variable for overriding the data directory
pub const CLASSIFIEDS_DATA_DIR_ENV: &str = "CLASSIFIEDS_DATA_DIR";

/// Environment variable for overriding the config file path
pub const CLASSIFIEDS_CONFIG_ENV: &str = "CLASSIFIEDS_CONFIG";

/// Application subdirectory name
const APP_DIR: &str = "classifiedsd";

/// Config subdirectory name
const CONFIG_DIR: &str = "classifieds";

/// Database filename within the data directory
pub const DATABASE_FILENAME: &str = "classifieds.db";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$CLASSIFIEDS_CONFIG` environment variable (if set)
/// 2. `$XDG_CONFIG_HOME/classifieds/config.toml`
/// 3. `~/.config/classifieds/config.toml`
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CLASSIFIEDS_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(CONFIG_DIR).join("config.toml");
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR)
            .join("config.toml");
    }

    PathBuf::from("/etc").join(CONFIG_DIR).join("config.toml")
}

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$CLASSIFIEDS_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/classifiedsd` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/classifiedsd` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(CLASSIFIEDS_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    data_dir_without_env()
}

/// Get the data directory without checking CLASSIFIEDS_DATA_DIR.
/// Used for default values in configs where the env var is checked separately.
pub fn data_dir_without_env() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_contains_app_dir() {
        let path = data_dir_without_env();
        assert!(path.to_string_lossy().contains("classifiedsd"));
    }

    #[test]
    fn config_path_is_toml() {
        let path = default_config_path();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("toml"));
    }
}
