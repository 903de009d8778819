//! Command-line tool configuration.
//!
//! The library itself takes no configuration. The `mimetree` binary reads
//! an optional TOML file from:
//! 1. `$MIMETREE_CONFIG` (environment variable)
//! 2. `~/.config/mimetree/config.toml` (Linux/macOS)
//!    `%APPDATA%\mimetree\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV: &str = "MIMETREE_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level when neither `RUST_LOG` nor `-v` is given:
    /// "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// How commands print their results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Indent the output of `mimetree json`.
    pub pretty_json: bool,
    /// Show body sizes in `mimetree tree`.
    pub show_sizes: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pretty_json: true,
            show_sizes: true,
        }
    }
}

/// Load configuration from the standard location.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    match config_file_path() {
        Some(path) if path.exists() => load_config_from(&path),
        _ => Config::default(),
    }
}

/// Load configuration from `path`, falling back to defaults on any error.
pub fn load_config_from(path: &Path) -> Config {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to read config file, using defaults"
            );
            return Config::default();
        }
    };
    match toml::from_str::<Config>(&contents) {
        Ok(cfg) => {
            tracing::debug!(path = %path.display(), "Loaded config");
            cfg
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "Failed to parse config, using defaults"
            );
            Config::default()
        }
    }
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("mimetree").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert!(cfg.output.pretty_json);
        assert!(cfg.output.show_sizes);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[output]
pretty_json = false
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert!(!cfg.output.pretty_json);
        assert!(cfg.output.show_sizes);
        assert_eq!(cfg.general.log_level, "warn");
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[general]\nlog_level = \"debug\"").expect("write");
        let cfg = load_config_from(file.path());
        assert_eq!(cfg.general.log_level, "debug");
    }

    #[test]
    fn test_load_invalid_config_falls_back() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "this is = = not toml").expect("write");
        assert_eq!(load_config_from(file.path()), Config::default());
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cfg = load_config_from(&dir.path().join("absent.toml"));
        assert_eq!(cfg, Config::default());
    }
}
