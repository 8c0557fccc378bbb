use crate::error::{ChanlogError, Result};
use crate::logs::{Level, LoggerOptions, RotationPeriod, DEFAULT_MAX_FILES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Channel used when the caller does not name one
pub const DEFAULT_CHANNEL: &str = "tvm";

/// Environment variable that overrides the configured log directory
pub const LOG_PATH_ENV: &str = "CHANLOG_PATH";

/// Fallback log directory, relative to the working directory
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Upper bound for `max_files`
const MAX_RETAINED_FILES: usize = 365;

/// Registry-wide logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Channel returned by `ChannelRegistry::get_default`
    #[serde(default = "default_channel")]
    pub channel: String,

    /// Preferred log directory; used only if it is an existing directory
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Directory used when `log_dir` is unset or unusable
    #[serde(default = "default_log_dir")]
    pub default_log_dir: PathBuf,

    /// Whether new loggers use a rotating sink
    #[serde(default = "default_rotate")]
    pub rotate: bool,

    /// Rotated files kept per channel (0 keeps all)
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// Append the serialized context after each message
    #[serde(default)]
    pub include_context: bool,

    /// Rotation granularity
    #[serde(default)]
    pub rotation: RotationPeriod,

    /// Minimum level written
    #[serde(default)]
    pub level: Level,
}

// Default value functions for serde
fn default_channel() -> String {
    DEFAULT_CHANNEL.to_string()
}

fn default_log_dir() -> PathBuf {
    PathBuf::from(DEFAULT_LOG_DIR)
}

fn default_rotate() -> bool {
    true
}

fn default_max_files() -> usize {
    DEFAULT_MAX_FILES
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            channel: default_channel(),
            log_dir: None,
            default_log_dir: default_log_dir(),
            rotate: default_rotate(),
            max_files: default_max_files(),
            include_context: false,
            rotation: RotationPeriod::default(),
            level: Level::default(),
        }
    }
}

impl LoggerConfig {
    /// Load configuration from a file (supports TOML and JSON)
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ChanlogError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        let mut config = match extension {
            "toml" => Self::parse_toml(&contents)?,
            "json" => Self::parse_json(&contents)?,
            _ => {
                return Err(ChanlogError::InvalidConfig(format!(
                    "Unsupported file format: {}. Use .toml or .json",
                    extension
                )))
            }
        };

        config.expand_env_vars();
        config.validate()?;

        Ok(config)
    }

    fn parse_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| ChanlogError::InvalidConfig(format!("Failed to parse TOML: {}", e)))
    }

    fn parse_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| ChanlogError::InvalidConfig(format!("Failed to parse JSON: {}", e)))
    }

    /// Apply the `CHANLOG_PATH` override, if set
    pub fn with_env(mut self) -> Self {
        if let Ok(dir) = std::env::var(LOG_PATH_ENV) {
            if !dir.trim().is_empty() {
                self.log_dir = Some(PathBuf::from(dir));
            }
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_channel(&self.channel).map_err(|_| {
            ChanlogError::ConfigValidationError(format!(
                "channel must be a plain file name, got {:?}",
                self.channel
            ))
        })?;

        if self.default_log_dir.as_os_str().is_empty() {
            return Err(ChanlogError::ConfigValidationError(
                "default_log_dir cannot be empty".to_string(),
            ));
        }

        if self.max_files > MAX_RETAINED_FILES {
            return Err(ChanlogError::ConfigValidationError(format!(
                "max_files cannot exceed {}",
                MAX_RETAINED_FILES
            )));
        }

        Ok(())
    }

    /// First of {configured directory, default directory} that exists
    ///
    /// When neither exists the default is returned and the error shows up on
    /// the first write.
    pub fn resolve_log_dir(&self) -> PathBuf {
        match self.log_dir {
            Some(ref dir) if dir.is_dir() => dir.clone(),
            _ => self.default_log_dir.clone(),
        }
    }

    /// Options handed to every logger built from this configuration
    pub fn logger_options(&self) -> LoggerOptions {
        LoggerOptions {
            rotate: self.rotate,
            max_files: self.max_files,
            include_context: self.include_context,
            rotation: self.rotation,
            level: self.level,
        }
    }

    /// Expand environment variables in path fields
    fn expand_env_vars(&mut self) {
        if let Some(ref dir) = self.log_dir {
            self.log_dir = Some(expand_env_in_path(dir));
        }
        self.default_log_dir = expand_env_in_path(&self.default_log_dir);
    }
}

/// Check that a channel name can be used as a file stem
pub fn validate_channel(channel: &str) -> Result<()> {
    let invalid = channel.is_empty()
        || channel == "."
        || channel == ".."
        || channel.contains(['/', '\\', '\0']);

    if invalid {
        Err(ChanlogError::InvalidChannel(channel.to_string()))
    } else {
        Ok(())
    }
}

/// Expand `$VAR` and `${VAR}` in a string
fn expand_env_in_string(s: &str) -> String {
    let mut result = s.to_string();

    for (key, value) in std::env::vars() {
        result = result.replace(&format!("${{{}}}", key), &value);
        result = result.replace(&format!("${}", key), &value);
    }

    result
}

fn expand_env_in_path(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    PathBuf::from(expand_env_in_string(&path_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let config = LoggerConfig::default();

        assert_eq!(config.channel, "tvm");
        assert_eq!(config.log_dir, None);
        assert_eq!(config.default_log_dir, PathBuf::from("logs"));
        assert!(config.rotate);
        assert_eq!(config.max_files, 7);
        assert!(!config.include_context);
        assert_eq!(config.rotation, RotationPeriod::Daily);
        assert_eq!(config.level, Level::Debug);
    }

    #[test]
    fn test_validate_channel() {
        assert!(validate_channel("ka").is_ok());
        assert!(validate_channel("app-worker.2").is_ok());
        assert!(validate_channel("").is_err());
        assert!(validate_channel("..").is_err());
        assert!(validate_channel("a/b").is_err());
        assert!(validate_channel("a\\b").is_err());
    }

    #[test]
    fn test_validate_bad_channel() {
        let config = LoggerConfig {
            channel: "../escape".to_string(),
            ..LoggerConfig::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ChanlogError::ConfigValidationError(_))
        ));
    }

    #[test]
    fn test_validate_max_files_limit() {
        let config = LoggerConfig {
            max_files: 1000,
            ..LoggerConfig::default()
        };

        assert!(matches!(
            config.validate(),
            Err(ChanlogError::ConfigValidationError(_))
        ));
    }

    #[test]
    fn test_resolve_prefers_existing_configured_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config = LoggerConfig {
            log_dir: Some(temp_dir.path().to_path_buf()),
            default_log_dir: PathBuf::from("/somewhere/else"),
            ..LoggerConfig::default()
        };

        assert_eq!(config.resolve_log_dir(), temp_dir.path());
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = LoggerConfig {
            log_dir: Some(temp_dir.path().join("missing")),
            default_log_dir: temp_dir.path().to_path_buf(),
            ..LoggerConfig::default()
        };

        assert_eq!(config.resolve_log_dir(), temp_dir.path());
    }

    #[test]
    fn test_resolve_ignores_regular_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("not-a-dir");
        fs::write(&file, "").unwrap();

        let config = LoggerConfig {
            log_dir: Some(file),
            default_log_dir: temp_dir.path().to_path_buf(),
            ..LoggerConfig::default()
        };

        assert_eq!(config.resolve_log_dir(), temp_dir.path());
    }

    #[test]
    fn test_parse_toml() {
        let toml_content = r#"
            channel = "ka"
            rotate = false
            max_files = 3
            include_context = true
            rotation = "monthly"
            level = "warning"
        "#;

        let config = LoggerConfig::parse_toml(toml_content).unwrap();
        assert_eq!(config.channel, "ka");
        assert!(!config.rotate);
        assert_eq!(config.max_files, 3);
        assert!(config.include_context);
        assert_eq!(config.rotation, RotationPeriod::Monthly);
        assert_eq!(config.level, Level::Warning);
    }

    #[test]
    fn test_parse_json_partial() {
        let config = LoggerConfig::parse_json(r#"{ "channel": "ka" }"#).unwrap();
        assert_eq!(config.channel, "ka");
        assert_eq!(config.max_files, 7);
        assert!(config.rotate);
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("CHANLOG_TEST_ROOT", "/var/tmp");

        let mut config = LoggerConfig {
            log_dir: Some(PathBuf::from("${CHANLOG_TEST_ROOT}/app")),
            default_log_dir: PathBuf::from("$CHANLOG_TEST_ROOT/fallback"),
            ..LoggerConfig::default()
        };
        config.expand_env_vars();

        assert_eq!(config.log_dir, Some(PathBuf::from("/var/tmp/app")));
        assert_eq!(config.default_log_dir, PathBuf::from("/var/tmp/fallback"));
    }

    #[test]
    fn test_logger_options_mapping() {
        let config = LoggerConfig {
            rotate: false,
            max_files: 2,
            include_context: true,
            ..LoggerConfig::default()
        };

        let options = config.logger_options();
        assert!(!options.rotate);
        assert_eq!(options.max_files, 2);
        assert!(options.include_context);
    }

    #[test]
    fn test_from_file_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("chanlog.toml");
        fs::write(&config_path, "channel = \"jobs\"\nmax_files = 14\n").unwrap();

        let config = LoggerConfig::from_file(&config_path).unwrap();
        assert_eq!(config.channel, "jobs");
        assert_eq!(config.max_files, 14);
    }

    #[test]
    fn test_from_file_unsupported_format() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("chanlog.yaml");
        fs::write(&config_path, "channel: ka").unwrap();

        let result = LoggerConfig::from_file(&config_path);
        assert!(matches!(result, Err(ChanlogError::InvalidConfig(_))));
    }
}
