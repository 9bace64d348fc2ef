//! Checker configuration
//!
//! Loaded once per command and handed to the engine, pipeline and sinks as
//! an explicit snapshot. Nothing reads configuration behind the caller's back.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main configuration for the checker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckerConfig {
    /// Root of the settings repository
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_folder: Option<PathBuf>,

    /// Root of the reports tree (`<root>/<code>/<timestamp>/<report>`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reports_folder: Option<PathBuf>,

    /// History CSV file, or a directory to hold `results.csv`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv_path: Option<PathBuf>,

    /// Recent manual and PDI check logs
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// NOK mail recipients
    #[serde(default)]
    pub mail_recipients: Vec<String>,

    /// Directory for rendered NOK mails; mails are only logged when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail_outbox: Option<PathBuf>,

    #[serde(default)]
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Wait after a folder appears before looking for its report
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Report file extension, matched case-insensitively
    #[serde(default = "default_report_extension")]
    pub report_extension: String,
}

fn default_data_dir() -> PathBuf {
    swcheck_logging::swcheck_home()
        .map(|home| home.join("data"))
        .unwrap_or_else(|_| PathBuf::from("data"))
}

fn default_settle_delay_ms() -> u64 {
    5_000
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_report_extension() -> String {
    "xml".to_string()
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            report_extension: default_report_extension(),
        }
    }
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            settings_folder: None,
            reports_folder: None,
            csv_path: None,
            data_dir: default_data_dir(),
            mail_recipients: Vec::new(),
            mail_outbox: None,
            watch: WatchConfig::default(),
        }
    }
}

/// Whether the configured paths allow checks to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigStatus {
    Ready,
    SetupRequired { missing: Vec<&'static str> },
}

impl ConfigStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, ConfigStatus::Ready)
    }

    pub fn message(&self) -> String {
        match self {
            ConfigStatus::Ready => "All paths configured correctly.".to_string(),
            ConfigStatus::SetupRequired { missing } => {
                format!("Missing or invalid: {}", missing.join(", "))
            }
        }
    }
}

impl CheckerConfig {
    /// `<swcheck home>/config.toml`
    pub fn default_path() -> anyhow::Result<PathBuf> {
        Ok(swcheck_logging::swcheck_home()?.join("config.toml"))
    }

    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save configuration to a TOML file, normalizing mail recipients first.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut normalized = self.clone();
        normalized.mail_recipients = normalize_recipients(&self.mail_recipients);
        let content = toml::to_string_pretty(&normalized)?;

        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        fs::write(path, content).map_err(io_err)
    }

    pub fn status(&self) -> ConfigStatus {
        let mut missing = Vec::new();
        if !is_dir(self.settings_folder.as_deref()) {
            missing.push("Settings Folder");
        }
        if !is_dir(self.reports_folder.as_deref()) {
            missing.push("Reports Folder");
        }
        if missing.is_empty() {
            ConfigStatus::Ready
        } else {
            ConfigStatus::SetupRequired { missing }
        }
    }

    /// History CSV location; a directory means `results.csv` inside it.
    pub fn history_file(&self) -> Option<PathBuf> {
        let path = self.csv_path.as_ref()?;
        if path.is_dir() {
            Some(path.join("results.csv"))
        } else {
            Some(path.clone())
        }
    }

    pub fn manual_log_file(&self) -> PathBuf {
        self.data_dir.join("manual_scans_log.json")
    }

    pub fn pdi_log_file(&self) -> PathBuf {
        self.data_dir.join("pdi_checks_log.json")
    }
}

fn is_dir(path: Option<&Path>) -> bool {
    path.map(Path::is_dir).unwrap_or(false)
}

/// Trimmed addresses, dropping blanks and anything without `@`.
pub fn normalize_recipients(recipients: &[String]) -> Vec<String> {
    recipients
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty() && r.contains('@'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = CheckerConfig::default();
        assert_eq!(config.watch.settle_delay_ms, 5_000);
        assert_eq!(config.watch.poll_interval_ms, 1_000);
        assert_eq!(config.watch.report_extension, "xml");
        assert!(config.mail_recipients.is_empty());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let temp = TempDir::new().unwrap();
        let config = CheckerConfig::load(&temp.path().join("absent.toml")).unwrap();
        assert_eq!(config.settings_folder, None);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "settings_folder = \"/data/settings\"\n[watch]\nsettle_delay_ms = 250\n",
        )
        .unwrap();

        let config = CheckerConfig::load(&path).unwrap();
        assert_eq!(config.settings_folder, Some(PathBuf::from("/data/settings")));
        assert_eq!(config.watch.settle_delay_ms, 250);
        assert_eq!(config.watch.poll_interval_ms, 1_000);
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "settings_folder = [").unwrap();
        assert!(matches!(
            CheckerConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_save_normalizes_recipients() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.toml");
        let config = CheckerConfig {
            reports_folder: Some(temp.path().to_path_buf()),
            mail_recipients: vec![
                " qa@example.com ".into(),
                "".into(),
                "not-an-address".into(),
                "line@example.com".into(),
            ],
            ..CheckerConfig::default()
        };
        config.save(&path).unwrap();

        let loaded = CheckerConfig::load(&path).unwrap();
        assert_eq!(
            loaded.mail_recipients,
            vec!["qa@example.com".to_string(), "line@example.com".to_string()]
        );
        assert_eq!(loaded.reports_folder, config.reports_folder);
    }

    #[test]
    fn test_status_lists_missing_folders() {
        let temp = TempDir::new().unwrap();
        let mut config = CheckerConfig {
            settings_folder: Some(temp.path().to_path_buf()),
            reports_folder: Some(temp.path().join("missing")),
            ..CheckerConfig::default()
        };
        assert_eq!(
            config.status(),
            ConfigStatus::SetupRequired {
                missing: vec!["Reports Folder"]
            }
        );
        assert_eq!(config.status().message(), "Missing or invalid: Reports Folder");

        config.reports_folder = Some(temp.path().to_path_buf());
        assert!(config.status().is_ready());
    }

    #[test]
    fn test_history_file_in_directory() {
        let temp = TempDir::new().unwrap();
        let config = CheckerConfig {
            csv_path: Some(temp.path().to_path_buf()),
            ..CheckerConfig::default()
        };
        assert_eq!(config.history_file(), Some(temp.path().join("results.csv")));

        let config = CheckerConfig {
            csv_path: Some(temp.path().join("history.csv")),
            ..CheckerConfig::default()
        };
        assert_eq!(config.history_file(), Some(temp.path().join("history.csv")));
    }
}
