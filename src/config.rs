use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::event_log::FIELD_SEPARATOR;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Endpoints in report order.
    pub sites: Vec<String>,
    #[serde(default = "default_period_seconds")]
    pub period_seconds: f64,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,
    #[serde(default = "default_run_duration_seconds")]
    pub run_duration_seconds: u64,
    #[serde(default = "default_probe_timeout_seconds")]
    pub probe_timeout_seconds: u64,
}

fn default_period_seconds() -> f64 { 60.0 }
fn default_log_file() -> PathBuf { PathBuf::from("site_monitoring.log") }
fn default_report_dir() -> PathBuf { PathBuf::from(".") }
fn default_run_duration_seconds() -> u64 { 86_400 }
fn default_probe_timeout_seconds() -> u64 { 10 }

impl MonitorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: MonitorConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sites.is_empty() {
            return Err(ConfigError::Invalid("at least one site is required".into()));
        }
        if let Some(site) = self
            .sites
            .iter()
            .find(|s| s.trim().is_empty() || s.contains(FIELD_SEPARATOR))
        {
            return Err(ConfigError::Invalid(format!("unusable site address {site:?}")));
        }
        if let Some((i, site)) = self
            .sites
            .iter()
            .enumerate()
            .find(|&(i, s)| self.sites[..i].contains(s))
        {
            return Err(ConfigError::Invalid(format!(
                "site {site:?} listed twice (entry {})",
                i + 1
            )));
        }
        if !(self.period_seconds.is_finite() && self.period_seconds > 0.0) {
            return Err(ConfigError::Invalid("period_seconds must be positive".into()));
        }
        if Duration::try_from_secs_f64(self.period_seconds).is_err() {
            return Err(ConfigError::Invalid(format!(
                "period_seconds {} is too large",
                self.period_seconds
            )));
        }
        if self.probe_timeout_seconds == 0 {
            return Err(ConfigError::Invalid("probe_timeout_seconds must be positive".into()));
        }
        Ok(())
    }

    /// Falls back to the default period when `period_seconds` is not a
    /// representable duration; `validate` rejects such values up front.
    pub fn period(&self) -> Duration {
        Duration::try_from_secs_f64(self.period_seconds)
            .unwrap_or_else(|_| Duration::from_secs_f64(default_period_seconds()))
    }

    pub fn run_duration(&self) -> Duration {
        Duration::from_secs(self.run_duration_seconds)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: MonitorConfig =
            serde_json::from_str(r#"{ "sites": ["https://www.vtb.ru"] }"#).unwrap();
        assert_eq!(config.period(), Duration::from_secs(60));
        assert_eq!(config.log_file, PathBuf::from("site_monitoring.log"));
        assert_eq!(config.run_duration(), Duration::from_secs(86_400));
        assert_eq!(config.probe_timeout(), Duration::from_secs(10));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "sites": ["https://a.example.com", "https://b.example.com"],
                "period_seconds": 30,
                "log_file": "x.log"
            }"#,
        )
        .unwrap();

        let config = MonitorConfig::load(&path).unwrap();
        assert_eq!(config.sites.len(), 2);
        assert_eq!(config.period(), Duration::from_secs(30));
        assert_eq!(config.log_file, PathBuf::from("x.log"));
    }

    #[test]
    fn test_rejects_empty_site_list() {
        let config: MonitorConfig = serde_json::from_str(r#"{ "sites": [] }"#).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_site_containing_separator() {
        let config: MonitorConfig =
            serde_json::from_str(r#"{ "sites": ["https://a.example.com - b"] }"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_duplicate_site() {
        let config: MonitorConfig = serde_json::from_str(
            r#"{ "sites": ["https://a.example.com", "https://b.example.com",
                           "https://a.example.com"] }"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unrepresentable_period() {
        let json = r#"{ "sites": ["https://a.example.com"], "period_seconds": 1e30 }"#;
        let config: MonitorConfig = serde_json::from_str(json).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        assert_eq!(config.period(), Duration::from_secs(60));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = MonitorConfig::load(dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
