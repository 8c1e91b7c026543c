//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Output document settings
    #[serde(default)]
    pub report: ReportConfig,

    /// Per-source defaults
    #[serde(default)]
    pub sources: SourcesConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::config("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::config("http.timeout_secs must be > 0"));
        }
        if self.report.stylesheet.trim().is_empty() {
            return Err(AppError::config("report.stylesheet is empty"));
        }
        Ok(())
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Output document settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Stylesheet href linked from the document head
    #[serde(default = "defaults::stylesheet")]
    pub stylesheet: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            stylesheet: defaults::stylesheet(),
        }
    }
}

/// Region and team defaults for the sources that filter on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// States searched on Active
    #[serde(default = "defaults::active_states")]
    pub active_states: Vec<String>,

    /// State listings read on CoolRunning
    #[serde(default = "defaults::coolrunning_states")]
    pub coolrunning_states: Vec<String>,

    /// States searched on Active in combined mode
    #[serde(default = "defaults::combined_states")]
    pub combined_states: Vec<String>,

    /// NYRR team code
    #[serde(default = "defaults::nyrr_team")]
    pub nyrr_team: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            active_states: defaults::active_states(),
            coolrunning_states: defaults::coolrunning_states(),
            combined_states: defaults::combined_states(),
            nyrr_team: defaults::nyrr_team(),
        }
    }
}

mod defaults {
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; raceresults/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn stylesheet() -> String {
        "rr.css".into()
    }
    pub fn active_states() -> Vec<String> {
        vec!["NJ".into()]
    }
    pub fn coolrunning_states() -> Vec<String> {
        vec!["ma".into()]
    }
    pub fn combined_states() -> Vec<String> {
        vec!["NY".into(), "NJ".into(), "PA".into()]
    }
    pub fn nyrr_team() -> String {
        "RARI".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [http]
            timeout_secs = 5

            [sources]
            nyrr_team = "CPTC"
            "#,
        )
        .unwrap();

        assert_eq!(config.http.timeout_secs, 5);
        assert!(!config.http.user_agent.is_empty());
        assert_eq!(config.report.stylesheet, "rr.css");
        assert_eq!(config.sources.nyrr_team, "CPTC");
        assert_eq!(config.sources.active_states, vec!["NJ".to_string()]);
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.http.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default("/nonexistent/raceresults.toml");
        assert_eq!(config.sources.coolrunning_states, vec!["ma".to_string()]);
    }
}
