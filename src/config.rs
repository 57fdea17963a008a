use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::utils::RetryConfig;

// ============================================================================
// Application Configuration
// ============================================================================
//
// Defaults live here; `from_env` overlays DUNA_* variables on top of them.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub analysis: AnalysisConfig,
    pub history: HistoryConfig,
    pub upload: UploadConfig,
}

/// Retry policy for the image analysis call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// How far back the order history view reaches
    pub recent_months: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Top-level remote folder order sheets are filed under
    pub root_folder: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::from_retry(&RetryConfig::default()),
            history: HistoryConfig { recent_months: 3 },
            upload: UploadConfig {
                root_folder: "Pedidos Duna Canarias".to_string(),
            },
        }
    }
}

impl AnalysisConfig {
    pub fn from_retry(retry: &RetryConfig) -> Self {
        Self {
            max_attempts: retry.max_attempts,
            initial_delay_ms: retry.initial_delay.as_millis() as u64,
            max_delay_ms: retry.max_delay.as_millis() as u64,
            multiplier: retry.multiplier,
        }
    }

    /// Named retry policy: `default`, `aggressive` or `conservative`
    pub fn preset(name: &str) -> Option<Self> {
        let retry = match name.trim().to_ascii_lowercase().as_str() {
            "default" => RetryConfig::default(),
            "aggressive" => RetryConfig::aggressive(),
            "conservative" => RetryConfig::conservative(),
            _ => return None,
        };
        Some(Self::from_retry(&retry))
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            multiplier: self.multiplier,
        }
    }
}

impl AppConfig {
    /// Defaults overlaid with DUNA_* environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with whatever `lookup` returns for each key
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // The preset is the base; individual settings below refine it
        if let Some(v) = lookup("DUNA_ANALYSIS_RETRY_PRESET") {
            config.analysis = AnalysisConfig::preset(&v).ok_or_else(|| {
                invalid(
                    "DUNA_ANALYSIS_RETRY_PRESET",
                    &v,
                    "expected default, aggressive or conservative",
                )
            })?;
        }
        if let Some(v) = lookup("DUNA_ANALYSIS_MAX_ATTEMPTS") {
            config.analysis.max_attempts = parse("DUNA_ANALYSIS_MAX_ATTEMPTS", &v)?;
        }
        if let Some(v) = lookup("DUNA_ANALYSIS_INITIAL_DELAY_MS") {
            config.analysis.initial_delay_ms = parse("DUNA_ANALYSIS_INITIAL_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("DUNA_ANALYSIS_MAX_DELAY_MS") {
            config.analysis.max_delay_ms = parse("DUNA_ANALYSIS_MAX_DELAY_MS", &v)?;
        }
        if let Some(v) = lookup("DUNA_ANALYSIS_MULTIPLIER") {
            config.analysis.multiplier = parse("DUNA_ANALYSIS_MULTIPLIER", &v)?;
        }
        if let Some(v) = lookup("DUNA_HISTORY_MONTHS") {
            config.history.recent_months = parse("DUNA_HISTORY_MONTHS", &v)?;
        }
        if let Some(v) = lookup("DUNA_UPLOAD_ROOT") {
            config.upload.root_folder = v;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analysis.max_attempts == 0 {
            return Err(invalid("DUNA_ANALYSIS_MAX_ATTEMPTS", "0", "must be at least 1"));
        }
        if self.analysis.multiplier.is_nan() || self.analysis.multiplier < 1.0 {
            return Err(invalid(
                "DUNA_ANALYSIS_MULTIPLIER",
                &self.analysis.multiplier.to_string(),
                "must be >= 1.0",
            ));
        }
        if self.upload.root_folder.trim().is_empty() {
            return Err(invalid("DUNA_UPLOAD_ROOT", &self.upload.root_folder, "must not be empty"));
        }
        Ok(())
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| invalid(key, value, &e.to_string()))
}
