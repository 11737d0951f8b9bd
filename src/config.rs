use crate::error::{Result, ValuationError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for series construction and history windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EngineConfig {
    #[schemars(
        description = "Largest number of days a single dense series may span. Guards against corrupted or far-future snapshot dates."
    )]
    pub max_span_days: i64,

    #[schemars(description = "Days covered by the 'month' history window")]
    pub month_window_days: u64,

    #[schemars(description = "Days covered by the 'year' history window")]
    pub year_window_days: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_span_days: 36_600,
            month_window_days: 31,
            year_window_days: 365,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_span_days < 1 {
            return Err(ValuationError::InvalidConfig(format!(
                "max_span_days must be at least 1, got {}",
                self.max_span_days
            )));
        }
        if self.month_window_days == 0 || self.year_window_days == 0 {
            return Err(ValuationError::InvalidConfig(
                "history windows must cover at least one day".to_string(),
            ));
        }
        if self.month_window_days > self.year_window_days {
            return Err(ValuationError::InvalidConfig(format!(
                "month window ({} days) is longer than year window ({} days)",
                self.month_window_days, self.year_window_days
            )));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&schemars::schema_for!(EngineConfig))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config = EngineConfig::from_json_str(r#"{"max_span_days": 400}"#).unwrap();
        assert_eq!(config.max_span_days, 400);
        assert_eq!(config.month_window_days, 31);
        assert_eq!(config.year_window_days, 365);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"max_span_days": 0}"#),
            Err(ValuationError::InvalidConfig(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"month_window_days": 400}"#),
            Err(ValuationError::InvalidConfig(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str("not json"),
            Err(ValuationError::SerializationError(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = EngineConfig::from_path("/definitely/not/here/engine.json");
        assert!(matches!(result, Err(ValuationError::IoError(_))));
    }

    #[test]
    fn test_schema_mentions_fields() {
        let schema = EngineConfig::schema_as_json().unwrap();
        assert!(schema.contains("max_span_days"));
    }
}
