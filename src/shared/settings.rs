use serde::{Deserialize, Serialize};
use crate::core::format::FormatPolicy;
use crate::shared::errors::{EngineError, EngineResult};

/// Environment variable holding a JSON settings document
pub const SETTINGS_ENV: &str = "CALC_WIDGETS_SETTINGS";
/// Environment variable overriding the log filter
pub const LOG_ENV: &str = "CALC_WIDGETS_LOG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineSettings {
    /// Text shown for results outside a relation's domain (e.g. log of a negative)
    pub undefined_marker: String,
    /// Policy used when neither the field nor its calculator declares one
    pub default_format: FormatPolicy,
    /// tracing-subscriber `EnvFilter` directive
    pub log_filter: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            undefined_marker: "Undefined".to_string(),
            default_format: FormatPolicy::TrimTrailingZeros(4),
            log_filter: "info".to_string(),
        }
    }
}

impl EngineSettings {
    pub fn from_json(content: &str) -> EngineResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| EngineError::Settings(format!("Failed to parse settings: {}", e)))
    }

    /// Defaults, overlaid with `CALC_WIDGETS_SETTINGS` and `CALC_WIDGETS_LOG` when set
    pub fn from_env() -> EngineResult<Self> {
        let mut settings = match std::env::var(SETTINGS_ENV) {
            Ok(content) => Self::from_json(&content)?,
            Err(_) => Self::default(),
        };

        if let Ok(filter) = std::env::var(LOG_ENV) {
            if !filter.trim().is_empty() {
                settings.log_filter = filter;
            }
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = EngineSettings::from_json(r#"{"undefinedMarker":"n/a"}"#).unwrap();
        assert_eq!(settings.undefined_marker, "n/a");
        assert_eq!(settings.default_format, FormatPolicy::TrimTrailingZeros(4));
        assert_eq!(settings.log_filter, "info");
    }

    #[test]
    fn test_format_policy_from_json() {
        let settings = EngineSettings::from_json(
            r#"{"defaultFormat":{"policy":"fixed","arg":2}}"#,
        )
        .unwrap();
        assert_eq!(settings.default_format, FormatPolicy::Fixed(2));
    }

    #[test]
    fn test_invalid_json_is_settings_error() {
        let err = EngineSettings::from_json("[").unwrap_err();
        assert!(matches!(err, EngineError::Settings(_)));
    }
}
