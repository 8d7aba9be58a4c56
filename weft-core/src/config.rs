//! Runtime configuration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunables for a [`Runtime`](crate::Runtime).
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```rust
/// use weft_core::RuntimeConfig;
///
/// let config = RuntimeConfig::from_json(r#"{ "max_turns": 16 }"#).unwrap();
/// assert_eq!(config.max_turns, 16);
/// assert!(config.sweep_unvisited);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Prefix for fragment boundary marker labels (`"{prefix}:{name}:start"`).
    pub marker_prefix: String,

    /// Unmount components that were not visited during a completed root pass.
    pub sweep_unvisited: bool,

    /// Upper bound on turns executed by `Runtime::run_until_idle`.
    pub max_turns: usize,
}

impl RuntimeConfig {
    /// Parse a configuration from JSON, filling missing fields with defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            marker_prefix: "weft".to_string(),
            sweep_unvisited: true,
            max_turns: 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = RuntimeConfig::from_json(r#"{ "marker_prefix": "app" }"#).unwrap();
        assert_eq!(config.marker_prefix, "app");
        assert!(config.sweep_unvisited);
        assert_eq!(config.max_turns, 1024);
    }

    #[test]
    fn rejects_malformed_json() {
        let err = RuntimeConfig::from_json("{ max_turns: }").unwrap_err();
        assert!(err.to_string().starts_with("invalid configuration"));
    }
}
