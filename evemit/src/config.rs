use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default ceiling on registered event names and in-flight emissions.
pub const DEFAULT_MAX_LISTENERS: usize = 10;

/// Default number of listener failures buffered for slow subscribers.
pub const DEFAULT_FAILURE_CAPACITY: usize = 64;

/// Environment variable overriding [`EmitterConfig::max_listeners`].
pub const MAX_LISTENERS_ENV: &str = "EVEMIT_MAX_LISTENERS";

/// Construction-time settings for an [`EventEmitter`](crate::EventEmitter).
///
/// Can be built in code, or loaded from YAML either as a bare mapping or
/// nested under an `emitter:` key:
///
/// ```yaml
/// emitter:
///   max_listeners: 32
///   failure_capacity: 128
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmitterConfig {
    /// Ceiling on distinct registered names, also applied to queue depth.
    pub max_listeners: usize,
    /// Buffer size of the listener failure broadcast channel.
    pub failure_capacity: usize,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            max_listeners: DEFAULT_MAX_LISTENERS,
            failure_capacity: DEFAULT_FAILURE_CAPACITY,
        }
    }
}

#[derive(Deserialize)]
struct Nested {
    emitter: EmitterConfig,
}

impl EmitterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_listeners(mut self, max: usize) -> Self {
        self.max_listeners = max;
        self
    }

    pub fn failure_capacity(mut self, capacity: usize) -> Self {
        self.failure_capacity = capacity;
        self
    }

    /// Parse a YAML document. Missing keys fall back to their defaults.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let yaml: serde_yaml::Value = serde_yaml::from_str(content)?;
        let has_section = yaml
            .as_mapping()
            .map(|m| m.contains_key("emitter"))
            .unwrap_or(false);
        let config = if has_section {
            serde_yaml::from_value::<Nested>(yaml)?.emitter
        } else if yaml.is_null() {
            EmitterConfig::default()
        } else {
            serde_yaml::from_value(yaml)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup(MAX_LISTENERS_ENV) {
            self.max_listeners = raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("{MAX_LISTENERS_ENV} must be an integer, got '{raw}'"))
            })?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_capacity == 0 {
            return Err(ConfigError::Invalid(
                "failure_capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EmitterConfig::default();
        assert_eq!(config.max_listeners, 10);
        assert_eq!(config.failure_capacity, DEFAULT_FAILURE_CAPACITY);
    }

    #[test]
    fn test_yaml_nested_section() {
        let config = EmitterConfig::from_yaml_str("emitter:\n  max_listeners: 32\n").unwrap();
        assert_eq!(config.max_listeners, 32);
        assert_eq!(config.failure_capacity, DEFAULT_FAILURE_CAPACITY);
    }

    #[test]
    fn test_yaml_bare_mapping() {
        let config =
            EmitterConfig::from_yaml_str("max_listeners: 3\nfailure_capacity: 8\n").unwrap();
        assert_eq!(config, EmitterConfig::new().max_listeners(3).failure_capacity(8));
    }

    #[test]
    fn test_yaml_empty_document_is_default() {
        assert_eq!(EmitterConfig::from_yaml_str("").unwrap(), EmitterConfig::default());
    }

    #[test]
    fn test_yaml_rejects_zero_failure_capacity() {
        let err = EmitterConfig::from_yaml_str("failure_capacity: 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_yaml_rejects_wrong_type() {
        let err = EmitterConfig::from_yaml_str("max_listeners: lots").unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn test_env_override() {
        let config = EmitterConfig::default()
            .with_overrides_from(|key| (key == MAX_LISTENERS_ENV).then(|| " 25 ".to_string()))
            .unwrap();
        assert_eq!(config.max_listeners, 25);

        let err = EmitterConfig::default()
            .with_overrides_from(|_| Some("many".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
