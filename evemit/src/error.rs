//! Error types for emitter operations.

use std::fmt;

/// Errors returned synchronously by registration and emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmitterError {
    /// The event name was empty (or only whitespace).
    NoEventName,
    /// A listener is already registered under this name.
    DuplicateListeners(String),
    /// No listener is registered under this name.
    NoEventFound(String),
    /// The configured ceiling was reached. Carries the ceiling in effect.
    MaxListenerLimit(usize),
    /// The emitter has been shut down.
    EmitterClosed,
}

impl fmt::Display for EmitterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmitterError::NoEventName => write!(f, "No event name given"),
            EmitterError::DuplicateListeners(name) => {
                write!(f, "A listener is already registered for event '{name}'")
            }
            EmitterError::NoEventFound(name) => write!(f, "No event named '{name}' exists"),
            EmitterError::MaxListenerLimit(max) => {
                write!(f, "Max number of events reached ({max})")
            }
            EmitterError::EmitterClosed => write!(f, "Event emitter is closed"),
        }
    }
}

impl std::error::Error for EmitterError {}

/// Errors raised while loading an [`EmitterConfig`](crate::EmitterConfig).
#[derive(Debug)]
pub enum ConfigError {
    /// The source could not be read or parsed.
    Load(String),
    /// The values parsed but are not usable.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Load(msg) => write!(f, "Emitter config load error: {msg}"),
            ConfigError::Invalid(msg) => write!(f, "Invalid emitter config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Load(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_event_name() {
        let err = EmitterError::NoEventFound("data:once".into());
        assert_eq!(err.to_string(), "No event named 'data:once' exists");

        let err = EmitterError::DuplicateListeners("data".into());
        assert!(err.to_string().contains("'data'"));
    }

    #[test]
    fn test_display_limit_carries_ceiling() {
        assert_eq!(
            EmitterError::MaxListenerLimit(10).to_string(),
            "Max number of events reached (10)"
        );
    }

    #[test]
    fn test_config_error_from_yaml() {
        let yaml_err = serde_yaml::from_str::<u32>("not: [a number").unwrap_err();
        let err: ConfigError = yaml_err.into();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
