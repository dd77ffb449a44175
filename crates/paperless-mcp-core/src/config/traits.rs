//! Configuration source trait and errors

/// Source of raw configuration values
///
/// Implementations:
/// - `ProcessEnv`: Reads the process environment
/// - `MemoryEnv`: In-memory map for testing
pub trait EnvSource: Send + Sync {
    /// Get the raw value of a variable, if set
    fn get(&self, key: &str) -> Option<String>;

    /// Get a trimmed value, treating blank as unset
    fn get_trimmed(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Errors that can occur while loading configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("{var} {message}")]
    Invalid { var: String, message: String },
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid(var: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            var: var.into(),
            message: message.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
