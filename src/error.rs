use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnarlError {
    /// Error when a mutex/rwlock is poisoned
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    /// Error when acquiring a statistics lock fails
    #[error("Failed to acquire statistics lock: {0}")]
    StatisticsLock(String),

    /// I/O errors from file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration file could not be parsed
    #[error("Failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Settings could not be written as TOML
    #[error("Failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Status or telemetry could not be encoded as JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration location or content
    #[error("Config error: {0}")]
    Config(String),

    /// A module name that is not part of the pipeline
    #[error("Unknown module: {0}")]
    UnknownModule(String),

    /// A control command that could not be parsed
    #[error("Invalid control command: {0}")]
    InvalidCommand(String),

    /// A worker thread panicked before it could be joined
    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),

    /// Processing was started twice
    #[error("Packet processing is already running")]
    AlreadyRunning,

    /// Processing was stopped while not running
    #[error("Packet processing is not running")]
    NotRunning,
}

/// A convenient Result type alias using `SnarlError`.
pub type Result<T> = std::result::Result<T, SnarlError>;

impl SnarlError {
    /// Creates a new lock poisoned error with a descriptive message.
    pub fn lock_poisoned(resource: &str) -> Self {
        Self::LockPoisoned(format!("Failed to acquire lock on {}", resource))
    }

    /// Creates a new statistics lock error.
    pub fn stats_lock(module: &str) -> Self {
        Self::StatisticsLock(format!("{} statistics", module))
    }
}

/// Convert `SnarlError` to a String for control responses.
impl From<SnarlError> for String {
    fn from(error: SnarlError) -> Self {
        error.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helper_messages() {
        assert_eq!(
            SnarlError::lock_poisoned("settings").to_string(),
            "Lock poisoned: Failed to acquire lock on settings"
        );
        assert_eq!(
            SnarlError::stats_lock("rate_limit").to_string(),
            "Failed to acquire statistics lock: rate_limit statistics"
        );
    }

    #[test]
    fn test_into_string() {
        let message: String = SnarlError::UnknownModule("jitter".to_string()).into();
        assert_eq!(message, "Unknown module: jitter");
    }
}
