pub type CoreResult<T> = std::result::Result<T, CoreError>;

/// Failures raised while loading settings or touching the credential store
#[derive(Debug, Clone, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Credential file I/O failed: {message}")]
    Io { message: String },

    #[error("Credential record could not be encoded: {message}")]
    Serialization { message: String },

    #[error("Credential storage error: {message}")]
    Storage { message: String },

    #[error("Access revoked: {message}")]
    AccessRevoked { message: String },
}

impl CoreError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn storage_error(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        Self::invalid_config(err.to_string())
    }
}
