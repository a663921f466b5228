//! Error types for wx-tiles metadata and configuration.

use thiserror::Error;

/// Result type alias using WxError.
pub type WxResult<T> = Result<T, WxError>;

/// Primary error type for metadata, style and configuration handling.
#[derive(Debug, Error)]
pub enum WxError {
    // === Configuration Errors ===
    #[error("Invalid configuration value for '{param}': {message}")]
    InvalidConfig { param: String, message: String },

    #[error("Failed to parse {format} document: {message}")]
    ParseError { format: &'static str, message: String },

    // === Metadata Errors ===
    #[error("Variable not found in dataset: {0}")]
    VariableNotFound(String),

    #[error("Invalid dataset metadata: {0}")]
    InvalidMetadata(String),

    #[error("IO error: {0}")]
    IoError(String),
}

impl WxError {
    /// Create an InvalidConfig error.
    pub fn invalid_config(param: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            param: param.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for WxError {
    fn from(err: std::io::Error) -> Self {
        WxError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for WxError {
    fn from(err: serde_json::Error) -> Self {
        WxError::ParseError {
            format: "JSON",
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for WxError {
    fn from(err: serde_yaml::Error) -> Self {
        WxError::ParseError {
            format: "YAML",
            message: err.to_string(),
        }
    }
}
