//! Error types for layer loading and registry configuration

use std::path::PathBuf;

use thiserror::Error;

/// Errors from a single layer's load attempt.
///
/// None of these abort other layers: the controller reports them and leaves
/// the layer visible but empty.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Network or file read failure (including non-2xx responses)
    #[error("failed to fetch '{location}': {message}")]
    Fetch { location: String, message: String },

    /// Malformed JSON, or no `{ ... }` object found in a wrapped source
    #[error("failed to parse layer data: {0}")]
    Parse(String),

    /// Valid JSON whose top-level shape is not GeoJSON we understand
    #[error("unsupported GeoJSON format. Type: {0}")]
    UnsupportedFormat(String),
}

impl LoadError {
    pub fn fetch(location: impl Into<String>, message: impl ToString) -> Self {
        LoadError::Fetch {
            location: location.into(),
            message: message.to_string(),
        }
    }
}

/// Errors while reading a layer registry file
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read registry '{0}': {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("invalid registry '{0}': {1}")]
    Toml(PathBuf, #[source] toml::de::Error),

    #[error("duplicate layer id: {0}")]
    DuplicateId(String),

    #[error("layer '{0}' has an empty id")]
    EmptyId(String),

    #[error("registry defines no layers")]
    Empty,
}
