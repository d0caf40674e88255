// Error types for the Laress runtime

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Binding not found: {0}")]
    BindingNotFound(String),

    #[error("Binding '{key}' does not hold a value of type {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("Service already registered: {0}")]
    DuplicateServiceRegistration(String),

    #[error("Failed to resolve '{key}': {message}")]
    Resolution { key: String, message: String },

    #[error("Service provider '{provider}' failed: {message}")]
    Provider { provider: String, message: String },

    #[error("Container was dropped while its service manager was still in use")]
    ContainerDropped,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap a failure raised while computing a binding's value
    pub fn resolution(key: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Error::Resolution {
            key: key.into(),
            message: err.to_string(),
        }
    }

    /// Wrap a failure raised from a provider's `register` or `boot` hook
    pub fn provider(provider: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Error::Provider {
            provider: provider.into(),
            message: err.to_string(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Http(_) => 400,
            Error::BindingNotFound(_)
            | Error::TypeMismatch { .. }
            | Error::DuplicateServiceRegistration(_)
            | Error::Resolution { .. }
            | Error::Provider { .. }
            | Error::ContainerDropped
            | Error::Config(_)
            | Error::Serialization(_)
            | Error::Io(_) => 500,
        }
    }

    /// True when the error is a miss that a parent container may satisfy
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::BindingNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
