//! # WebPilot Error Types
//!
//! Centralized error handling for the performance layer.

use thiserror::Error;

/// Result type alias for WebPilot operations
pub type Result<T> = std::result::Result<T, WebPilotError>;

/// Core error types for WebPilot
#[derive(Error, Debug)]
pub enum WebPilotError {
    /// The wrapped automation call failed (element not found, navigation timeout, ...)
    #[error("Computation error: {0}")]
    Computation(#[source] anyhow::Error),

    /// Requested preset is not one of the recognized optimization profiles
    #[error("Unknown optimization profile: '{0}' (expected one of: speed, accuracy, balanced, batch)")]
    UnknownProfile(String),

    /// A mutating operation was routed through the caching path
    #[error("Operation is not cacheable: {0}")]
    NotCacheable(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Config file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Batch report could not be rendered as JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<anyhow::Error> for WebPilotError {
    fn from(err: anyhow::Error) -> Self {
        Self::Computation(err)
    }
}

impl WebPilotError {
    /// Create a new computation error from a message
    pub fn computation(msg: impl Into<String>) -> Self {
        Self::Computation(anyhow::anyhow!(msg.into()))
    }

    /// Create a new unknown profile error
    pub fn unknown_profile(name: impl Into<String>) -> Self {
        Self::UnknownProfile(name.into())
    }

    /// Create a new not cacheable error
    pub fn not_cacheable(msg: impl Into<String>) -> Self {
        Self::NotCacheable(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Whether resubmitting the same operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Computation(_) | Self::Io(_))
    }
}
