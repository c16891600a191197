//! Error types for the player and driver.
//!
//! Nothing in this crate panics on a missing collaborator. Operations return a
//! `PlayerError`, log it at the failure site, and leave the player usable.

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum PlayerError {
    /// A host element (timer, slider, label, button) could not be found.
    #[error("Missing element: {what}")]
    MissingElement { what: String },

    /// The timing clock or shape animation list is absent when required.
    #[error("Uninitialized state: {what}")]
    UninitializedState { what: String },

    /// No containing context is registered to receive notifications.
    #[error("No host context available")]
    HostUnavailable,

    /// Playback rate must be finite and strictly positive.
    #[error("Invalid playback rate: {rate}")]
    InvalidRate { rate: f64 },

    /// Configuration failed to parse or validate.
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    /// A host collaborator reported a failure (e.g. a JS call threw).
    #[error("Host error: {message}")]
    Host { message: String },
}

impl PlayerError {
    pub fn missing(what: impl Into<String>) -> Self {
        Self::MissingElement { what: what.into() }
    }

    pub fn uninitialized(what: impl Into<String>) -> Self {
        Self::UninitializedState { what: what.into() }
    }

    pub fn host(message: impl Into<String>) -> Self {
        Self::Host {
            message: message.into(),
        }
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::MissingElement { .. } => "element",
            Self::UninitializedState { .. } => "state",
            Self::HostUnavailable | Self::Host { .. } => "host",
            Self::InvalidRate { .. } | Self::InvalidConfig { .. } => "validation",
        }
    }
}

impl From<serde_json::Error> for PlayerError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidConfig {
            reason: err.to_string(),
        }
    }
}
