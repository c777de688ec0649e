//! Unified error handling for the authorization engine.

use crate::permission::Permission;
use thiserror::Error;

/// Engine-wide result type
pub type Result<T> = std::result::Result<T, AuthzError>;

/// Authorization engine error types.
///
/// Only `AccessDenied` ever escapes an authorization point. Every other
/// variant is caught inside a policy's `authorize()` and degraded to an
/// Indeterminate permission carrying the error as its cause.
#[derive(Error, Debug)]
pub enum AuthzError {
    #[error("{0}")]
    AccessDenied(Box<AccessDeniedError>),

    #[error("No resource given to policy \"{0}\"")]
    MissingResource(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid policy configuration: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<serde_json::Error> for AuthzError {
    fn from(err: serde_json::Error) -> Self {
        AuthzError::Config(err.to_string())
    }
}

impl From<AccessDeniedError> for AuthzError {
    fn from(err: AccessDeniedError) -> Self {
        AuthzError::AccessDenied(Box::new(err))
    }
}

/// Structured denial raised by an authorization point after combining.
///
/// Carries everything the calling layer needs to render the failure: the
/// point that denied, the combined permission, the actor and the resource
/// under authorization.
#[derive(Debug)]
pub struct AccessDeniedError {
    /// Name of the authorization point that raised the denial
    pub point: String,
    /// The combined permission that led to the denial
    pub permission: Permission,
    /// Username of the denied actor, `None` for anonymous actors
    pub username: Option<String>,
    /// Human-readable name of the resource that was requested
    pub resource: String,
    /// Fully rendered denial message
    pub message: String,
}

impl std::fmt::Display for AccessDeniedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for AccessDeniedError {}
