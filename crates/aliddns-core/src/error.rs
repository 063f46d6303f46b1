//! Error type shared by the reconciler and its plugins
//!
//! Variants follow how the reconciler reacts to them: `Config` stops the
//! process, discovery errors abort the cycle, provider errors produce a FAIL
//! notification, and notification errors are only logged.

use thiserror::Error;

/// Result type alias for aliddns operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Public IP lookup failed or returned something unusable
    #[error("Public IP lookup failed: {0}")]
    IpSource(String),

    /// Record cache could not be read or written
    #[error("Record cache error: {0}")]
    StateStore(String),

    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Mail could not be delivered
    #[error("Notification failed: {0}")]
    Notify(String),

    /// Connect, timeout or unreadable body
    #[error("HTTP error: {0}")]
    Http(String),

    /// Bad AccessKey or rejected signature
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Throttled by the provider
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Domain or record does not exist for this account
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Any other error code returned by the provider
    #[error("Provider error ({provider}): {message}")]
    Provider {
        provider: String,
        message: String,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn ip_source(msg: impl Into<String>) -> Self {
        Self::IpSource(msg.into())
    }

    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn notify(msg: impl Into<String>) -> Self {
        Self::Notify(msg.into())
    }

    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Error reported by a named provider, e.g. `Error::provider("aliyun", "Forbidden.RAM - ...")`
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error must stop the process before any cycle runs
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Whether the provider refused the call itself, as opposed to the
    /// transport failing
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Authentication(_)
                | Self::RateLimited(_)
                | Self::NotFound(_)
                | Self::Provider { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let err = Error::provider("aliyun", "IncorrectDomainUser - domain not owned");
        assert_eq!(
            err.to_string(),
            "Provider error (aliyun): IncorrectDomainUser - domain not owned"
        );
    }

    #[test]
    fn test_only_config_errors_are_fatal() {
        assert!(Error::config("missing [account] access_key_id").is_fatal());
        assert!(!Error::http("timed out").is_fatal());
        assert!(!Error::notify("login refused").is_fatal());
    }

    #[test]
    fn test_rejection_vs_transport() {
        assert!(Error::auth("SignatureDoesNotMatch").is_rejection());
        assert!(Error::rate_limited("Throttling.User").is_rejection());
        assert!(!Error::http("connection refused").is_rejection());
        assert!(!Error::ip_source("empty body").is_rejection());
    }
}
