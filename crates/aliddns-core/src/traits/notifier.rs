// # Notifier Trait
//
// Defines the interface for telling an operator about record changes and
// failed provider calls.
//
// ## Implementations
//
// - SMTP: `aliddns-notify-smtp` crate

use async_trait::async_trait;

/// Trait for notification transports
///
/// A failed notification is logged by the caller and never changes the
/// outcome of a cycle: losing the message must not mask or duplicate the
/// DNS-side result.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message to every recipient
    ///
    /// # Parameters
    ///
    /// - `subject`: Message subject (carries the PASS/FAIL tag)
    /// - `body`: Plain-text body
    /// - `recipients`: Addresses; each receives its own message
    async fn notify(
        &self,
        subject: &str,
        body: &str,
        recipients: &[String],
    ) -> Result<(), crate::Error>;
}
