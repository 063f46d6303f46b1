// # SMTP Notifier
//
// Sends the PASS/FAIL messages produced by the reconciler over SMTP.
//
// ## Transport
//
// - `smtp_ssl = true`: implicit TLS from the first byte (usually port 465)
// - `smtp_ssl = false`: plain connection, upgraded with STARTTLS when the
//   server offers it (usually port 25 or 587)
//
// Every recipient gets an individual message. `From` carries the configured
// display name in front of the login address, which is also the envelope
// sender.
//
// ## Security Requirements
//
// - The SMTP password NEVER appears in logs or Debug output

use aliddns_core::config::MailConfig;
use aliddns_core::traits::Notifier;
use aliddns_core::{Error, Result};

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

/// SMTP notifier
pub struct SmtpNotifier {
    /// `"<sender>" <user>`
    from: Mailbox,

    /// Recipients that passed address validation
    recipients: Vec<String>,

    /// Connected lazily on each send
    transport: AsyncSmtpTransport<Tokio1Executor>,

    host: String,
    port: u16,
    implicit_tls: bool,
}

// Custom Debug implementation; the transport holds the credentials
impl std::fmt::Debug for SmtpNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpNotifier")
            .field("from", &self.from.to_string())
            .field("recipients", &self.recipients)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("implicit_tls", &self.implicit_tls)
            .finish()
    }
}

impl SmtpNotifier {
    /// Create a notifier from configuration
    ///
    /// # Errors
    ///
    /// - `Error::Config` if `user` is not a valid address, or no recipient is
    /// - `Error::Notify` if the TLS parameters cannot be built
    ///
    /// Invalid recipients are logged and dropped.
    pub fn new(config: &MailConfig) -> Result<Self> {
        let user: Address = config.user.trim().parse().map_err(|e| {
            Error::config(format!("[mail] user '{}' is not a valid address: {}", config.user, e))
        })?;

        let recipients = valid_recipients(&config.recipients);
        if recipients.is_empty() {
            return Err(Error::config("[mail] send_to has no valid recipient"));
        }

        let sender = config.sender.trim();
        let from = Mailbox::new(
            (!sender.is_empty()).then(|| sender.to_string()),
            user.clone(),
        );

        let builder = if config.smtp_ssl {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                .map_err(|e| {
                    Error::notify(format!("Invalid SMTP relay {}: {}", config.smtp_host, e))
                })?
        } else {
            let tls = TlsParameters::new(config.smtp_host.clone())
                .map_err(|e| Error::notify(format!("Failed to prepare STARTTLS: {}", e)))?;
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .tls(Tls::Opportunistic(tls))
        };

        let transport = builder
            .port(config.smtp_port)
            .credentials(Credentials::new(user.to_string(), config.password.clone()))
            .timeout(Some(Duration::from_secs(config.timeout_secs)))
            .build();

        Ok(Self {
            from,
            recipients,
            transport,
            host: config.smtp_host.clone(),
            port: config.smtp_port,
            implicit_tls: config.smtp_ssl,
        })
    }

    /// Recipients that passed validation
    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    /// Build the message for one recipient
    pub fn build_message(&self, to: &Address, subject: &str, body: &str) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(Mailbox::new(None, to.clone()))
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| Error::notify(format!("Failed to build message: {}", e)))
    }
}

/// Keep the addresses that parse, logging the rest
pub fn valid_recipients(candidates: &[String]) -> Vec<String> {
    candidates
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .filter(|r| match r.parse::<Address>() {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Dropping invalid recipient '{}': {}", r, e);
                false
            }
        })
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, subject: &str, body: &str, recipients: &[String]) -> Result<()> {
        let mut failures = Vec::new();

        for recipient in recipients {
            let to: Address = match recipient.parse() {
                Ok(to) => to,
                Err(e) => {
                    tracing::error!("Skipping invalid recipient '{}': {}", recipient, e);
                    continue;
                }
            };

            let message = self.build_message(&to, subject, body)?;
            match self.transport.send(message).await {
                Ok(response) => {
                    tracing::info!("Mail '{}' sent to {} ({:?})", subject, to, response.code());
                }
                Err(e) => {
                    tracing::warn!("Mail '{}' to {} failed: {}", subject, to, e);
                    failures.push(format!("{}: {}", to, e));
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::notify(format!(
                "{} of {} messages failed ({})",
                failures.len(),
                recipients.len(),
                failures.join("; ")
            )))
        }
    }
}
