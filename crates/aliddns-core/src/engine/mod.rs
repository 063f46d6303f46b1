//! Reconciliation engine
//!
//! The Reconciler runs exactly one cycle per call:
//! - Load the cached record, or describe it remotely when there is no cache
//! - Discover the current public IP via IpSource
//! - Compare against the cached value
//! - Update the record via DnsProvider when they differ
//! - Persist the new value and notify the operator
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐
//! │ StateStore  │     │  IpSource   │
//! │ (load)      │     │ (current)   │
//! └─────────────┘     └─────────────┘
//!        │                   │
//!        └─────────┬─────────┘
//!                  ▼
//!          ┌──────────────┐
//!          │  Reconciler  │
//!          └──────────────┘
//!                  │
//!     ┌────────────┼────────────┐
//!     ▼            ▼            ▼
//! ┌──────────┐ ┌──────────┐ ┌──────────┐
//! │DnsProvider│ │StateStore│ │ Notifier │
//! │ (update) │ │ (store)  │ │(PASS/FAIL)│
//! └──────────┘ └──────────┘ └──────────┘
//! ```
//!
//! ## Retry by Recurrence
//!
//! A failed update leaves the cache at the old value. The next scheduled
//! invocation sees the same discrepancy and tries again. There is no
//! in-process retry loop.

use std::fmt;
use std::net::IpAddr;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::RecordConfig;
use crate::traits::{CachedState, DnsProvider, IpSource, Notifier, StateStore};

/// Terminal state of one reconciliation cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Public IP matches the cached value; nothing was sent
    NoOp {
        value: String,
    },

    /// The record was updated
    Done {
        previous: String,
        current: String,
    },

    /// A provider call failed; the cache was not advanced
    Failed {
        action: ProviderAction,
        previous: Option<String>,
        attempted: Option<String>,
        detail: String,
    },

    /// Public IP discovery failed; nothing was changed or sent
    Aborted {
        reason: String,
    },
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOp { value } => write!(f, "no-op (record already {})", value),
            Self::Done { previous, current } => write!(f, "updated {} -> {}", previous, current),
            Self::Failed { action, detail, .. } => write!(f, "{} failed: {}", action, detail),
            Self::Aborted { reason } => write!(f, "aborted: {}", reason),
        }
    }
}

/// Provider operation named in notification subjects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderAction {
    Describe,
    Update,
}

impl ProviderAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Describe => "DescribeDomainRecord",
            Self::Update => "UpdateDomainRecord",
        }
    }
}

impl fmt::Display for ProviderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification verdict tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
        }
    }
}

/// Build a notification subject, e.g. `[example.com][PASS]UpdateDomainRecord`
pub fn subject(domain: &str, verdict: Verdict, action: ProviderAction) -> String {
    format!("[{}][{}]{}", domain, verdict.as_str(), action.as_str())
}

/// Compare a discovered address with a cached record value
///
/// Both sides are compared as addresses when they parse, so `::1` and
/// `0:0:0:0:0:0:0:1` are equal. Otherwise plain string equality.
pub fn values_match(current: &IpAddr, cached: &str) -> bool {
    match cached.trim().parse::<IpAddr>() {
        Ok(cached_ip) => cached_ip == *current,
        Err(_) => cached == current.to_string(),
    }
}

fn timestamp() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// One-shot reconciler
///
/// Owns its collaborators and the coordinates of the managed record. Holds
/// no other state: everything that must survive between runs goes through
/// the [`StateStore`].
pub struct Reconciler {
    /// IP source for discovering the public address
    ip_source: Box<dyn IpSource>,

    /// DNS provider for describing and updating the record
    provider: Box<dyn DnsProvider>,

    /// Local record cache
    state_store: Box<dyn StateStore>,

    /// Operator notifications
    notifier: Box<dyn Notifier>,

    /// Record to manage
    record: RecordConfig,

    /// Notification recipients
    recipients: Vec<String>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Parameters
    ///
    /// - `ip_source`: IP source implementation
    /// - `provider`: DNS provider implementation
    /// - `state_store`: State store implementation
    /// - `notifier`: Notifier implementation
    /// - `record`: The record to keep in sync
    /// - `recipients`: Who receives PASS/FAIL notifications
    pub fn new(
        ip_source: Box<dyn IpSource>,
        provider: Box<dyn DnsProvider>,
        state_store: Box<dyn StateStore>,
        notifier: Box<dyn Notifier>,
        record: RecordConfig,
        recipients: Vec<String>,
    ) -> Self {
        Self {
            ip_source,
            provider,
            state_store,
            notifier,
            record,
            recipients,
        }
    }

    /// The record this reconciler manages
    pub fn record(&self) -> &RecordConfig {
        &self.record
    }

    /// Run one reconciliation cycle
    ///
    /// Never fails: every error is converted into a terminal [`CycleOutcome`].
    pub async fn run_once(&self) -> CycleOutcome {
        let fqdn = self.record.fqdn();
        debug!(
            "Starting cycle for {} ({}) via {}",
            fqdn,
            self.record.record_type,
            self.provider.provider_name()
        );

        let cached = match self.load_or_describe().await {
            Ok(cached) => cached,
            Err(outcome) => return outcome,
        };

        let current_ip = match self.ip_source.current().await {
            Ok(ip) => ip,
            Err(e) => {
                warn!("Public IP discovery via {} failed: {}", self.ip_source.describe(), e);
                return CycleOutcome::Aborted {
                    reason: e.to_string(),
                };
            }
        };

        if values_match(&current_ip, &cached.value) {
            info!("{} already points at {}, nothing to do", fqdn, cached.value);
            return CycleOutcome::NoOp {
                value: cached.value,
            };
        }

        info!("{} changed: {} -> {}", fqdn, cached.value, current_ip);
        self.update(cached, current_ip.to_string()).await
    }

    /// Load the cache, falling back to a remote describe
    async fn load_or_describe(&self) -> Result<CachedState, CycleOutcome> {
        match self.state_store.load().await {
            Ok(Some(cached)) => {
                debug!(
                    "Using cached record {} = {} (written {})",
                    cached.record_id,
                    cached.value,
                    cached.last_written.to_rfc3339()
                );
                return Ok(cached);
            }
            Ok(None) => {
                info!("No usable cache, describing {} remotely", self.record.fqdn());
            }
            Err(e) => {
                warn!("Failed to read cache, describing remotely: {}", e);
            }
        }

        let remote = match self.provider.describe_record(&self.record).await {
            Ok(remote) => remote,
            Err(e) => {
                error!("Failed to describe {}: {}", self.record.fqdn(), e);
                let body = format!(
                    "Looking up host record {} of domain {} failed at {}.\n\nReason:\n\n{}",
                    self.record.rr,
                    self.record.domain_name,
                    timestamp(),
                    e
                );
                self.send(Verdict::Fail, ProviderAction::Describe, &body).await;
                return Err(CycleOutcome::Failed {
                    action: ProviderAction::Describe,
                    previous: None,
                    attempted: None,
                    detail: e.to_string(),
                });
            }
        };

        let state = CachedState::new(remote.record_id, remote.value);
        if let Err(e) = self.state_store.store(&state).await {
            error!("Failed to write initial cache: {}", e);
        } else {
            info!("Cached record {} = {}", state.record_id, state.value);
        }

        Ok(state)
    }

    /// Push a new value and record the result
    async fn update(&self, cached: CachedState, new_value: String) -> CycleOutcome {
        match self
            .provider
            .update_record(&cached.record_id, &self.record, &new_value)
            .await
        {
            Ok(result) => {
                info!(
                    "Updated {} -> {} (record {}, request {})",
                    self.record.fqdn(),
                    new_value,
                    result.record_id,
                    result.request_id.as_deref().unwrap_or("-")
                );

                let state = CachedState::new(cached.record_id.clone(), new_value.clone());
                if let Err(e) = self.state_store.store(&state).await {
                    // Remote record is already updated; still report Done
                    error!("Record updated but cache write failed: {}", e);
                }

                let body = format!(
                    "Host record {} of domain {} changed at {}.\n\nOld value: {}\nNew value: {}",
                    self.record.rr,
                    self.record.domain_name,
                    timestamp(),
                    cached.value,
                    new_value
                );
                self.send(Verdict::Pass, ProviderAction::Update, &body).await;

                CycleOutcome::Done {
                    previous: cached.value,
                    current: new_value,
                }
            }
            Err(e) => {
                if e.is_rejection() {
                    error!(
                        "{} refused update of {} to {}: {}",
                        self.provider.provider_name(),
                        self.record.fqdn(),
                        new_value,
                        e
                    );
                } else {
                    error!("Failed to update {} to {}: {}", self.record.fqdn(), new_value, e);
                }

                let body = format!(
                    "Changing host record {} of domain {} failed at {}.\n\n\
                     Old value: {}\nAttempted value: {}\n\nReason:\n\n{}",
                    self.record.rr,
                    self.record.domain_name,
                    timestamp(),
                    cached.value,
                    new_value,
                    e
                );
                self.send(Verdict::Fail, ProviderAction::Update, &body).await;

                CycleOutcome::Failed {
                    action: ProviderAction::Update,
                    previous: Some(cached.value),
                    attempted: Some(new_value),
                    detail: e.to_string(),
                }
            }
        }
    }

    /// Send a notification, logging and swallowing transport failures
    async fn send(&self, verdict: Verdict, action: ProviderAction, body: &str) {
        let subject = subject(&self.record.domain_name, verdict, action);

        if self.recipients.is_empty() {
            debug!("No recipients, skipping notification '{}'", subject);
            return;
        }

        match self.notifier.notify(&subject, body, &self.recipients).await {
            Ok(()) => debug!("Sent notification '{}'", subject),
            Err(e) => warn!("Failed to send notification '{}': {}", subject, e),
        }
    }
}
