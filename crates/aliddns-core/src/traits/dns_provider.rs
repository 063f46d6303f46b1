// # DNS Provider Trait
//
// Defines the interface for reading and writing the managed record through
// the provider API.
//
// ## Implementations
//
// - Alibaba Cloud DNS: `aliddns-provider-aliyun` crate
//
// ## Usage
//
// ```rust,ignore
// use aliddns_core::{DnsProvider, RecordConfig, RecordType};
//
// #[tokio::main(flavor = "current_thread")]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//     let record = RecordConfig::new("example.com", "www", RecordType::A);
//
//     let remote = provider.describe_record(&record).await?;
//     provider.update_record(&remote.record_id, &record, "1.2.3.4").await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::config::RecordConfig;

/// One DNS resource record as the provider reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRecord {
    /// Provider-assigned identifier, stable across value updates
    pub record_id: String,
    /// Current record value
    pub value: String,
    /// Host record (e.g. `www`)
    pub rr: String,
    /// Record type (e.g. `A`)
    pub record_type: String,
}

/// Acknowledgement of an accepted update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResult {
    /// Record the provider reports as updated
    pub record_id: String,
    /// Provider request ID, useful when opening a support ticket
    pub request_id: Option<String>,
}

/// Trait for DNS provider implementations
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTPS API calls to the provider endpoint only
/// - ✅ Sign requests and parse provider-specific responses
/// - ✅ Return success or failure
///
/// ## Forbidden Capabilities
/// - ❌ Implement retry logic or backoff (retry happens by recurrence)
/// - ❌ Access the record cache (owned by `Reconciler`)
/// - ❌ Send notifications (owned by `Reconciler`)
/// - ❌ Decide whether an update is needed (owned by `Reconciler`)
///
/// Each call is single-shot: exactly one HTTP request, no hidden state.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Look up the record matching the configured host record and type
    ///
    /// # Returns
    ///
    /// - `Ok(DomainRecord)`: The record's ID and current value
    /// - `Err(Error)`: Transport failure, error-shaped response, or no match
    async fn describe_record(&self, record: &RecordConfig) -> Result<DomainRecord, crate::Error>;

    /// Point the record at a new value
    ///
    /// # Parameters
    ///
    /// - `record_id`: Identifier from a previous describe (usually cached)
    /// - `record`: Host record, zone and type
    /// - `value`: The new record value
    async fn update_record(
        &self,
        record_id: &str,
        record: &RecordConfig,
        value: &str,
    ) -> Result<UpdateResult, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
