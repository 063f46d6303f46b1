// # Alibaba Cloud DNS Provider
//
// This crate provides the Alidns provider for aliddns: request signing and
// the two RPC calls the reconciler needs.
//
// - `DescribeDomainRecords`: find the record ID and current value
// - `UpdateDomainRecord`: point the record at a new value
//
// ## Architectural Constraints
//
// ### Trust Level: Untrusted (DNS Provider)
//
// **Allowed Capabilities**:
// - ✅ Perform HTTPS API calls to the configured endpoint only
// - ✅ Sign requests and parse provider-specific responses
//
// **Forbidden Capabilities**:
// - ❌ Implement retry logic (retry is by recurrence, owned by the scheduler)
// - ❌ Access the record cache (owned by Reconciler)
// - ❌ Send notifications (owned by Reconciler)
//
// ## Security Requirements
//
// - The AccessKey secret NEVER appears in logs or Debug output
//
// ## API Reference
//
// - Signature V3: https://www.alibabacloud.com/help/en/sdk/product-overview/v3-request-structure-and-signature
// - Error codes: https://api.aliyun.com/document/Alidns/2015-01-09/errorCode

pub mod sign;
pub mod types;

use aliddns_core::config::{ProviderConfig, RecordConfig};
use aliddns_core::traits::{DnsProvider, DomainRecord, UpdateResult};
use aliddns_core::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::sign::{
    Credential, PendingRequest, SignatureAlgorithm, Signer, StampSource, SystemStampSource,
};
use crate::types::{ApiError, DescribeDomainRecordsResponse, UpdateDomainRecordResponse};

/// Alidns API version
pub const ALIDNS_API_VERSION: &str = "2015-01-09";

/// Version of the SDK core whose request shape this client follows
const TEA_CORE_VERSION: &str = "0.3.0";

const PROVIDER_NAME: &str = "aliyun";

const ACTION_DESCRIBE: &str = "DescribeDomainRecords";
const ACTION_UPDATE: &str = "UpdateDomainRecord";

/// Alidns provider
///
/// # Trust Level: Untrusted
///
/// Stateless and single-shot: each trait call is exactly one signed POST.
pub struct AliyunProvider {
    /// API host, signed as the `host` header
    endpoint: String,

    /// Scheme and authority requests are sent to
    base_url: String,

    /// Request signer (holds the credential)
    signer: Signer,

    /// Timestamp and nonce source
    stamps: Box<dyn StampSource>,

    /// HTTP client for API requests
    client: reqwest::Client,

    user_agent: String,
}

// Custom Debug implementation that hides the credential
impl std::fmt::Debug for AliyunProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AliyunProvider")
            .field("endpoint", &self.endpoint)
            .field("base_url", &self.base_url)
            .field("algorithm", &self.signer.algorithm())
            .finish()
    }
}

impl AliyunProvider {
    /// Create a provider from configuration
    ///
    /// # Errors
    ///
    /// - `Error::Config` if the signature algorithm is not supported
    /// - `Error::Http` if the HTTP client cannot be built
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let algorithm: SignatureAlgorithm = config.signature_algorithm.parse()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: config.endpoint.clone(),
            base_url: format!("https://{}", config.endpoint),
            signer: Signer::new(
                algorithm,
                Credential::new(&config.access_key_id, &config.access_key_secret),
            ),
            stamps: Box::new(SystemStampSource),
            client,
            user_agent: default_user_agent(),
        })
    }

    /// Send requests to another base URL (e.g. `http://127.0.0.1:8080`)
    ///
    /// The signed `host` header still names the configured endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Replace the timestamp and nonce source
    pub fn with_stamp_source(mut self, stamps: impl StampSource + 'static) -> Self {
        self.stamps = Box::new(stamps);
        self
    }

    /// Sign and send one RPC call, decoding the success body as `T`
    async fn call<T: DeserializeOwned>(&self, action: &str, request: PendingRequest) -> Result<T> {
        let request = request
            .header("accept", "application/json")
            .header("host", self.endpoint.as_str())
            .header("user-agent", self.user_agent.as_str())
            .header("x-acs-action", action)
            .header("x-acs-version", ALIDNS_API_VERSION);

        let signed = self.signer.sign_request(request, self.stamps.as_ref())?;
        let url = format!("{}{}", self.base_url, signed.path_and_query());
        tracing::debug!("POST {} (action: {})", url, action);

        let mut builder = self.client.post(&url);
        for (name, value) in &signed.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let response = builder
            .header("Authorization", signed.authorization.as_str())
            .body(signed.body)
            .send()
            .await
            .map_err(|e| Error::http(format!("{} request failed: {}", action, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read {} response: {}", action, e)))?;
        tracing::debug!("{} response {}: {}", action, status, text);

        // Error-shaped bodies win regardless of status
        if let Ok(ApiError {
            code: Some(code),
            message,
            request_id,
        }) = serde_json::from_str::<ApiError>(&text)
        {
            let message = message.unwrap_or_default();
            tracing::error!(
                "{} rejected: {} - {} (request {})",
                action,
                code,
                message,
                request_id.as_deref().unwrap_or("-")
            );
            return Err(map_api_error(&code, &message));
        }

        if !status.is_success() {
            return Err(map_status(status, action, &text));
        }

        serde_json::from_str(&text).map_err(|e| {
            Error::provider(
                PROVIDER_NAME,
                format!("Invalid {} response: {}", action, e),
            )
        })
    }
}

/// Map an Alidns error code to an error kind
pub fn map_api_error(code: &str, message: &str) -> Error {
    let detail = format!("{}: {}", code, message);
    match code {
        "InvalidAccessKeyId.NotFound" | "SignatureDoesNotMatch" | "IncompleteSignature" => {
            Error::auth(detail)
        }
        "Throttling" | "Throttling.User" | "Throttling.Api" => Error::rate_limited(detail),
        "InvalidDomainName.NoExist"
        | "InvalidRecordId.NotFound"
        | "DomainRecordNotBelongToUser" => Error::not_found(detail),
        _ => Error::provider(PROVIDER_NAME, detail),
    }
}

/// Map a non-2xx status without an error body
fn map_status(status: reqwest::StatusCode, action: &str, body: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!("{} returned {}", action, status)),
        404 => Error::not_found(format!("{} returned {}", action, status)),
        429 => Error::rate_limited(format!("{} returned {}", action, status)),
        500..=599 => Error::provider(
            PROVIDER_NAME,
            format!("Server error (transient): {} - {}", status, body),
        ),
        _ => Error::provider(PROVIDER_NAME, format!("{} failed: {} - {}", action, status, body)),
    }
}

/// `User-Agent` in the form the official SDKs send
pub fn default_user_agent() -> String {
    format!(
        "AlibabaCloud ({}; {}) Rust/aliddns-{} Core/{} TeaDSL/1",
        std::env::consts::OS,
        std::env::consts::ARCH,
        env!("CARGO_PKG_VERSION"),
        TEA_CORE_VERSION
    )
}

#[async_trait]
impl DnsProvider for AliyunProvider {
    /// Describe the configured record
    ///
    /// `RRKeyWord` is a fuzzy filter on the API side (`www` also matches
    /// `www2`), so only a record whose `RR` and `Type` match exactly is
    /// accepted. Anything else is `NotFound`.
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /?DomainName=example.com&RRKeyWord=www&TypeKeyWord=A
    /// x-acs-action: DescribeDomainRecords
    /// ```
    async fn describe_record(&self, record: &RecordConfig) -> Result<DomainRecord> {
        let request = PendingRequest::rpc()
            .query("DomainName", record.domain_name.as_str())
            .query("RRKeyWord", record.rr.as_str())
            .query("TypeKeyWord", record.record_type.as_str());

        let response: DescribeDomainRecordsResponse = self.call(ACTION_DESCRIBE, request).await?;
        let records = response.domain_records.record;
        let candidates = records.len();

        let found = records
            .into_iter()
            .find(|r| {
                r.rr == record.rr && r.record_type.eq_ignore_ascii_case(record.record_type.as_str())
            })
            .ok_or_else(|| {
                Error::not_found(format!(
                    "No {} record named {} ({} candidates, none exact)",
                    record.record_type,
                    record.fqdn(),
                    candidates
                ))
            })?;

        tracing::debug!(
            "Found record {} = {} (total {}, request {})",
            found.record_id,
            found.value,
            response.total_count.unwrap_or(0),
            response.request_id.as_deref().unwrap_or("-")
        );

        Ok(DomainRecord {
            record_id: found.record_id,
            value: found.value,
            rr: found.rr,
            record_type: found.record_type,
        })
    }

    /// Update the record value
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /?RR=www&RecordId=123&Type=A&Value=1.2.3.4
    /// x-acs-action: UpdateDomainRecord
    /// ```
    async fn update_record(
        &self,
        record_id: &str,
        record: &RecordConfig,
        value: &str,
    ) -> Result<UpdateResult> {
        tracing::info!(
            "Updating Alidns record {} ({}) -> {}",
            record.fqdn(),
            record_id,
            value
        );

        let request = PendingRequest::rpc()
            .query("RR", record.rr.as_str())
            .query("RecordId", record_id)
            .query("Type", record.record_type.as_str())
            .query("Value", value);

        let response: UpdateDomainRecordResponse = self.call(ACTION_UPDATE, request).await?;

        Ok(UpdateResult {
            record_id: response.record_id,
            request_id: response.request_id,
        })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}
