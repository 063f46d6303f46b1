//! ACS3-HMAC-SHA256 request signing
//!
//! Every Alibaba Cloud API call carries an `Authorization` header computed
//! over a canonical form of the request:
//!
//! ```text
//! METHOD
//! PATH
//! canonical query string
//! canonical headers (one `name:value\n` per header)
//!
//! signed header names (`;`-joined)
//! hex(sha256(body))
//! ```
//!
//! The string to sign is `ACS3-HMAC-SHA256\n` followed by the hex SHA-256 of
//! that canonical request, and the signature is its HMAC-SHA256 under the
//! access key secret. A single byte of difference anywhere makes the API
//! reject the request with `SignatureDoesNotMatch`.
//!
//! Reference: <https://www.alibabacloud.com/help/en/sdk/product-overview/v3-request-structure-and-signature>

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use aliddns_core::{Error, Result};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

/// Wire name of the only supported algorithm
pub const ACS3_HMAC_SHA256: &str = "ACS3-HMAC-SHA256";

/// SHA-256 of an empty payload
pub const EMPTY_BODY_SHA256: &str =
    "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

/// Format of `x-acs-date`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

type HmacSha256 = Hmac<Sha256>;

/// Request signature algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureAlgorithm {
    #[default]
    Acs3HmacSha256,
}

impl SignatureAlgorithm {
    /// Wire name, as it appears in the string to sign and `Authorization`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Acs3HmacSha256 => ACS3_HMAC_SHA256,
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            ACS3_HMAC_SHA256 => Ok(Self::Acs3HmacSha256),
            other => Err(Error::config(format!(
                "Unsupported signature algorithm '{}' (only {} is supported)",
                other, ACS3_HMAC_SHA256
            ))),
        }
    }
}

/// Access key pair
///
/// The Debug implementation never shows the secret.
#[derive(Clone)]
pub struct Credential {
    pub access_key_id: String,
    /// ⚠️ NEVER log this value
    access_key_secret: String,
}

impl Credential {
    pub fn new(access_key_id: impl Into<String>, access_key_secret: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<REDACTED>")
            .finish()
    }
}

/// Canonical query string
///
/// Entries without a value are dropped, keys are sorted by byte value, and
/// values are percent-encoded leaving only `A-Z a-z 0-9 - _ . ~` as is.
pub fn canonical_query_string(params: &BTreeMap<String, Option<String>>) -> String {
    params
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .map(|v| format!("{}={}", key, urlencoding::encode(v)))
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Canonical header block and signed header list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalHeaders {
    /// `name:value\n` per header, names ascending
    pub block: String,
    /// Header names joined with `;`
    pub signed_headers: String,
    /// The canonical (name, value) pairs the block was rendered from
    pub entries: Vec<(String, String)>,
}

/// Canonicalize request headers
///
/// Names are lower-cased and values trimmed. Repeated names are merged into
/// one entry whose values are sorted and joined with `,`.
pub fn canonicalize_headers(headers: &[(String, String)]) -> CanonicalHeaders {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in headers {
        grouped
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.trim().to_string());
    }

    let entries: Vec<(String, String)> = grouped
        .into_iter()
        .map(|(name, mut values)| {
            values.sort();
            (name, values.join(","))
        })
        .collect();

    let block = entries
        .iter()
        .map(|(name, value)| format!("{}:{}\n", name, value))
        .collect::<String>();
    let signed_headers = entries
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    CanonicalHeaders {
        block,
        signed_headers,
        entries,
    }
}

/// Lower-case hex digest of `bytes`
pub fn hash(algorithm: SignatureAlgorithm, bytes: &[u8]) -> String {
    match algorithm {
        SignatureAlgorithm::Acs3HmacSha256 => hex::encode(Sha256::digest(bytes)),
    }
}

/// Assemble the canonical request
pub fn canonical_request(
    method: &str,
    path: &str,
    canonical_query: &str,
    canonical_headers: &str,
    signed_headers: &str,
    payload_hash: &str,
) -> String {
    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method, path, canonical_query, canonical_headers, signed_headers, payload_hash
    )
}

/// Build the string to sign from the parts of a canonical request
pub fn build_string_to_sign(
    algorithm: SignatureAlgorithm,
    method: &str,
    path: &str,
    canonical_query: &str,
    canonical_headers: &str,
    signed_headers: &str,
    payload_hash: &str,
) -> String {
    let request = canonical_request(
        method,
        path,
        canonical_query,
        canonical_headers,
        signed_headers,
        payload_hash,
    );
    tracing::debug!("CanonicalRequest:\n{}", request);

    format!("{}\n{}", algorithm.as_str(), hash(algorithm, request.as_bytes()))
}

/// Lower-case hex MAC of `string_to_sign` under `secret`
pub fn sign(algorithm: SignatureAlgorithm, secret: &str, string_to_sign: &str) -> Result<String> {
    match algorithm {
        SignatureAlgorithm::Acs3HmacSha256 => {
            let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
                .map_err(|e| Error::Other(format!("HMAC error: {}", e)))?;
            mac.update(string_to_sign.as_bytes());
            Ok(hex::encode(mac.finalize().into_bytes()))
        }
    }
}

/// Render the `Authorization` header value
pub fn authorization_header(
    algorithm: SignatureAlgorithm,
    access_key_id: &str,
    signed_headers: &str,
    signature: &str,
) -> String {
    format!(
        "{} Credential={},SignedHeaders={},Signature={}",
        algorithm.as_str(),
        access_key_id,
        signed_headers,
        signature
    )
}

/// Source of the per-request timestamp and nonce
pub trait StampSource: Send + Sync {
    /// UTC timestamp in [`TIMESTAMP_FORMAT`]
    fn timestamp(&self) -> String;

    /// Value unique to this request
    fn nonce(&self) -> String;
}

/// Wall clock and random UUID v4 nonces
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemStampSource;

impl StampSource for SystemStampSource {
    fn timestamp(&self) -> String {
        Utc::now().format(TIMESTAMP_FORMAT).to_string()
    }

    fn nonce(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Fixed timestamp and nonce, for reproducible signatures
#[derive(Debug, Clone)]
pub struct FixedStampSource {
    pub timestamp: String,
    pub nonce: String,
}

impl FixedStampSource {
    pub fn new(timestamp: impl Into<String>, nonce: impl Into<String>) -> Self {
        Self {
            timestamp: timestamp.into(),
            nonce: nonce.into(),
        }
    }
}

impl StampSource for FixedStampSource {
    fn timestamp(&self) -> String {
        self.timestamp.clone()
    }

    fn nonce(&self) -> String {
        self.nonce.clone()
    }
}

/// A request before signing
#[derive(Debug, Clone, Default)]
pub struct PendingRequest {
    pub method: String,
    pub path: String,
    pub query: BTreeMap<String, Option<String>>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl PendingRequest {
    /// Bodiless POST to `/`, the shape of every RPC-style call
    pub fn rpc() -> Self {
        Self {
            method: "POST".to_string(),
            path: "/".to_string(),
            ..Self::default()
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), Some(value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A request ready to send
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub method: String,
    pub path: String,
    /// Canonical (already encoded) query string, also used on the wire
    pub query_string: String,
    /// Canonical headers, including `x-acs-date`, `x-acs-signature-nonce`
    /// and `x-acs-content-sha256`
    pub headers: Vec<(String, String)>,
    /// `Authorization` header value
    pub authorization: String,
    pub timestamp: String,
    pub nonce: String,
    pub body: Vec<u8>,
}

impl SignedRequest {
    /// Path plus query string
    pub fn path_and_query(&self) -> String {
        if self.query_string.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query_string)
        }
    }
}

/// Signs requests with one credential
#[derive(Debug, Clone)]
pub struct Signer {
    algorithm: SignatureAlgorithm,
    credential: Credential,
}

impl Signer {
    pub fn new(algorithm: SignatureAlgorithm, credential: Credential) -> Self {
        Self {
            algorithm,
            credential,
        }
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Stamp and sign a request
    ///
    /// Adds `x-acs-date`, `x-acs-signature-nonce` and `x-acs-content-sha256`
    /// to the headers, then computes `Authorization` over all of them.
    pub fn sign_request(
        &self,
        request: PendingRequest,
        stamps: &dyn StampSource,
    ) -> Result<SignedRequest> {
        let timestamp = stamps.timestamp();
        let nonce = stamps.nonce();
        let payload_hash = hash(self.algorithm, &request.body);

        let mut headers = request.headers;
        headers.push(("x-acs-date".to_string(), timestamp.clone()));
        headers.push(("x-acs-signature-nonce".to_string(), nonce.clone()));
        headers.push(("x-acs-content-sha256".to_string(), payload_hash.clone()));

        let query_string = canonical_query_string(&request.query);
        let canonical = canonicalize_headers(&headers);

        let string_to_sign = build_string_to_sign(
            self.algorithm,
            &request.method,
            &request.path,
            &query_string,
            &canonical.block,
            &canonical.signed_headers,
            &payload_hash,
        );
        tracing::debug!("StringToSign:\n{}", string_to_sign);

        let signature = sign(self.algorithm, &self.credential.access_key_secret, &string_to_sign)?;
        let authorization = authorization_header(
            self.algorithm,
            &self.credential.access_key_id,
            &canonical.signed_headers,
            &signature,
        );

        Ok(SignedRequest {
            method: request.method,
            path: request.path,
            query_string,
            headers: canonical.entries,
            authorization,
            timestamp,
            nonce,
            body: request.body,
        })
    }
}
