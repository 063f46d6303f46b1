//! Configuration types for aliddns
//!
//! The configuration is a flat INI document:
//!
//! ```ini
//! [service]
//! pub_ip_url = https://api.ipify.org
//!
//! [account]
//! end_point = alidns.cn-hangzhou.aliyuncs.com
//! access_key_id = LTAI...
//! access_key_secret = ...
//!
//! [domain]
//! domain_name = example.com
//! rr_key_word = www
//! type_key_word = A
//!
//! [mail]
//! smtp_host = smtp.example.com
//! smtp_port = 465
//! smtp_ssl = true
//! sender = aliddns
//! user = ddns@example.com
//! passwd = ...
//! send_to = ops@example.com,oncall@example.com
//! ```
//!
//! Missing or malformed required keys are reported as [`Error::Config`],
//! which the binary treats as fatal.

use ini::{Ini, ParseOption, Properties};
use std::fmt;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Error, Result};

/// The only signing scheme the provider verifier accepts for API version 2015-01-09
pub const DEFAULT_SIGNATURE_ALGORITHM: &str = "ACS3-HMAC-SHA256";

/// Cache file name used when `[cache] path` is not set
pub const DEFAULT_CACHE_FILE: &str = "aliyun_domain_record.ini";

/// Timeout applied to every outbound HTTP call
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Main aliddns configuration
#[derive(Debug, Clone)]
pub struct DdnsConfig {
    /// Public IP discovery
    pub ip_source: IpSourceConfig,

    /// Alidns API access
    pub provider: ProviderConfig,

    /// The one record being kept in sync
    pub record: RecordConfig,

    /// Operator notifications
    pub mail: MailConfig,

    /// Location of the local record cache
    pub cache_path: PathBuf,
}

impl DdnsConfig {
    /// Load and validate configuration from an INI file
    ///
    /// A relative or absent cache path is resolved against the directory
    /// holding the configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let ini = Ini::load_from_file_opt(path, literal_values()).map_err(|e| {
            Error::config(format!(
                "Failed to read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_ini(&ini, base_dir)
    }

    /// Parse and validate configuration from INI text
    pub fn from_ini_str(content: &str, base_dir: impl AsRef<Path>) -> Result<Self> {
        let ini = Ini::load_from_str_opt(content, literal_values())
            .map_err(|e| Error::config(format!("Malformed configuration: {}", e)))?;
        Self::from_ini(&ini, base_dir.as_ref())
    }

    fn from_ini(ini: &Ini, base_dir: &Path) -> Result<Self> {
        let service = section(ini, "service")?;
        let account = section(ini, "account")?;
        let domain = section(ini, "domain")?;
        let mail = section(ini, "mail")?;

        let timeout_secs = match optional(service, "timeout_secs") {
            Some(raw) => parse_number("service", "timeout_secs", raw)?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let ip_source = IpSourceConfig {
            url: required(service, "service", "pub_ip_url")?,
            secondary_url: optional(service, "pub_ip_url_secondary").map(str::to_string),
            timeout_secs,
        };

        let provider = ProviderConfig {
            endpoint: required(account, "account", "end_point")?,
            access_key_id: required(account, "account", "access_key_id")?,
            access_key_secret: required(account, "account", "access_key_secret")?,
            signature_algorithm: optional(account, "signature_algorithm")
                .unwrap_or(DEFAULT_SIGNATURE_ALGORITHM)
                .to_string(),
            timeout_secs,
        };

        let record = RecordConfig {
            domain_name: required(domain, "domain", "domain_name")?,
            rr: required(domain, "domain", "rr_key_word")?,
            record_type: required(domain, "domain", "type_key_word")?.parse()?,
        };

        let mail = MailConfig {
            smtp_host: required(mail, "mail", "smtp_host")?,
            smtp_port: parse_number("mail", "smtp_port", &required(mail, "mail", "smtp_port")?)?,
            smtp_ssl: parse_bool("mail", "smtp_ssl", &required(mail, "mail", "smtp_ssl")?)?,
            sender: required(mail, "mail", "sender")?,
            user: required(mail, "mail", "user")?,
            password: required(mail, "mail", "passwd")?,
            recipients: required(mail, "mail", "send_to")?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            timeout_secs,
        };

        let cache_path = ini
            .section(Some("cache"))
            .and_then(|cache| optional(cache, "path"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_FILE));
        let cache_path = if cache_path.is_relative() {
            base_dir.join(cache_path)
        } else {
            cache_path
        };

        let config = Self {
            ip_source,
            provider,
            record,
            mail,
            cache_path,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.ip_source.validate()?;
        self.provider.validate()?;
        self.record.validate()?;
        self.mail.validate()?;
        Ok(())
    }
}

/// Public IP discovery configuration
#[derive(Debug, Clone)]
pub struct IpSourceConfig {
    /// URL returning the caller's public IP as plain text
    pub url: String,

    /// Optional second service; when set both must agree
    pub secondary_url: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl IpSourceConfig {
    /// Validate the IP source configuration
    pub fn validate(&self) -> Result<()> {
        validate_http_url("[service] pub_ip_url", &self.url)?;
        if let Some(ref url) = self.secondary_url {
            validate_http_url("[service] pub_ip_url_secondary", url)?;
        }
        validate_timeout(self.timeout_secs)
    }
}

/// Alidns API configuration
#[derive(Clone)]
pub struct ProviderConfig {
    /// API endpoint host, e.g. `alidns.cn-hangzhou.aliyuncs.com`
    pub endpoint: String,

    /// AccessKey ID
    pub access_key_id: String,

    /// AccessKey secret
    /// ⚠️ NEVER log this value
    pub access_key_secret: String,

    /// Signing scheme name, checked by the provider at construction
    pub signature_algorithm: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

// Custom Debug implementation that hides the secret
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<REDACTED>")
            .field("signature_algorithm", &self.signature_algorithm)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.contains("://") || self.endpoint.contains('/') {
            return Err(Error::config(format!(
                "[account] end_point must be a bare host name, got: {}",
                self.endpoint
            )));
        }
        validate_domain_name(&self.endpoint)?;

        if self.access_key_id.trim().is_empty() {
            return Err(Error::config("[account] access_key_id cannot be empty"));
        }
        if self.access_key_secret.trim().is_empty() {
            return Err(Error::config("[account] access_key_secret cannot be empty"));
        }

        validate_timeout(self.timeout_secs)
    }
}

/// The managed DNS record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordConfig {
    /// Zone, e.g. `example.com`
    pub domain_name: String,

    /// Host record inside the zone, e.g. `www` or `@`
    pub rr: String,

    /// Record type
    pub record_type: RecordType,
}

impl RecordConfig {
    /// Create a new record configuration
    pub fn new(
        domain_name: impl Into<String>,
        rr: impl Into<String>,
        record_type: RecordType,
    ) -> Self {
        Self {
            domain_name: domain_name.into(),
            rr: rr.into(),
            record_type,
        }
    }

    /// Fully qualified record name, used in logs and notifications
    pub fn fqdn(&self) -> String {
        if self.rr == "@" {
            self.domain_name.clone()
        } else {
            format!("{}.{}", self.rr, self.domain_name)
        }
    }

    /// Validate the record configuration
    pub fn validate(&self) -> Result<()> {
        validate_domain_name(&self.domain_name)?;

        if self.rr.trim().is_empty() {
            return Err(Error::config("[domain] rr_key_word cannot be empty"));
        }
        if self.rr.chars().any(char::is_whitespace) {
            return Err(Error::config(format!(
                "[domain] rr_key_word cannot contain whitespace: '{}'",
                self.rr
            )));
        }
        Ok(())
    }
}

/// DNS record type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    /// A record (IPv4)
    A,
    /// AAAA record (IPv6)
    Aaaa,
}

impl RecordType {
    /// Wire name used by the provider API
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
        }
    }

    /// Whether an address belongs to the family this record holds
    pub fn accepts(&self, ip: &IpAddr) -> bool {
        match self {
            RecordType::A => ip.is_ipv4(),
            RecordType::Aaaa => ip.is_ipv6(),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            other => Err(Error::config(format!(
                "[domain] type_key_word '{}' is not supported. Supported types: A, AAAA",
                other
            ))),
        }
    }
}

/// SMTP notification configuration
#[derive(Clone)]
pub struct MailConfig {
    /// SMTP server host
    pub smtp_host: String,

    /// SMTP server port
    pub smtp_port: u16,

    /// Implicit TLS when true, opportunistic STARTTLS otherwise
    pub smtp_ssl: bool,

    /// Display name placed in the From header
    pub sender: String,

    /// Login and envelope sender address
    pub user: String,

    /// SMTP password
    /// ⚠️ NEVER log this value
    pub password: String,

    /// Recipients, each receiving an individual message
    pub recipients: Vec<String>,

    /// Connection timeout in seconds
    pub timeout_secs: u64,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_ssl", &self.smtp_ssl)
            .field("sender", &self.sender)
            .field("user", &self.user)
            .field("password", &"<REDACTED>")
            .field("recipients", &self.recipients)
            .finish()
    }
}

impl MailConfig {
    /// Validate the mail configuration
    ///
    /// Address syntax is checked by the SMTP notifier, which knows the
    /// mailbox grammar.
    pub fn validate(&self) -> Result<()> {
        if self.smtp_host.trim().is_empty() {
            return Err(Error::config("[mail] smtp_host cannot be empty"));
        }
        if self.smtp_port == 0 {
            return Err(Error::config("[mail] smtp_port must be between 1 and 65535"));
        }
        if self.recipients.is_empty() {
            return Err(Error::config(
                "[mail] send_to must contain at least one recipient",
            ));
        }
        Ok(())
    }
}

fn section<'a>(ini: &'a Ini, name: &str) -> Result<&'a Properties> {
    ini.section(Some(name))
        .ok_or_else(|| Error::config(format!("Missing configuration section [{}]", name)))
}

fn optional<'a>(props: &'a Properties, key: &str) -> Option<&'a str> {
    props.get(key).map(str::trim).filter(|v| !v.is_empty())
}

fn required(props: &Properties, section: &str, key: &str) -> Result<String> {
    optional(props, key)
        .map(str::to_string)
        .ok_or_else(|| Error::config(format!("Missing configuration key [{}] {}", section, key)))
}

fn parse_number<T: FromStr>(section: &str, key: &str, raw: &str) -> Result<T> {
    raw.trim().parse().map_err(|_| {
        Error::config(format!(
            "[{}] {} must be a number. Got: {}",
            section, key, raw
        ))
    })
}

/// Parse values verbatim, without escape or quote processing
fn literal_values() -> ParseOption {
    ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    }
}

fn parse_bool(section: &str, key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(Error::config(format!(
            "[{}] {} must be a boolean (true/false). Got: {}",
            section, key, raw
        ))),
    }
}

fn validate_http_url(name: &str, url: &str) -> Result<()> {
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(Error::config(format!(
            "{} must use HTTP or HTTPS scheme. Got: {}",
            name, url
        )));
    }
    Ok(())
}

fn validate_timeout(timeout_secs: u64) -> Result<()> {
    if !(1..=300).contains(&timeout_secs) {
        return Err(Error::config(format!(
            "[service] timeout_secs must be between 1 and 300 seconds. Got: {}",
            timeout_secs
        )));
    }
    Ok(())
}

/// Validate that a string is a valid domain name
///
/// This implements basic DNS domain name validation per RFC 1035.
/// It's not comprehensive but catches common errors.
fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(Error::config("Domain name cannot be empty"));
    }

    // Total length limit (RFC 1035: 253 chars max)
    if domain.len() > 253 {
        return Err(Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(Error::config(format!(
                "Domain name has empty label: '{}'",
                domain
            )));
        }

        if label.len() > 63 {
            return Err(Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
            return Err(Error::config(format!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}
