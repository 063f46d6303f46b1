// # IP Source Trait
//
// Defines the interface for discovering the host's public IP address.
//
// ## Implementations
//
// - HTTP lookup service: `aliddns-ip-http` crate (`HttpIpSource`)
// - Two lookups that must agree: `aliddns-ip-http` crate (`CrossCheckIpSource`)
//
// ## Usage
//
// ```rust,ignore
// use aliddns_core::IpSource;
//
// #[tokio::main(flavor = "current_thread")]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpSource implementation */;
//
//     let current_ip = source.current().await?;
//     println!("public IP: {}", current_ip);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for IP source implementations
///
/// # Trust Level: Semi-Trusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP requests to the configured lookup services
/// - ✅ Validate the returned address
///
/// ## Forbidden Capabilities
/// - ❌ Perform DNS updates (use `DnsProvider`)
/// - ❌ Access the record cache (owned by `Reconciler`)
/// - ❌ Retry or sleep (a failed lookup aborts the cycle; the scheduler retries)
/// - ❌ Decide whether an update is needed
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Get the current public IP address
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: The current IP address
    /// - `Err(Error)`: Network error, timeout, non-2xx status, empty or
    ///   unparsable body, or an address of the wrong family
    async fn current(&self) -> Result<IpAddr, crate::Error>;

    /// Short description for logs (e.g. the lookup URL)
    fn describe(&self) -> String;
}
