//! Core traits for aliddns
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpSource`]: Discover the current public IP
//! - [`DnsProvider`]: Describe and update the record via the provider API
//! - [`StateStore`]: Local record cache
//! - [`Notifier`]: Operator notifications

pub mod ip_source;
pub mod dns_provider;
pub mod state_store;
pub mod notifier;

pub use ip_source::IpSource;
pub use dns_provider::{DnsProvider, DomainRecord, UpdateResult};
pub use state_store::{StateStore, CachedState};
pub use notifier::Notifier;
