// # aliddns-core
//
// Core library for the one-shot aliddns reconciler.
//
// ## Architecture Overview
//
// This library provides the functionality for keeping a single DNS record
// in sync with the host's public IP address:
// - **IpSource**: Trait for discovering the current public IP
// - **DnsProvider**: Trait for describing and updating the record remotely
// - **StateStore**: Trait for the local record cache
// - **Notifier**: Trait for operator notifications
// - **Reconciler**: Runs one reconciliation cycle per invocation
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Decisions live in the Reconciler, I/O lives in plugins
// 2. **One Cycle Per Process**: Scheduling is delegated to cron or a systemd timer
// 3. **Retry by Recurrence**: A failed update leaves the cache stale so the next run retries
// 4. **Library-First**: All core functionality can be used as a library

pub mod traits;
pub mod engine;
pub mod config;
pub mod error;
pub mod state;

// Re-export core types for convenience
pub use traits::{IpSource, DnsProvider, DomainRecord, UpdateResult, StateStore, Notifier};
pub use engine::{CycleOutcome, ProviderAction, Reconciler, Verdict};
pub use config::{DdnsConfig, IpSourceConfig, ProviderConfig, RecordConfig, RecordType, MailConfig};
pub use error::{Error, Result};
pub use state::{CachedState, FileStateStore, MemoryStateStore};
