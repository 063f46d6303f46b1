// # State Store Trait
//
// Defines the interface for the local record cache.
//
// ## Purpose
//
// The cache remembers the record ID and the value last written, so a cycle
// whose public IP is unchanged costs a single IP lookup and no provider call.
// It is advisory: the provider's record is authoritative, and an absent or
// unreadable cache is rebuilt from a remote describe.
//
// ## Implementations
//
// - File-based: INI document (`FileStateStore`)
// - In-memory: `MemoryStateStore`

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Locally cached view of the managed record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedState {
    /// Provider record ID
    pub record_id: String,
    /// Value last known to be on the record
    pub value: String,
    /// When this state was written (second precision)
    pub last_written: DateTime<Utc>,
}

impl CachedState {
    /// Create a state stamped with the current time
    pub fn new(record_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self::at(record_id, value, Utc::now())
    }

    /// Create a state with an explicit timestamp
    pub fn at(
        record_id: impl Into<String>,
        value: impl Into<String>,
        last_written: DateTime<Utc>,
    ) -> Self {
        Self {
            record_id: record_id.into(),
            value: value.into(),
            last_written,
        }
    }
}

/// Trait for state store implementations
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O for the cache file
///
/// ## Forbidden Capabilities
/// - ❌ Talk to the provider or decide when to update (owned by `Reconciler`)
///
/// ## Implementation Guidelines
///
/// - **Async I/O only**
/// - **Corruption is absence**: `load` returns `Ok(None)` for content it
///   cannot interpret; `Err` is reserved for I/O failures
/// - **Atomic writes**: a reader never observes a half-written cache
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the cached state
    ///
    /// # Returns
    ///
    /// - `Ok(Some(CachedState))`: A complete, well-formed cache
    /// - `Ok(None)`: No cache, or a cache that could not be interpreted
    /// - `Err(Error)`: Storage error
    async fn load(&self) -> Result<Option<CachedState>, crate::Error>;

    /// Replace the cached state
    async fn store(&self, state: &CachedState) -> Result<(), crate::Error>;
}
