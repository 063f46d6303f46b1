//! Test doubles and common utilities for reconciliation contract tests
//!
//! This module provides minimal test doubles that count calls and can be
//! scripted to fail, without performing any I/O.

#![allow(dead_code)]

use aliddns_core::error::{Error, Result};
use aliddns_core::traits::{
    CachedState, DnsProvider, DomainRecord, IpSource, Notifier, StateStore, UpdateResult,
};
use aliddns_core::{MemoryStateStore, RecordConfig, RecordType, Reconciler};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// An IpSource returning a fixed address, or a fixed failure
pub struct FixedIpSource {
    result: std::result::Result<IpAddr, String>,
    current_call_count: Arc<AtomicUsize>,
}

impl FixedIpSource {
    pub fn new(ip: IpAddr) -> Self {
        Self {
            result: Ok(ip),
            current_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source whose every lookup fails
    pub fn failing(reason: &str) -> Self {
        Self {
            result: Err(reason.to_string()),
            current_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get the number of times current() was called
    pub fn current_call_count(&self) -> usize {
        self.current_call_count.load(Ordering::SeqCst)
    }

    /// Create a new FixedIpSource that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            result: other.result.clone(),
            current_call_count: Arc::clone(&other.current_call_count),
        }
    }
}

#[async_trait::async_trait]
impl IpSource for FixedIpSource {
    async fn current(&self) -> Result<IpAddr> {
        self.current_call_count.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(Error::ip_source)
    }

    fn describe(&self) -> String {
        "fixed".to_string()
    }
}

/// A mock DnsProvider that tracks calls
pub struct MockDnsProvider {
    /// Call counter for describe_record()
    describe_call_count: Arc<AtomicUsize>,
    /// Call counter for update_record()
    update_call_count: Arc<AtomicUsize>,
    /// (record_id, value) of every update call
    updates: Arc<Mutex<Vec<(String, String)>>>,
    /// Record returned by describe, or None to fail
    remote: Option<DomainRecord>,
    /// Whether update calls fail
    fail_updates: Arc<Mutex<bool>>,
}

impl MockDnsProvider {
    /// A provider whose record is `record_id = value`
    pub fn new(record_id: &str, value: &str) -> Self {
        Self {
            describe_call_count: Arc::new(AtomicUsize::new(0)),
            update_call_count: Arc::new(AtomicUsize::new(0)),
            updates: Arc::new(Mutex::new(Vec::new())),
            remote: Some(DomainRecord {
                record_id: record_id.to_string(),
                value: value.to_string(),
                rr: "www".to_string(),
                record_type: "A".to_string(),
            }),
            fail_updates: Arc::new(Mutex::new(false)),
        }
    }

    /// A provider whose describe calls fail
    pub fn describe_failing() -> Self {
        let mut provider = Self::new("unused", "0.0.0.0");
        provider.remote = None;
        provider
    }

    /// Make update calls fail (or succeed again)
    pub fn set_fail_updates(&self, fail: bool) {
        *self.fail_updates.lock().unwrap() = fail;
    }

    /// Get the number of times describe_record() was called
    pub fn describe_call_count(&self) -> usize {
        self.describe_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times update_record() was called
    pub fn update_call_count(&self) -> usize {
        self.update_call_count.load(Ordering::SeqCst)
    }

    /// Get the (record_id, value) pairs passed to update_record()
    pub fn updates(&self) -> Vec<(String, String)> {
        self.updates.lock().unwrap().clone()
    }

    /// Create a new MockDnsProvider that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            describe_call_count: Arc::clone(&other.describe_call_count),
            update_call_count: Arc::clone(&other.update_call_count),
            updates: Arc::clone(&other.updates),
            remote: other.remote.clone(),
            fail_updates: Arc::clone(&other.fail_updates),
        }
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn describe_record(&self, _record: &RecordConfig) -> Result<DomainRecord> {
        self.describe_call_count.fetch_add(1, Ordering::SeqCst);
        self.remote
            .clone()
            .ok_or_else(|| Error::provider("mock", "InternalError: describe unavailable"))
    }

    async fn update_record(
        &self,
        record_id: &str,
        _record: &RecordConfig,
        value: &str,
    ) -> Result<UpdateResult> {
        self.update_call_count.fetch_add(1, Ordering::SeqCst);
        self.updates
            .lock()
            .unwrap()
            .push((record_id.to_string(), value.to_string()));

        if *self.fail_updates.lock().unwrap() {
            return Err(Error::provider("mock", "InternalError: update rejected"));
        }

        Ok(UpdateResult {
            record_id: record_id.to_string(),
            request_id: Some("req-1".to_string()),
        })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A MemoryStateStore that counts calls and can refuse writes
pub struct MockStateStore {
    load_call_count: Arc<AtomicUsize>,
    store_call_count: Arc<AtomicUsize>,
    inner: MemoryStateStore,
    fail_stores: bool,
}

impl MockStateStore {
    pub fn new() -> Self {
        Self {
            load_call_count: Arc::new(AtomicUsize::new(0)),
            store_call_count: Arc::new(AtomicUsize::new(0)),
            inner: MemoryStateStore::new(),
            fail_stores: false,
        }
    }

    /// A store pre-populated with `record_id = value`
    pub fn with(record_id: &str, value: &str) -> Self {
        Self {
            inner: MemoryStateStore::with_state(CachedState::new(record_id, value)),
            ..Self::new()
        }
    }

    /// A store whose writes fail
    pub fn refusing_writes(mut self) -> Self {
        self.fail_stores = true;
        self
    }

    /// Get the number of times load() was called
    pub fn load_call_count(&self) -> usize {
        self.load_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times store() was called
    pub fn store_call_count(&self) -> usize {
        self.store_call_count.load(Ordering::SeqCst)
    }

    /// Current cached state
    pub async fn snapshot(&self) -> Option<CachedState> {
        self.inner.snapshot().await
    }

    /// Create a new MockStateStore that shares counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            load_call_count: Arc::clone(&other.load_call_count),
            store_call_count: Arc::clone(&other.store_call_count),
            inner: other.inner.clone(),
            fail_stores: other.fail_stores,
        }
    }
}

#[async_trait::async_trait]
impl StateStore for MockStateStore {
    async fn load(&self) -> Result<Option<CachedState>> {
        self.load_call_count.fetch_add(1, Ordering::SeqCst);
        self.inner.load().await
    }

    async fn store(&self, state: &CachedState) -> Result<()> {
        self.store_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_stores {
            return Err(Error::state_store("disk full"));
        }
        self.inner.store(state).await
    }
}

/// A notification captured by [`RecordingNotifier`]
#[derive(Debug, Clone)]
pub struct SentNotification {
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
}

/// A Notifier that records every message
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<SentNotification>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    /// A notifier whose sends fail (still recorded)
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Messages sent so far
    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().unwrap().clone()
    }

    /// Create a new RecordingNotifier that shares its log with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            sent: Arc::clone(&other.sent),
            fail: other.fail,
        }
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, subject: &str, body: &str, recipients: &[String]) -> Result<()> {
        self.sent.lock().unwrap().push(SentNotification {
            subject: subject.to_string(),
            body: body.to_string(),
            recipients: recipients.to_vec(),
        });

        if self.fail {
            return Err(Error::notify("connection refused"));
        }
        Ok(())
    }
}

/// The record every contract test manages
pub fn test_record() -> RecordConfig {
    RecordConfig::new("example.com", "www", RecordType::A)
}

/// Wire a Reconciler from doubles that share counters with the given handles
pub fn reconciler(
    ip_source: &FixedIpSource,
    provider: &MockDnsProvider,
    state_store: &MockStateStore,
    notifier: &RecordingNotifier,
) -> Reconciler {
    Reconciler::new(
        Box::new(FixedIpSource::sharing_counters_with(ip_source)),
        Box::new(MockDnsProvider::sharing_counters_with(provider)),
        Box::new(MockStateStore::sharing_counters_with(state_store)),
        Box::new(RecordingNotifier::sharing_counters_with(notifier)),
        test_record(),
        vec!["ops@example.com".to_string()],
    )
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}
