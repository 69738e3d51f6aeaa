//! Test support utilities shared across unit and integration tests.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::client::{ClientFuture, KeySelector, ManagementClient, RulesConfigRecord, ValuePayload};
use crate::progress::ProgressLog;

/// Error returned by [`FakeManagementClient`] when a failure is scripted.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("scripted {operation} failure")]
pub struct FakeClientError {
    /// Operation that was scripted to fail (`list`, `remove`, or `upsert`).
    pub operation: &'static str,
}

/// One remote operation recorded by [`FakeManagementClient`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RecordedCall {
    /// A delete, with the selector key.
    Removed {
        /// Key the delete was issued for.
        key: String,
    },
    /// An upsert, with the selector key and payload value.
    Upserted {
        /// Key the upsert was issued for.
        key: String,
        /// Value carried by the payload.
        value: String,
    },
}

/// In-memory management client recording every operation.
///
/// Used to drive deterministic reconciliation outcomes without a network.
/// Interior state is shared across clones so tests can keep a handle for
/// assertions after handing the client to a reconciler.
#[derive(Clone, Debug, Default)]
pub struct FakeManagementClient {
    remote: Arc<Mutex<Vec<RulesConfigRecord>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    list_calls: Arc<AtomicU64>,
    fail_list: Arc<AtomicBool>,
    fail_remove: Arc<AtomicBool>,
    fail_upsert: Arc<AtomicBool>,
}

fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl FakeManagementClient {
    /// Creates a fake with an empty remote account.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the remote account with records for the given keys.
    #[must_use]
    pub fn with_remote_keys(self, keys: &[&str]) -> Self {
        {
            let mut remote = lock_ignoring_poison(&self.remote);
            *remote = keys
                .iter()
                .map(|key| RulesConfigRecord {
                    key: (*key).to_owned(),
                    value: None,
                })
                .collect();
        }
        self
    }

    /// Scripts every listing call to fail.
    #[must_use]
    pub fn fail_lists(self) -> Self {
        self.fail_list.store(true, Ordering::Relaxed);
        self
    }

    /// Scripts every delete call to fail.
    #[must_use]
    pub fn fail_removes(self) -> Self {
        self.fail_remove.store(true, Ordering::Relaxed);
        self
    }

    /// Scripts every upsert call to fail.
    #[must_use]
    pub fn fail_upserts(self) -> Self {
        self.fail_upsert.store(true, Ordering::Relaxed);
        self
    }

    /// Returns a snapshot of all recorded operations.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        lock_ignoring_poison(&self.calls).clone()
    }

    /// Keys for which a delete was issued, in recording order.
    #[must_use]
    pub fn removed_keys(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::Removed { key } => Some(key),
                RecordedCall::Upserted { .. } => None,
            })
            .collect()
    }

    /// Key/value pairs for which an upsert was issued, in recording order.
    #[must_use]
    pub fn upserted_entries(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::Upserted { key, value } => Some((key, value)),
                RecordedCall::Removed { .. } => None,
            })
            .collect()
    }

    /// Number of listing calls served so far.
    #[must_use]
    pub fn list_call_count(&self) -> u64 {
        self.list_calls.load(Ordering::Relaxed)
    }
}

impl ManagementClient for FakeManagementClient {
    type Error = FakeClientError;

    fn list(&self) -> ClientFuture<'_, Vec<RulesConfigRecord>, Self::Error> {
        Box::pin(async move {
            self.list_calls.fetch_add(1, Ordering::Relaxed);
            if self.fail_list.load(Ordering::Relaxed) {
                return Err(FakeClientError { operation: "list" });
            }
            Ok(lock_ignoring_poison(&self.remote).clone())
        })
    }

    fn remove<'a>(&'a self, selector: &'a KeySelector) -> ClientFuture<'a, (), Self::Error> {
        Box::pin(async move {
            if self.fail_remove.load(Ordering::Relaxed) {
                return Err(FakeClientError {
                    operation: "remove",
                });
            }
            lock_ignoring_poison(&self.calls).push(RecordedCall::Removed {
                key: selector.key.clone(),
            });
            Ok(())
        })
    }

    fn upsert<'a>(
        &'a self,
        selector: &'a KeySelector,
        payload: &'a ValuePayload,
    ) -> ClientFuture<'a, (), Self::Error> {
        Box::pin(async move {
            if self.fail_upsert.load(Ordering::Relaxed) {
                return Err(FakeClientError {
                    operation: "upsert",
                });
            }
            lock_ignoring_poison(&self.calls).push(RecordedCall::Upserted {
                key: selector.key.clone(),
                value: payload.value.clone(),
            });
            Ok(())
        })
    }
}

/// Progress log sink that captures every message for assertions.
#[derive(Clone, Debug, Default)]
pub struct RecordingLog {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingLog {
    /// Creates an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all messages logged so far.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        lock_ignoring_poison(&self.messages).clone()
    }
}

impl ProgressLog for RecordingLog {
    fn log(&self, message: &str) {
        lock_ignoring_poison(&self.messages).push(message.to_owned());
    }
}
