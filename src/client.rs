//! Management-client abstraction for the rules-config API.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

/// A rules-config record as returned by the remote listing endpoint.
///
/// Only the key participates in reconciliation decisions. Listing endpoints
/// for secret-bearing configs commonly omit the stored value, so it is
/// optional and never inspected by the reconciler.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct RulesConfigRecord {
    /// Unique name of the config entry.
    pub key: String,
    /// Stored value, when the listing endpoint reports one.
    #[serde(default)]
    pub value: Option<String>,
}

/// Selector naming a single remote rules-config record.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct KeySelector {
    /// Key of the record to operate on.
    pub key: String,
}

impl KeySelector {
    /// Builds a selector for the given key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Full replacement value for one rules-config record.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ValuePayload {
    /// New value; the remote entry is always fully overwritten.
    pub value: String,
}

impl ValuePayload {
    /// Builds a payload carrying the given value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

/// Future returned by management-client operations.
pub type ClientFuture<'a, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 'a>>;

/// Minimal interface over the remote management API.
///
/// Implementations own transport, authentication, and retry concerns; the
/// reconciler treats every operation as an opaque remote call whose failures
/// propagate unchanged.
pub trait ManagementClient {
    /// Client specific error type returned by remote operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Lists every rules-config record stored remotely.
    fn list(&self) -> ClientFuture<'_, Vec<RulesConfigRecord>, Self::Error>;

    /// Deletes the record named by `selector`.
    fn remove<'a>(&'a self, selector: &'a KeySelector) -> ClientFuture<'a, (), Self::Error>;

    /// Creates or fully overwrites the record named by `selector`.
    fn upsert<'a>(
        &'a self,
        selector: &'a KeySelector,
        payload: &'a ValuePayload,
    ) -> ClientFuture<'a, (), Self::Error>;
}
