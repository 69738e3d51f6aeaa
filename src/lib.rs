//! Core library for the rulesync deployment tool.
//!
//! The crate reconciles a declarative mapping of rules-config keys to values
//! against the entries stored in a remote account: entries missing from the
//! desired state are deleted, entries present in it are created or fully
//! overwritten. Remote access goes through the [`client::ManagementClient`]
//! seam; the bundled [`api::HttpManagementClient`] speaks the management
//! API's REST surface with retrying calls.

pub mod api;
pub mod client;
pub mod config;
pub mod desired;
pub mod progress;
pub mod reconcile;
pub mod retry;
pub mod test_support;

pub use api::{ApiError, HttpManagementClient};
pub use client::{ClientFuture, KeySelector, ManagementClient, RulesConfigRecord, ValuePayload};
pub use config::{ApiConfig, ConfigError, DEFAULT_CONCURRENT_CALLS};
pub use desired::{DesiredConfigError, DesiredRulesConfigs};
pub use progress::{Progress, ProgressLog, TracingLog};
pub use reconcile::Reconciler;
pub use retry::{RetryPolicy, Transient, call_with_retry};
