//! Reconciles desired rules configs against the remote account.
//!
//! The reconciler compares a declarative key/value mapping with the keys
//! currently stored remotely, deletes remote entries absent from the desired
//! state, and upserts every desired entry. Per-key remote calls run with a
//! bounded number of simultaneous in-flight operations; the first failing
//! call aborts its batch and propagates unchanged. Counters and progress log
//! lines are recorded on the shared [`Progress`] state as a side effect.

use futures::stream::{self, TryStreamExt};

use crate::client::{KeySelector, ManagementClient, ValuePayload};
use crate::config::DEFAULT_CONCURRENT_CALLS;
use crate::desired::DesiredRulesConfigs;
use crate::progress::Progress;

/// Drives the deletion and upsert passes against a management client.
#[derive(Debug)]
pub struct Reconciler<C: ManagementClient> {
    client: C,
    concurrency: usize,
}

impl<C: ManagementClient> Reconciler<C> {
    /// Creates a reconciler with the default concurrency cap.
    #[must_use]
    pub const fn new(client: C) -> Self {
        Self {
            client,
            concurrency: DEFAULT_CONCURRENT_CALLS,
        }
    }

    /// Overrides the cap on simultaneously in-flight remote calls.
    ///
    /// A cap of zero is treated as one: calls always make progress.
    #[must_use]
    pub const fn with_concurrency(mut self, limit: usize) -> Self {
        self.concurrency = if limit == 0 { 1 } else { limit };
        self
    }

    /// Returns the remote key list, listing the account on first use.
    ///
    /// The result is cached on `progress`; repeat calls within one run return
    /// the cached sequence without a remote call, even if remote records have
    /// changed since. Callers wanting fresh data must start a new run with a
    /// fresh [`Progress`].
    ///
    /// # Errors
    ///
    /// Propagates the listing call's failure unchanged.
    pub async fn current_keys<'a>(
        &self,
        progress: &'a Progress,
    ) -> Result<&'a [String], C::Error> {
        progress
            .known_keys_or_init(|| async {
                let records = self.client.list().await?;
                Ok(records.into_iter().map(|record| record.key).collect())
            })
            .await
    }

    /// Deletes every remote entry whose key is absent from `desired`.
    ///
    /// Remote keys present in `desired` are kept without a remote call. The
    /// deletion counter is incremented and a log line emitted before each
    /// delete is issued.
    ///
    /// # Errors
    ///
    /// Propagates the first failing listing or delete call unchanged;
    /// counters already incremented stay incremented.
    pub async fn delete_absent(
        &self,
        progress: &Progress,
        desired: &DesiredRulesConfigs,
    ) -> Result<(), C::Error> {
        progress.log("Deleting rules configs that no longer exist in the repository...");

        let existing = self.current_keys(progress).await?;
        progress.log(&format!("Existing rules configs: {}", existing.join(", ")));

        stream::iter(existing.iter().map(Ok::<_, C::Error>))
            .try_for_each_concurrent(Some(self.concurrency), |key| async move {
                self.delete_if_absent(progress, desired, key).await
            })
            .await
    }

    async fn delete_if_absent(
        &self,
        progress: &Progress,
        desired: &DesiredRulesConfigs,
        key: &str,
    ) -> Result<(), C::Error> {
        if desired.contains_key(key) {
            return Ok(());
        }

        progress.record_deletion();
        progress.log(&format!("Deleting rule config {key}"));
        let selector = KeySelector::new(key);
        self.client.remove(&selector).await
    }

    /// Creates or overwrites a remote entry for every desired key.
    ///
    /// An empty desired mapping is a true no-op: no remote calls, no counter
    /// mutation, no informational log line.
    ///
    /// # Errors
    ///
    /// Propagates the first failing upsert call unchanged; counters already
    /// incremented stay incremented.
    pub async fn upsert_all(
        &self,
        progress: &Progress,
        desired: &DesiredRulesConfigs,
    ) -> Result<(), C::Error> {
        if desired.is_empty() {
            return Ok(());
        }

        progress.log("Insert or Update rules configs...");

        stream::iter(desired.iter().map(Ok::<_, C::Error>))
            .try_for_each_concurrent(Some(self.concurrency), |(key, value)| async move {
                progress.record_upsert();
                progress.log(&format!("Insert or Update {key}"));
                let selector = KeySelector::new(key.as_str());
                let payload = ValuePayload::new(value.as_str());
                self.client.upsert(&selector, &payload).await
            })
            .await
    }

    /// Runs a full reconciliation: the deletion pass runs to completion, then
    /// the upsert pass begins. The two passes stay individually callable for
    /// callers needing a different sequencing.
    ///
    /// # Errors
    ///
    /// Propagates the first remote failure unchanged; a failing deletion pass
    /// prevents the upsert pass from starting.
    pub async fn run(
        &self,
        progress: &Progress,
        desired: &DesiredRulesConfigs,
    ) -> Result<(), C::Error> {
        self.delete_absent(progress, desired).await?;
        self.upsert_all(progress, desired).await
    }
}
