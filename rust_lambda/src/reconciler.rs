//! Merges declared subscriptions into a bucket's live notification
//! configuration.
//!
//! Every lifecycle operation reads the configuration fresh, edits it in
//! memory and writes it back whole. There is no compare-and-swap: two
//! reconciliations racing on one bucket end with the last write winning.

use std::collections::BTreeSet;

use lambda_runtime::tracing;

use crate::error::Result;
use crate::model::{NotificationConfiguration, Subscription};
use crate::store::NotificationStore;

pub struct Reconciler<S> {
    store: S,
}

impl<S: NotificationStore> Reconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Appends `additions` to the bucket's configuration.
    pub async fn on_create(
        &self,
        bucket: &str,
        additions: &NotificationConfiguration,
    ) -> Result<NotificationConfiguration> {
        let mut config = self.store.fetch(bucket).await?;
        add_entries(&mut config, additions);
        self.persist(bucket, config).await
    }

    /// Replaces the `previous` entries with `desired`. Removal runs first so
    /// an entry declared in both states survives the update.
    pub async fn on_update(
        &self,
        bucket: &str,
        previous: &NotificationConfiguration,
        desired: &NotificationConfiguration,
    ) -> Result<NotificationConfiguration> {
        let mut config = self.store.fetch(bucket).await?;
        remove_entries(&mut config, previous);
        add_entries(&mut config, desired);
        self.persist(bucket, config).await
    }

    /// Removes `removals` from the bucket's configuration.
    pub async fn on_delete(
        &self,
        bucket: &str,
        removals: &NotificationConfiguration,
    ) -> Result<NotificationConfiguration> {
        let mut config = self.store.fetch(bucket).await?;
        remove_entries(&mut config, removals);
        self.persist(bucket, config).await
    }

    async fn persist(
        &self,
        bucket: &str,
        config: NotificationConfiguration,
    ) -> Result<NotificationConfiguration> {
        self.store.persist(bucket, &config).await?;
        tracing::info!(
            bucket,
            entries = config.entry_count(),
            "Notification configuration persisted"
        );
        Ok(config)
    }
}

/// Appends every entry of `additions` to `config`, creating missing lists.
/// No deduplication: adding an entry twice yields two entries.
pub fn add_entries(config: &mut NotificationConfiguration, additions: &NotificationConfiguration) {
    append(
        &mut config.lambda_function_configurations,
        additions.lambda_function_configurations.as_deref(),
    );
    append(&mut config.queue_configurations, additions.queue_configurations.as_deref());
    append(&mut config.topic_configurations, additions.topic_configurations.as_deref());
}

fn append<T: Subscription + Clone>(target: &mut Option<Vec<T>>, entries: Option<&[T]>) {
    if let Some(entries) = entries {
        tracing::debug!(kind = T::LIST_PROPERTY, count = entries.len(), "Adding entries");
        target.get_or_insert_with(Vec::new).extend_from_slice(entries);
    }
}

/// Removes every entry of `config` matched by an entry of `to_remove`.
///
/// An entry with a non-empty `Id` matches on the id alone. Otherwise it
/// matches entries with the same target ARN and exactly the same set of
/// events.
/// Unmatched removals are ignored and survivors keep their order.
pub fn remove_entries(
    config: &mut NotificationConfiguration,
    to_remove: &NotificationConfiguration,
) {
    remove(
        &mut config.lambda_function_configurations,
        to_remove.lambda_function_configurations.as_deref(),
    );
    remove(&mut config.queue_configurations, to_remove.queue_configurations.as_deref());
    remove(&mut config.topic_configurations, to_remove.topic_configurations.as_deref());
}

fn remove<T: Subscription>(target: &mut Option<Vec<T>>, removals: Option<&[T]>) {
    let (Some(entries), Some(removals)) = (target.as_mut(), removals) else {
        return;
    };
    let before = entries.len();
    for removal in removals {
        entries.retain(|entry| !matches_removal(entry, removal));
    }
    tracing::debug!(kind = T::LIST_PROPERTY, removed = before - entries.len(), "Removed entries");
}

fn matches_removal<T: Subscription>(entry: &T, removal: &T) -> bool {
    match removal.id().filter(|id| !id.is_empty()) {
        Some(id) => entry.id() == Some(id),
        None => {
            entry.target_arn() == removal.target_arn()
                && event_set(entry.events()) == event_set(removal.events())
        }
    }
}

/// Order-independent view of an event list, used only for matching.
fn event_set(events: Option<&[String]>) -> BTreeSet<&str> {
    events
        .unwrap_or_default()
        .iter()
        .map(String::as_str)
        .collect()
}
