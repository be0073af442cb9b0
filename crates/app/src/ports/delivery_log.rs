//! Delivery log port — which reminder occurrences were already notified.

use std::future::Future;
use std::sync::Arc;

use pillminder_domain::error::PillminderError;
use pillminder_domain::reminder::ReminderKey;
use pillminder_domain::time::Timestamp;

/// Ledger of claimed [`ReminderKey`]s.
///
/// A key is claimed before its notification is sent, so two overlapping
/// wakes can never both notify the same occurrence.
pub trait DeliveryLog {
    /// Atomically record `key` if absent. Returns `true` when this call
    /// recorded it, `false` when it was already claimed.
    fn claim(
        &self,
        key: ReminderKey,
    ) -> impl Future<Output = Result<bool, PillminderError>> + Send;

    /// Forget a claim so the occurrence can be retried.
    fn release(&self, key: ReminderKey) -> impl Future<Output = Result<(), PillminderError>> + Send;

    /// Drop claims for occurrences due before `before`. Returns how many
    /// were removed.
    fn prune(&self, before: Timestamp) -> impl Future<Output = Result<u64, PillminderError>> + Send;
}

impl<T: DeliveryLog + Send + Sync> DeliveryLog for Arc<T> {
    fn claim(
        &self,
        key: ReminderKey,
    ) -> impl Future<Output = Result<bool, PillminderError>> + Send {
        (**self).claim(key)
    }

    fn release(&self, key: ReminderKey) -> impl Future<Output = Result<(), PillminderError>> + Send {
        (**self).release(key)
    }

    fn prune(&self, before: Timestamp) -> impl Future<Output = Result<u64, PillminderError>> + Send {
        (**self).prune(before)
    }
}
