//! Event bus port — publish/subscribe for medicine change events.

use std::future::Future;

use pillminder_domain::error::PillminderError;
use pillminder_domain::event::MedicineEvent;

/// Publishes change events to interested subscribers.
pub trait ChangePublisher {
    /// Publish an event to all current subscribers.
    fn publish(
        &self,
        event: MedicineEvent,
    ) -> impl Future<Output = Result<(), PillminderError>> + Send;
}

impl<T: ChangePublisher + Send + Sync> ChangePublisher for std::sync::Arc<T> {
    fn publish(
        &self,
        event: MedicineEvent,
    ) -> impl Future<Output = Result<(), PillminderError>> + Send {
        (**self).publish(event)
    }
}
