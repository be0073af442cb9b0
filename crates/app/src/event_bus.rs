//! Medicine change bus backed by a tokio broadcast channel.
//!
//! Every successful write in the medicine service lands here as a
//! [`MedicineEvent`]. The list view listens to it to know when its cached
//! snapshot went stale; a slow listener that lags only loses the events,
//! never the final state, since it reloads the list anyway.

use std::future::Future;

use tokio::sync::broadcast;

use pillminder_domain::error::PillminderError;
use pillminder_domain::event::MedicineEvent;

use crate::ports::ChangePublisher;

/// Buffered change events per listener. A burst of course endings at the
/// start of a day is the largest batch the daemon publishes at once.
pub const DEFAULT_CAPACITY: usize = 256;

/// Publishes medicine changes to every live listener.
///
/// With no listener attached, events are dropped and publishing still
/// succeeds.
pub struct InProcessChangeBus {
    sender: broadcast::Sender<MedicineEvent>,
}

impl Default for InProcessChangeBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl InProcessChangeBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Receiver for changes published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<MedicineEvent> {
        self.sender.subscribe()
    }
}

impl ChangePublisher for InProcessChangeBus {
    fn publish(
        &self,
        event: MedicineEvent,
    ) -> impl Future<Output = Result<(), PillminderError>> + Send {
        match self.sender.send(event) {
            Ok(listeners) => tracing::trace!(listeners, "medicine change published"),
            Err(_) => tracing::trace!("medicine change published with no listener"),
        }
        async { Ok(()) }
    }
}
