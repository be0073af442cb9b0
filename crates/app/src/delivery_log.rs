//! In-memory [`DeliveryLog`], for tests and single-process runs that can
//! afford to forget claims on restart.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::{Mutex, PoisonError};

use pillminder_domain::error::PillminderError;
use pillminder_domain::reminder::ReminderKey;
use pillminder_domain::time::Timestamp;

use crate::ports::DeliveryLog;

#[derive(Debug, Default)]
pub struct InMemoryDeliveryLog {
    claimed: Mutex<BTreeSet<ReminderKey>>,
}

impl InMemoryDeliveryLog {
    #[must_use]
    pub fn len(&self) -> usize {
        self.claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DeliveryLog for InMemoryDeliveryLog {
    fn claim(
        &self,
        key: ReminderKey,
    ) -> impl Future<Output = Result<bool, PillminderError>> + Send {
        let fresh = self
            .claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key);
        async move { Ok(fresh) }
    }

    fn release(&self, key: ReminderKey) -> impl Future<Output = Result<(), PillminderError>> + Send {
        self.claimed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        async { Ok(()) }
    }

    fn prune(&self, before: Timestamp) -> impl Future<Output = Result<u64, PillminderError>> + Send {
        let mut claimed = self.claimed.lock().unwrap_or_else(PoisonError::into_inner);
        let len = claimed.len();
        claimed.retain(|key| key.due_at >= before);
        let removed = (len - claimed.len()) as u64;
        async move { Ok(removed) }
    }
}
