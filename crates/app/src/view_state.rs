//! View state holder for the medicine list.
//!
//! Keeps the last loaded list and pushes fresh copies to subscribers
//! whenever the list is invalidated. Writes go straight to
//! [`MedicineService`]; the view only learns about them through
//! [`MedicineListView::invalidate`], usually driven by
//! [`MedicineListView::listen`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use chrono::NaiveDate;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use pillminder_domain::error::PillminderError;
use pillminder_domain::event::MedicineEvent;
use pillminder_domain::id::MedicineId;
use pillminder_domain::medicine::MedicineEntry;

use crate::ports::{ChangePublisher, Clock, MedicineRepository};
use crate::services::medicine_service::MedicineService;

/// Immutable copy of the list, shared between the cache and subscribers.
pub type Snapshot = Arc<[MedicineEntry]>;

type Callback = Arc<dyn Fn(&Snapshot) + Send + Sync>;

/// Which entries the view holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListFilter {
    #[default]
    All,
    Active,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    callbacks: BTreeMap<u64, Callback>,
}

/// Keeps a callback registered until dropped.
#[must_use = "dropping a subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .callbacks
                .remove(&self.id);
        }
    }
}

/// Cached, subscribable list of medicine entries.
pub struct MedicineListView<R, P, C> {
    service: Arc<MedicineService<R, P, C>>,
    filter: ListFilter,
    cache: RwLock<Option<Snapshot>>,
    registry: Arc<Mutex<Registry>>,
    /// Serializes loads so subscribers see snapshots in load order.
    refresh: tokio::sync::Mutex<()>,
}

impl<R, P, C> MedicineListView<R, P, C>
where
    R: MedicineRepository + Send + Sync,
    P: ChangePublisher + Send + Sync,
    C: Clock,
{
    pub fn new(service: Arc<MedicineService<R, P, C>>, filter: ListFilter) -> Self {
        Self {
            service,
            filter,
            cache: RwLock::new(None),
            registry: Arc::default(),
            refresh: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn filter(&self) -> ListFilter {
        self.filter
    }

    /// Register `callback`. It is called right away with the current list,
    /// then with every refreshed list until the [`Subscription`] is dropped.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the list has to be loaded and cannot be.
    pub async fn subscribe(
        &self,
        callback: impl Fn(&Snapshot) + Send + Sync + 'static,
    ) -> Result<Subscription, PillminderError> {
        let callback: Callback = Arc::new(callback);
        let _refresh = self.refresh.lock().await;
        let current = match self.cached() {
            Some(snapshot) => snapshot,
            None => self.load().await?,
        };
        callback(&current);

        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.callbacks.insert(id, callback);
        Ok(Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        })
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .callbacks
            .len()
    }

    /// The current list, loaded from the store if the cache is stale.
    ///
    /// # Errors
    ///
    /// Returns a storage error if loading fails.
    pub async fn snapshot(&self) -> Result<Snapshot, PillminderError> {
        if let Some(snapshot) = self.cached() {
            return Ok(snapshot);
        }
        let _refresh = self.refresh.lock().await;
        match self.cached() {
            Some(snapshot) => Ok(snapshot),
            None => self.load().await,
        }
    }

    /// Mark the cache stale. With subscribers present the list is reloaded
    /// and delivered to each of them.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the reload fails. The cache stays stale
    /// and the next read retries.
    pub async fn invalidate(&self) -> Result<(), PillminderError> {
        let _refresh = self.refresh.lock().await;
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = None;
        if self.subscriber_count() == 0 {
            return Ok(());
        }

        let snapshot = self.load().await?;
        let callbacks: Vec<Callback> = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .callbacks
            .values()
            .cloned()
            .collect();
        for callback in callbacks {
            callback(&snapshot);
        }
        Ok(())
    }

    /// Invalidate on every change event until the bus closes.
    pub async fn listen(&self, receiver: broadcast::Receiver<MedicineEvent>) {
        let mut events = BroadcastStream::new(receiver);
        while let Some(event) = events.next().await {
            match event {
                Ok(event) => {
                    tracing::trace!(kind = %event.kind, medicine_id = %event.medicine_id, "list view invalidated");
                }
                Err(BroadcastStreamRecvError::Lagged(missed)) => {
                    tracing::debug!(missed, "list view lagged behind change bus");
                }
            }
            if let Err(err) = self.invalidate().await {
                tracing::warn!(error = %err, "list view refresh failed");
            }
        }
        tracing::debug!("change bus closed; list view stops listening");
    }

    /// See [`MedicineService::create`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn create(&self, entry: MedicineEntry) -> Result<MedicineEntry, PillminderError> {
        self.service.create(entry).await
    }

    /// See [`MedicineService::update`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn update(&self, entry: MedicineEntry) -> Result<MedicineEntry, PillminderError> {
        self.service.update(entry).await
    }

    /// See [`MedicineService::delete`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn delete(&self, id: MedicineId) -> Result<(), PillminderError> {
        self.service.delete(id).await
    }

    /// See [`MedicineService::mark_taken`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn mark_taken(
        &self,
        id: MedicineId,
        date: NaiveDate,
    ) -> Result<MedicineEntry, PillminderError> {
        self.service.mark_taken(id, date).await
    }

    /// See [`MedicineService::set_active`].
    ///
    /// # Errors
    ///
    /// Propagates the service error.
    pub async fn set_active(
        &self,
        id: MedicineId,
        active: bool,
    ) -> Result<MedicineEntry, PillminderError> {
        self.service.set_active(id, active).await
    }

    fn cached(&self) -> Option<Snapshot> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn load(&self) -> Result<Snapshot, PillminderError> {
        let entries = self
            .service
            .list(self.filter == ListFilter::Active)
            .await?;
        let snapshot: Snapshot = entries.into();
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_bus::InProcessChangeBus;
    use crate::ports::ManualClock;
    use crate::testing::{InMemoryMedicineRepo, aspirin, ts};
    use pillminder_domain::evaluator::ScheduleEvaluator;
    use tokio::sync::mpsc;

    type View =
        MedicineListView<Arc<InMemoryMedicineRepo>, Arc<InProcessChangeBus>, Arc<ManualClock>>;

    fn view(filter: ListFilter) -> (Arc<View>, Arc<InProcessChangeBus>) {
        let bus = Arc::new(InProcessChangeBus::new(16));
        let service = Arc::new(MedicineService::new(
            Arc::new(InMemoryMedicineRepo::default()),
            Arc::clone(&bus),
            ScheduleEvaluator::default(),
            Arc::new(ManualClock::new(ts(2026, 3, 2, 7, 0))),
        ));
        (Arc::new(MedicineListView::new(service, filter)), bus)
    }

    fn names(snapshot: &Snapshot) -> Vec<String> {
        snapshot.iter().map(|e| e.name.clone()).collect()
    }

    fn collector() -> (
        impl Fn(&Snapshot) + Send + Sync + 'static,
        mpsc::UnboundedReceiver<Vec<String>>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            move |s: &Snapshot| {
                let _ = tx.send(names(s));
            },
            rx,
        )
    }

    #[tokio::test]
    async fn should_deliver_current_list_when_subscribing() {
        let (view, _bus) = view(ListFilter::All);
        view.create(aspirin()).await.unwrap();
        let (callback, mut rx) = collector();

        let _sub = view.subscribe(callback).await.unwrap();

        assert_eq!(rx.try_recv().unwrap(), vec!["Aspirin".to_string()]);
    }

    #[tokio::test]
    async fn should_keep_stale_snapshot_until_invalidated() {
        let (view, _bus) = view(ListFilter::All);
        assert!(view.snapshot().await.unwrap().is_empty());

        view.create(aspirin()).await.unwrap();
        assert!(view.snapshot().await.unwrap().is_empty());

        view.invalidate().await.unwrap();
        assert_eq!(view.snapshot().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_push_refreshed_list_to_subscribers_when_invalidated() {
        let (view, _bus) = view(ListFilter::All);
        let (callback, mut rx) = collector();
        let _sub = view.subscribe(callback).await.unwrap();
        assert!(rx.try_recv().unwrap().is_empty());

        view.create(aspirin()).await.unwrap();
        view.invalidate().await.unwrap();

        assert_eq!(rx.try_recv().unwrap(), vec!["Aspirin".to_string()]);
    }

    #[tokio::test]
    async fn should_stop_delivering_when_subscription_dropped() {
        let (view, _bus) = view(ListFilter::All);
        let (callback, mut rx) = collector();
        let sub = view.subscribe(callback).await.unwrap();
        rx.try_recv().unwrap();

        drop(sub);
        view.create(aspirin()).await.unwrap();
        view.invalidate().await.unwrap();

        assert_eq!(view.subscriber_count(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn should_hold_only_active_entries_when_filtered() {
        let (view, _bus) = view(ListFilter::Active);
        let paused = view.create(aspirin()).await.unwrap();
        view.create(aspirin()).await.unwrap();
        view.set_active(paused.id, false).await.unwrap();

        let snapshot = view.snapshot().await.unwrap();

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.iter().all(|e| e.active));
    }

    #[tokio::test]
    async fn should_refresh_from_change_bus_when_listening() {
        let (view, bus) = view(ListFilter::All);
        let (callback, mut rx) = collector();
        let _sub = view.subscribe(callback).await.unwrap();
        rx.recv().await.unwrap();

        let listener = tokio::spawn({
            let view = Arc::clone(&view);
            let events = bus.subscribe();
            async move { view.listen(events).await }
        });
        let created = view.create(aspirin()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), vec!["Aspirin".to_string()]);

        view.delete(created.id).await.unwrap();
        assert!(rx.recv().await.unwrap().is_empty());

        listener.abort();
    }
}
