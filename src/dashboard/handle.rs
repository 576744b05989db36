//! Binding of one dashboard view to the cache coordinator.

use super::DashboardData;
use crate::cache::{CacheCoordinator, CacheState, Snapshot, Subscription};
use crate::range::{reconcile, same_range, CalendarZone, DateRange, FilteredCollections};
use crate::records::{Contact, Seller};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

#[derive(Debug)]
struct View {
    range: Option<DateRange>,
    is_initial_load: bool,
    collections: FilteredCollections,
    sellers: Arc<Vec<Seller>>,
    all_contacts: Arc<Vec<Contact>>,
    is_demo: bool,
    cache_loading: bool,
    error: Option<String>,
    is_network_error: bool,
    last_fetch: Option<DateTime<Utc>>,
}

impl View {
    fn new(range: Option<DateRange>) -> Self {
        Self {
            range,
            is_initial_load: true,
            collections: FilteredCollections::empty(),
            sellers: Arc::default(),
            all_contacts: Arc::default(),
            is_demo: false,
            cache_loading: false,
            error: None,
            is_network_error: false,
            last_fetch: None,
        }
    }

    /// Re-derive the view from `state` for the selected range.
    fn absorb(&mut self, state: &CacheState, zone: CalendarZone) {
        self.cache_loading = state.is_loading;
        self.error = state.error.as_ref().map(|e| e.to_string());
        self.is_network_error = state.is_network_error;
        self.last_fetch = state.last_fetch;
        if let Some(snapshot) = &state.data {
            self.absorb_snapshot(snapshot, zone);
        }
    }

    fn absorb_snapshot(&mut self, snapshot: &Snapshot, zone: CalendarZone) {
        self.collections = reconcile(snapshot, self.range.as_ref(), zone);
        self.sellers = Arc::clone(&snapshot.sellers);
        self.all_contacts = Arc::clone(&snapshot.all_contacts);
        self.is_demo = snapshot.is_demo;
    }
}

struct Shared {
    cache: CacheCoordinator,
    mounted: AtomicBool,
    view: Mutex<View>,
}

impl Shared {
    /// Apply `mutate` to the view; a no-op once unmounted.
    fn update(&self, mutate: impl FnOnce(&mut View)) {
        let mut view = lock(&self.view);
        if self.mounted.load(Ordering::SeqCst) {
            mutate(&mut view);
        }
    }

    /// Absorb the latest cache state and end any pending initial load.
    fn settle(&self, fallback: Option<Arc<Snapshot>>) {
        let state = self.cache.get_cache_state();
        let zone = self.cache.zone();
        self.update(|view| {
            view.absorb(&state, zone);
            if state.data.is_none() {
                if let Some(snapshot) = &fallback {
                    view.absorb_snapshot(snapshot, zone);
                }
            }
            view.is_initial_load = false;
        });
    }
}

/// A mounted dashboard view.
///
/// Mounting reads through the cache for the selected range and subscribes to
/// cache changes; every notification re-derives the view. Unmounting (or
/// dropping the handle) stops all further updates.
pub struct DashboardHandle {
    shared: Arc<Shared>,
    subscription: Mutex<Option<Subscription>>,
}

impl DashboardHandle {
    /// Subscribe to `cache` and perform the initial load for `range`.
    pub async fn mount(cache: CacheCoordinator, range: Option<DateRange>) -> Self {
        let shared = Arc::new(Shared {
            cache: cache.clone(),
            mounted: AtomicBool::new(true),
            view: Mutex::new(View::new(range)),
        });

        // The coordinator owns the listener, so it only holds a weak reference back
        let weak: Weak<Shared> = Arc::downgrade(&shared);
        let subscription = cache.subscribe(move |state: &CacheState| {
            if let Some(shared) = weak.upgrade() {
                let zone = shared.cache.zone();
                shared.update(|view| view.absorb(state, zone));
            }
        });

        let handle = Self {
            shared,
            subscription: Mutex::new(Some(subscription)),
        };

        tracing::debug!(range = ?range, "Dashboard mounted");
        let snapshot = cache.get_data(false, range).await;
        handle.shared.settle(snapshot);
        handle
    }

    /// Current view.
    pub fn data(&self) -> DashboardData {
        let view = lock(&self.shared.view);
        DashboardData {
            contacts: Arc::clone(&view.collections.contacts),
            all_contacts: Arc::clone(&view.all_contacts),
            interactions: Arc::clone(&view.collections.interactions),
            sales: Arc::clone(&view.collections.sales),
            attempts: Arc::clone(&view.collections.attempts),
            sellers: Arc::clone(&view.sellers),
            is_loading: view.cache_loading && view.is_initial_load,
            is_demo: view.is_demo,
            error: view.error.clone(),
            is_network_error: view.is_network_error,
            is_initial_load: view.is_initial_load,
            date_range: view.range,
            last_fetch: view.last_fetch,
        }
    }

    pub fn range(&self) -> Option<DateRange> {
        lock(&self.shared.view).range
    }

    pub fn is_mounted(&self) -> bool {
        self.shared.mounted.load(Ordering::SeqCst)
    }

    /// Select a new range.
    ///
    /// The current snapshot is narrowed locally right away; when the calendar
    /// days changed, a forced reload scoped to the new range follows.
    pub async fn set_range(&self, range: Option<DateRange>) {
        if !self.is_mounted() {
            return;
        }
        let zone = self.shared.cache.zone();
        let changed = {
            let mut view = lock(&self.shared.view);
            let changed = !same_range(view.range.as_ref(), range.as_ref(), zone);
            view.range = range;
            changed
        };

        let state = self.shared.cache.get_cache_state();
        self.shared.update(|view| view.absorb(&state, zone));
        if !changed {
            return;
        }

        tracing::debug!(range = ?range, "Dashboard range changed, reloading");
        self.shared.cache.invalidate_cache(range).await;
        let state = self.shared.cache.get_cache_state();
        self.shared.update(|view| view.absorb(&state, zone));
    }

    /// User-triggered forced reload of the selected range.
    ///
    /// Failures show up in [`DashboardData::error`] and `is_network_error`.
    pub async fn refresh(&self) {
        if !self.is_mounted() {
            return;
        }
        let range = {
            let mut view = lock(&self.shared.view);
            view.is_initial_load = true;
            view.range
        };

        self.shared.cache.invalidate_cache(range).await;
        self.shared.settle(None);
    }

    /// Stop receiving cache updates. Later calls are no-ops.
    pub fn unmount(&self) {
        if self.shared.mounted.swap(false, Ordering::SeqCst) {
            lock(&self.subscription).take();
            tracing::debug!("Dashboard unmounted");
        }
    }
}

impl Drop for DashboardHandle {
    fn drop(&mut self) {
        self.unmount();
    }
}

impl std::fmt::Debug for DashboardHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardHandle")
            .field("range", &self.range())
            .field("mounted", &self.is_mounted())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheConfig, GatewayConfig};
    use crate::gateway::{FilterExpr, GatewayClient, GatewayError, RecordSource};
    use crate::records::Collection;
    use async_trait::async_trait;
    use chrono::{FixedOffset, NaiveDate};
    use serde_json::{json, Value};
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct StaticSource {
        sales: Mutex<Vec<Value>>,
        failure: Mutex<Option<GatewayError>>,
        sales_calls: AtomicUsize,
    }

    #[async_trait]
    impl RecordSource for StaticSource {
        fn is_configured(&self) -> bool {
            true
        }

        async fn fetch_all(
            &self,
            collection: Collection,
            _filter: Option<&FilterExpr>,
        ) -> Result<Vec<Value>, GatewayError> {
            if let Some(e) = self.failure.lock().unwrap().clone() {
                return Err(e);
            }
            match collection {
                Collection::Sales => {
                    self.sales_calls.fetch_add(1, Ordering::SeqCst);
                    Ok(self.sales.lock().unwrap().clone())
                }
                Collection::Sellers => Ok(vec![json!({"Id": 1, "Nombre de la Vendedora": "Ana"})]),
                _ => Ok(Vec::new()),
            }
        }
    }

    fn config() -> CacheConfig {
        CacheConfig {
            inter_request_delay_ms: 0,
            utc_offset_minutes: Some(0),
            ..Default::default()
        }
    }

    fn days(first: u32, last: u32) -> DateRange {
        let zone = CalendarZone::Fixed(FixedOffset::east_opt(0).unwrap());
        DateRange::from_days(
            zone,
            NaiveDate::from_ymd_opt(2024, 6, first).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, last).unwrap(),
        )
        .unwrap()
    }

    fn setup() -> (CacheCoordinator, Arc<StaticSource>) {
        let source = Arc::new(StaticSource::default());
        source.sales.lock().unwrap().extend([
            json!({"Id": 1, "Monto Final": 100, "Fecha": "2024-06-01 10:00:00"}),
            json!({"Id": 2, "Monto Final": 250, "Fecha": "2024-06-05 10:00:00"}),
        ]);
        let cache = CacheCoordinator::new(source.clone(), config());
        (cache, source)
    }

    #[tokio::test]
    async fn test_mount_performs_initial_load() {
        let (cache, _) = setup();
        let handle = DashboardHandle::mount(cache, Some(days(1, 7))).await;

        let data = handle.data();
        assert!(!data.is_initial_load);
        assert!(!data.is_loading);
        assert!(!data.is_demo);
        assert_eq!(data.sellers.len(), 1);
        assert_eq!(data.sales.len(), 2);
        assert_eq!(data.sales_total(), 350.0);
        assert_eq!(data.date_range, Some(days(1, 7)));
        assert!(data.last_fetch.is_some());
    }

    #[tokio::test]
    async fn test_mount_in_demo_mode() {
        let source = Arc::new(GatewayClient::new(GatewayConfig::default()).unwrap());
        let cache = CacheCoordinator::new(source, config());
        let handle = DashboardHandle::mount(cache, None).await;

        let data = handle.data();
        assert!(data.is_demo);
        assert!(data.sales.is_empty());
        assert!(data.error.is_none());
    }

    #[tokio::test]
    async fn test_set_range_reloads_for_new_days() {
        let (cache, source) = setup();
        let handle = DashboardHandle::mount(cache.clone(), Some(days(1, 7))).await;

        handle.set_range(Some(days(1, 1))).await;

        assert_eq!(source.sales_calls.load(Ordering::SeqCst), 2);
        assert_eq!(handle.range(), Some(days(1, 1)));
        assert_eq!(
            cache.get_cache_state().data.unwrap().date_range,
            Some(days(1, 1))
        );
    }

    #[tokio::test]
    async fn test_set_range_same_days_is_local() {
        let (cache, source) = setup();
        let handle = DashboardHandle::mount(cache, Some(days(1, 7))).await;

        let shifted = DateRange::new(
            days(1, 7).start + chrono::Duration::hours(3),
            days(1, 7).end,
        )
        .unwrap();
        handle.set_range(Some(shifted)).await;

        assert_eq!(source.sales_calls.load(Ordering::SeqCst), 1);
        // Same calendar days: the snapshot passes through unfiltered
        assert_eq!(handle.data().sales.len(), 2);
        assert_eq!(handle.range(), Some(shifted));
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_data_and_flags_error() {
        let (cache, source) = setup();
        let handle = DashboardHandle::mount(cache, Some(days(1, 7))).await;

        *source.failure.lock().unwrap() = Some(GatewayError::Network("connection reset".into()));
        handle.refresh().await;

        let data = handle.data();
        assert_eq!(data.sales.len(), 2);
        assert!(data.error.unwrap().contains("connection reset"));
        assert!(data.is_network_error);
        assert!(!data.is_initial_load);
        assert!(!data.is_loading);
    }

    #[tokio::test]
    async fn test_views_follow_cache_notifications() {
        let (cache, source) = setup();
        let watcher = DashboardHandle::mount(cache.clone(), Some(days(1, 7))).await;
        let other = DashboardHandle::mount(cache, Some(days(1, 7))).await;

        source
            .sales
            .lock()
            .unwrap()
            .push(json!({"Id": 3, "Monto Final": 50, "Fecha": "2024-06-06"}));
        other.refresh().await;

        assert_eq!(watcher.data().sales.len(), 3);
    }

    #[tokio::test]
    async fn test_unmount_stops_updates() {
        let (cache, source) = setup();
        let handle = DashboardHandle::mount(cache.clone(), Some(days(1, 7))).await;
        assert_eq!(cache.subscriber_count(), 1);

        handle.unmount();
        assert_eq!(cache.subscriber_count(), 0);
        assert!(!handle.is_mounted());

        source.sales.lock().unwrap().clear();
        cache.invalidate_cache(Some(days(1, 7))).await;
        handle.refresh().await;

        assert_eq!(handle.data().sales.len(), 2);
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let (cache, _) = setup();
        let handle = DashboardHandle::mount(cache.clone(), None).await;
        drop(handle);
        assert_eq!(cache.subscriber_count(), 0);
    }
}
