//! Cache coordinator.
//!
//! Owns the single [`Snapshot`] of all collections and decides when to hit the
//! gateway:
//!
//! | Condition                                   | Behaviour                            |
//! |---------------------------------------------|--------------------------------------|
//! | requested range differs from the snapshot's | fetch now                            |
//! | `force_refresh`                             | fetch now                            |
//! | snapshot younger than `fresh`               | serve it                             |
//! | snapshot younger than `max_age`             | serve it, revalidate in background   |
//! | otherwise                                   | fetch now                            |
//!
//! Foreground fetch cycles for the same calendar-day range are shared: a caller
//! arriving while one is in flight awaits that cycle instead of starting another.
//! At most one background revalidation runs at a time.

mod clock;
mod error;
mod state;
mod subscribers;

pub use clock::{Clock, SystemClock};
pub use error::{classify_message, CacheError};
pub use state::{CacheState, CollectionCounts, Snapshot};
pub use subscribers::Subscription;

use crate::config::CacheConfig;
use crate::gateway::{fetch_records, GatewayError, RecordSource, FUNNEL_STATUSES};
use crate::range::{build_filter_expression, same_range, CalendarZone, DateRange};
use crate::records::{normalize_all, Collection, Contact, Interaction, PurchaseAttempt, Sale, Seller};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use subscribers::Subscribers;

type CycleOutcome = Result<Arc<Snapshot>, CacheError>;
type SharedCycle = Shared<BoxFuture<'static, CycleOutcome>>;

struct InFlight {
    generation: u64,
    range: Option<DateRange>,
    cycle: SharedCycle,
}

#[derive(Debug, Clone, Copy)]
enum CycleKind {
    Foreground { generation: u64 },
    /// `stores` is the store counter when the revalidation started
    Background { stores: u64 },
}

#[derive(Default)]
struct Guarded {
    view: CacheState,
    /// Number of snapshots stored so far
    stores: u64,
}

struct Inner {
    source: Arc<dyn RecordSource>,
    config: CacheConfig,
    zone: CalendarZone,
    clock: Arc<dyn Clock>,
    state: Mutex<Guarded>,
    /// Serializes mutate-then-notify so subscribers see mutations in order
    notify_order: Mutex<()>,
    subscribers: Arc<Subscribers>,
    /// Live foreground cycles, at most one per calendar-day range
    in_flight: Mutex<Vec<InFlight>>,
    revalidating: AtomicBool,
    active_cycles: AtomicUsize,
    generation: AtomicU64,
}

/// Read-through cache over a [`RecordSource`].
///
/// Cloning is cheap; clones share the same snapshot, subscribers and in-flight state.
///
/// # Examples
///
/// ```
/// use salespulse::cache::CacheCoordinator;
/// use salespulse::config::{CacheConfig, GatewayConfig};
/// use salespulse::gateway::GatewayClient;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() {
/// // No gateway URL: demo mode
/// let source = Arc::new(GatewayClient::new(GatewayConfig::default()).unwrap());
/// let cache = CacheCoordinator::new(source, CacheConfig::default());
///
/// let snapshot = cache.get_data(false, None).await.unwrap();
/// assert!(snapshot.is_demo);
/// assert!(!cache.get_cache_state().is_loading);
/// # }
/// ```
#[derive(Clone)]
pub struct CacheCoordinator {
    inner: Arc<Inner>,
}

impl CacheCoordinator {
    pub fn new(source: Arc<dyn RecordSource>, config: CacheConfig) -> Self {
        Self::with_clock(source, config, Arc::new(SystemClock))
    }

    /// Create a coordinator with a custom clock (for testing).
    pub fn with_clock(
        source: Arc<dyn RecordSource>,
        config: CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let zone = config.zone();
        Self {
            inner: Arc::new(Inner {
                source,
                config,
                zone,
                clock,
                state: Mutex::new(Guarded::default()),
                notify_order: Mutex::new(()),
                subscribers: Arc::new(Subscribers::default()),
                in_flight: Mutex::new(Vec::new()),
                revalidating: AtomicBool::new(false),
                active_cycles: AtomicUsize::new(0),
                generation: AtomicU64::new(0),
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Zone used for calendar-day comparisons.
    pub fn zone(&self) -> CalendarZone {
        self.inner.zone
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.inner.clock.now()
    }

    /// Current state. No side effects.
    pub fn get_cache_state(&self) -> CacheState {
        lock(&self.inner.state).view.clone()
    }

    pub fn is_revalidating(&self) -> bool {
        self.inner.revalidating.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Register `listener` for every state mutation.
    ///
    /// Listeners run synchronously, in registration order, on the task that
    /// mutated the state. They must not block.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&CacheState) + Send + Sync + 'static,
    {
        let id = self.inner.subscribers.add(Arc::new(listener));
        Subscription::new(id, &self.inner.subscribers)
    }

    /// Primary read path.
    ///
    /// Errors are never returned here: a failed cycle leaves the previous
    /// snapshot in place and records the error in [`CacheState`].
    pub async fn get_data(
        &self,
        force_refresh: bool,
        range: Option<DateRange>,
    ) -> Option<Arc<Snapshot>> {
        let current = self.get_cache_state().data;

        if let Some(snapshot) = current {
            if !same_range(snapshot.date_range.as_ref(), range.as_ref(), self.inner.zone) {
                record_read("range_change");
                tracing::debug!(
                    cached = ?snapshot.date_range,
                    requested = ?range,
                    "Requested range differs from snapshot, refetching"
                );
                return self.fetch_or_current(range).await;
            }

            if !force_refresh {
                let age = self.inner.age(&snapshot);
                if age < self.inner.config.fresh() {
                    record_read("fresh");
                    tracing::debug!(age_ms = age.as_millis() as u64, "Serving fresh snapshot");
                    return Some(snapshot);
                }
                if age < self.inner.config.max_age() {
                    record_read("stale");
                    tracing::debug!(
                        age_ms = age.as_millis() as u64,
                        "Serving stale snapshot, revalidating in background"
                    );
                    self.revalidate_in_background(range);
                    return Some(snapshot);
                }
            }
        }

        record_read(if force_refresh { "forced" } else { "miss" });
        self.fetch_or_current(range).await
    }

    /// Run a fetch cycle for `range` and wait for it.
    ///
    /// Joins an in-flight cycle for the same calendar days instead of starting a
    /// second one.
    pub async fn invalidate_cache(&self, range: Option<DateRange>) {
        let _ = self.run_foreground(range).await;
    }

    async fn fetch_or_current(&self, range: Option<DateRange>) -> Option<Arc<Snapshot>> {
        match self.run_foreground(range).await {
            Ok(snapshot) => Some(snapshot),
            Err(_) => self.get_cache_state().data,
        }
    }

    fn run_foreground(&self, range: Option<DateRange>) -> SharedCycle {
        let mut live = lock(&self.inner.in_flight);

        if let Some(in_flight) = live
            .iter()
            .find(|f| same_range(f.range.as_ref(), range.as_ref(), self.inner.zone))
        {
            tracing::debug!(
                generation = in_flight.generation,
                live = live.len(),
                "Joining in-flight fetch cycle"
            );
            return in_flight.cycle.clone();
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let _entry = InFlightGuard {
                inner: &inner,
                generation,
            };
            inner
                .execute_cycle(range, CycleKind::Foreground { generation })
                .await
        });

        let cycle = async move {
            handle
                .await
                .unwrap_or_else(|e| Err(CacheError::Other(format!("fetch cycle task failed: {}", e))))
        }
        .boxed()
        .shared();

        live.push(InFlight {
            generation,
            range,
            cycle: cycle.clone(),
        });
        cycle
    }

    fn revalidate_in_background(&self, range: Option<DateRange>) {
        if self
            .inner
            .revalidating
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Background revalidation already running");
            return;
        }

        let stores = lock(&self.inner.state).stores;
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let _flag = FlagGuard(&inner.revalidating);
            let _ = inner
                .execute_cycle(range, CycleKind::Background { stores })
                .await;
        });
    }
}

impl Inner {
    fn age(&self, snapshot: &Snapshot) -> Duration {
        (self.clock.now() - snapshot.fetched_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Apply `mutate`; if it reports a change, notify subscribers with the new state.
    fn update(&self, mutate: impl FnOnce(&mut Guarded) -> bool) {
        let _order = lock(&self.notify_order);
        let view = {
            let mut guarded = lock(&self.state);
            if !mutate(&mut guarded) {
                return;
            }
            guarded.view.clone()
        };
        self.subscribers.notify(&view);
    }

    async fn execute_cycle(&self, range: Option<DateRange>, kind: CycleKind) -> CycleOutcome {
        if let CycleKind::Foreground { .. } = kind {
            self.active_cycles.fetch_add(1, Ordering::SeqCst);
            self.update(|g| {
                g.view.is_loading = true;
                g.view.error = None;
                g.view.is_network_error = false;
                g.view.current_range = range;
                true
            });
        }

        let started = Instant::now();
        let limit = self.config.cycle_timeout();
        let result = match tokio::time::timeout(limit, self.fetch_snapshot(range)).await {
            Ok(result) => result.map(Arc::new),
            Err(_) => Err(CacheError::timeout("fetch cycle", limit)),
        };
        let elapsed = started.elapsed();
        metrics::histogram!("salespulse_cache_cycle_seconds").record(elapsed.as_secs_f64());

        match kind {
            CycleKind::Foreground { generation } => {
                self.finish_foreground(range, generation, result, elapsed)
            }
            CycleKind::Background { stores } => self.finish_background(range, stores, result),
        }
    }

    fn finish_foreground(
        &self,
        range: Option<DateRange>,
        generation: u64,
        result: CycleOutcome,
        elapsed: Duration,
    ) -> CycleOutcome {
        let still_loading = self.active_cycles.fetch_sub(1, Ordering::SeqCst) > 1;
        let superseded = self.config.reject_superseded_results
            && generation != self.generation.load(Ordering::SeqCst);

        if superseded {
            record_cycle("superseded");
            tracing::debug!(generation, "Discarding result of superseded fetch cycle");
            self.update(|g| {
                let changed = g.view.is_loading != still_loading;
                g.view.is_loading = still_loading;
                changed
            });
            return result;
        }

        match &result {
            Ok(snapshot) => {
                record_cycle(if snapshot.is_demo { "demo" } else { "success" });
                let counts = snapshot.counts();
                tracing::info!(
                    range = ?range,
                    sellers = counts.sellers,
                    contacts = counts.contacts,
                    all_contacts = counts.all_contacts,
                    interactions = counts.interactions,
                    sales = counts.sales,
                    attempts = counts.attempts,
                    demo = snapshot.is_demo,
                    duration_ms = elapsed.as_millis() as u64,
                    "Fetch cycle completed"
                );
                let snapshot = Arc::clone(snapshot);
                self.update(|g| {
                    g.view.last_fetch = Some(snapshot.fetched_at);
                    g.view.data = Some(snapshot);
                    g.view.is_loading = still_loading;
                    g.view.error = None;
                    g.view.is_network_error = false;
                    g.view.current_range = range;
                    g.stores += 1;
                    true
                });
            }
            Err(e) => {
                record_cycle("error");
                let is_network = e.is_network();
                tracing::warn!(
                    range = ?range,
                    error = %e,
                    network = is_network,
                    duration_ms = elapsed.as_millis() as u64,
                    "Fetch cycle failed, keeping previous snapshot"
                );
                let error = e.clone();
                self.update(|g| {
                    g.view.is_loading = still_loading;
                    g.view.error = Some(error);
                    g.view.is_network_error = is_network;
                    true
                });
            }
        }
        result
    }

    fn finish_background(
        &self,
        range: Option<DateRange>,
        stores_at_start: u64,
        result: CycleOutcome,
    ) -> CycleOutcome {
        match &result {
            Ok(snapshot) => {
                let snapshot = Arc::clone(snapshot);
                let mut accepted = false;
                self.update(|g| {
                    // A foreground cycle stored something newer meanwhile
                    if g.stores != stores_at_start {
                        return false;
                    }
                    g.view.last_fetch = Some(snapshot.fetched_at);
                    g.view.data = Some(snapshot);
                    g.view.error = None;
                    g.view.is_network_error = false;
                    g.view.current_range = range;
                    g.stores += 1;
                    accepted = true;
                    true
                });

                if accepted {
                    record_cycle("revalidated");
                    tracing::debug!(range = ?range, "Background revalidation stored new snapshot");
                } else {
                    record_cycle("superseded");
                    tracing::debug!("Discarding background result, a newer snapshot was stored");
                }
            }
            Err(e) => {
                record_cycle("error");
                tracing::debug!(error = %e, "Background revalidation failed");
            }
        }
        result
    }

    /// Fetch every collection for `range`.
    ///
    /// Order: sellers (never date-filtered), sales, contacts, funnel contacts,
    /// interactions, attempts. The funnel fetch falls back to the date-filtered
    /// contacts when it fails, times out or comes back empty.
    async fn fetch_snapshot(&self, range: Option<DateRange>) -> Result<Snapshot, CacheError> {
        if !self.source.is_configured() {
            tracing::debug!("Gateway not configured, producing demo snapshot");
            return Ok(Snapshot::demo(self.clock.now(), range));
        }

        let source = self.source.as_ref();
        let zone = self.zone;
        let range_ref = range.as_ref();
        // Server-side filtering keeps responses small; only pace unfiltered loads
        let pause = if range.is_some() {
            Duration::ZERO
        } else {
            self.config.inter_request_delay()
        };

        let sellers = self
            .timed(Collection::Sellers, fetch_records::<Seller>(source, None, zone))
            .await?;
        sleep(pause).await;

        let filter = build_filter_expression(range_ref, Collection::Sales, zone);
        let sales = self
            .timed(Collection::Sales, fetch_records::<Sale>(source, filter.as_ref(), zone))
            .await?;
        sleep(pause).await;

        let filter = build_filter_expression(range_ref, Collection::Contacts, zone);
        let contacts = Arc::new(
            self.timed(
                Collection::Contacts,
                fetch_records::<Contact>(source, filter.as_ref(), zone),
            )
            .await?,
        );
        sleep(pause).await;

        let all_contacts = self.fetch_funnel_contacts(&contacts).await;
        sleep(pause).await;

        let filter = build_filter_expression(range_ref, Collection::Interactions, zone);
        let interactions = self
            .timed(
                Collection::Interactions,
                fetch_records::<Interaction>(source, filter.as_ref(), zone),
            )
            .await?;
        sleep(pause).await;

        let filter = build_filter_expression(range_ref, Collection::Attempts, zone);
        let attempts = self
            .timed(
                Collection::Attempts,
                fetch_records::<PurchaseAttempt>(source, filter.as_ref(), zone),
            )
            .await?;

        Ok(Snapshot {
            sellers: Arc::new(sellers),
            contacts,
            all_contacts,
            interactions: Arc::new(interactions),
            sales: Arc::new(sales),
            attempts: Arc::new(attempts),
            fetched_at: self.clock.now(),
            is_demo: false,
            date_range: range,
        })
    }

    async fn fetch_funnel_contacts(&self, fallback: &Arc<Vec<Contact>>) -> Arc<Vec<Contact>> {
        let limit = self.config.funnel_timeout();
        let fetch = self.source.fetch_contacts_by_status(&FUNNEL_STATUSES);

        match tokio::time::timeout(limit, fetch).await {
            Ok(Ok(raw)) => {
                let batch = normalize_all::<Contact>(&raw, self.zone);
                if batch.records.is_empty() {
                    tracing::debug!("Funnel fetch returned no contacts, using date-filtered contacts");
                    Arc::clone(fallback)
                } else {
                    tracing::debug!(count = batch.records.len(), "Funnel contacts loaded");
                    Arc::new(batch.records)
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Funnel contacts fetch failed, using date-filtered contacts");
                Arc::clone(fallback)
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = limit.as_millis() as u64,
                    "Funnel contacts fetch timed out, using date-filtered contacts"
                );
                Arc::clone(fallback)
            }
        }
    }

    async fn timed<T>(
        &self,
        collection: Collection,
        fetch: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, CacheError> {
        let limit = self.config.collection_timeout();
        match tokio::time::timeout(limit, fetch).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => Err(CacheError::timeout(collection.name(), limit)),
        }
    }

    fn clear_in_flight(&self, generation: u64) {
        lock(&self.in_flight).retain(|f| f.generation != generation);
    }
}

/// Removes a cycle's in-flight entry when it ends, including by panic.
struct InFlightGuard<'a> {
    inner: &'a Inner,
    generation: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.inner.clear_in_flight(self.generation);
    }
}

struct FlagGuard<'a>(&'a AtomicBool);

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

async fn sleep(pause: Duration) {
    if !pause.is_zero() {
        tokio::time::sleep(pause).await;
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn record_read(outcome: &'static str) {
    metrics::counter!("salespulse_cache_reads_total", "outcome" => outcome).increment(1);
}

fn record_cycle(result: &'static str) {
    metrics::counter!("salespulse_cache_fetch_cycles_total", "result" => result).increment(1);
}
