use super::{ranges_equal_by_calendar_day, CalendarZone, DateRange};
use crate::cache::Snapshot;
use crate::records::{Contact, Dated, Interaction, PurchaseAttempt, Sale};
use serde::Serialize;
use std::sync::Arc;

/// The date-bearing collections of a snapshot, narrowed to a requested range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredCollections {
    pub contacts: Arc<Vec<Contact>>,
    pub interactions: Arc<Vec<Interaction>>,
    pub sales: Arc<Vec<Sale>>,
    pub attempts: Arc<Vec<PurchaseAttempt>>,
}

impl FilteredCollections {
    /// The snapshot's own collections, shared rather than copied.
    pub fn shared(snapshot: &Snapshot) -> Self {
        Self {
            contacts: Arc::clone(&snapshot.contacts),
            interactions: Arc::clone(&snapshot.interactions),
            sales: Arc::clone(&snapshot.sales),
            attempts: Arc::clone(&snapshot.attempts),
        }
    }

    pub fn empty() -> Self {
        Self {
            contacts: Arc::default(),
            interactions: Arc::default(),
            sales: Arc::default(),
            attempts: Arc::default(),
        }
    }
}

fn within<T: Dated + Clone>(records: &[T], range: &DateRange) -> Arc<Vec<T>> {
    Arc::new(
        records
            .iter()
            .filter(|r| range.contains(r.timestamp()))
            .cloned()
            .collect(),
    )
}

/// Narrow `snapshot` to `requested`.
///
/// When the snapshot was fetched for the same calendar days, its collections are
/// returned as-is (the same `Arc`s). Otherwise records are kept when their
/// timestamp lies in `[start, end]`, compared exactly. With no requested range
/// there is nothing to narrow and the snapshot's collections are returned.
pub fn reconcile(
    snapshot: &Snapshot,
    requested: Option<&DateRange>,
    zone: CalendarZone,
) -> FilteredCollections {
    let Some(range) = requested else {
        return FilteredCollections::shared(snapshot);
    };
    if ranges_equal_by_calendar_day(snapshot.date_range.as_ref(), Some(range), zone) {
        return FilteredCollections::shared(snapshot);
    }

    tracing::debug!(
        snapshot_range = ?snapshot.date_range,
        requested = %range,
        "Filtering snapshot locally for requested range"
    );

    FilteredCollections {
        contacts: within(&snapshot.contacts, range),
        interactions: within(&snapshot.interactions, range),
        sales: within(&snapshot.sales, range),
        attempts: within(&snapshot.attempts, range),
    }
}
