use super::CacheError;
use crate::range::DateRange;
use crate::records::{Contact, Interaction, PurchaseAttempt, Sale, Seller};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// One complete, immutable copy of all collections.
///
/// Collections are behind `Arc` so readers share them without copying; a
/// refresh builds a new `Snapshot` rather than touching an existing one.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub sellers: Arc<Vec<Seller>>,
    /// Contacts created within `date_range`
    pub contacts: Arc<Vec<Contact>>,
    /// Funnel contacts, independent of `date_range`
    pub all_contacts: Arc<Vec<Contact>>,
    pub interactions: Arc<Vec<Interaction>>,
    pub sales: Arc<Vec<Sale>>,
    pub attempts: Arc<Vec<PurchaseAttempt>>,
    pub fetched_at: DateTime<Utc>,
    pub is_demo: bool,
    /// Range sent to the gateway when this snapshot was produced
    pub date_range: Option<DateRange>,
}

impl Snapshot {
    /// Empty snapshot used when no gateway is configured.
    pub fn demo(fetched_at: DateTime<Utc>, date_range: Option<DateRange>) -> Self {
        Self {
            sellers: Arc::default(),
            contacts: Arc::default(),
            all_contacts: Arc::default(),
            interactions: Arc::default(),
            sales: Arc::default(),
            attempts: Arc::default(),
            fetched_at,
            is_demo: true,
            date_range,
        }
    }

    pub fn counts(&self) -> CollectionCounts {
        CollectionCounts {
            sellers: self.sellers.len(),
            contacts: self.contacts.len(),
            all_contacts: self.all_contacts.len(),
            interactions: self.interactions.len(),
            sales: self.sales.len(),
            attempts: self.attempts.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionCounts {
    pub sellers: usize,
    pub contacts: usize,
    pub all_contacts: usize,
    pub interactions: usize,
    pub sales: usize,
    pub attempts: usize,
}

impl CollectionCounts {
    pub fn total(&self) -> usize {
        self.sellers + self.contacts + self.interactions + self.sales + self.attempts
    }
}

/// Point-in-time view of the coordinator, handed to subscribers and readers.
#[derive(Debug, Clone, Default)]
pub struct CacheState {
    pub data: Option<Arc<Snapshot>>,
    pub is_loading: bool,
    pub error: Option<CacheError>,
    pub is_network_error: bool,
    pub last_fetch: Option<DateTime<Utc>>,
    /// Range of the in-flight or most recent fetch cycle
    pub current_range: Option<DateRange>,
}

impl CacheState {
    pub fn is_demo(&self) -> bool {
        self.data.as_ref().is_some_and(|s| s.is_demo)
    }
}
