//! Cache coordinator configuration

use crate::range::CalendarZone;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Staleness tiers, timeouts and pacing for the cache coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Snapshots younger than this are served without any network activity
    pub fresh_seconds: u64,
    /// Snapshots younger than this are served while revalidating in the background
    pub max_age_seconds: u64,
    /// Timeout wrapped around each collection fetch
    pub collection_timeout_ms: u64,
    /// Whole fetch cycle timeout, as a multiple of the collection timeout
    pub cycle_timeout_factor: u32,
    /// Funnel contacts fetch timeout, as a multiple of the collection timeout
    pub funnel_timeout_factor: u32,
    /// Pause between collection fetches when no date filter is sent
    pub inter_request_delay_ms: u64,
    /// Viewer's UTC offset for calendar-day logic; absent means the system zone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utc_offset_minutes: Option<i32>,
    /// Drop results of fetch cycles superseded by a newer one
    pub reject_superseded_results: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            fresh_seconds: 5 * 60,
            max_age_seconds: 30 * 60,
            collection_timeout_ms: 10_000,
            cycle_timeout_factor: 5,
            funnel_timeout_factor: 3,
            inter_request_delay_ms: 50,
            utc_offset_minutes: None,
            reject_superseded_results: false,
        }
    }
}

impl CacheConfig {
    pub fn fresh(&self) -> Duration {
        Duration::from_secs(self.fresh_seconds)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_seconds)
    }

    pub fn collection_timeout(&self) -> Duration {
        Duration::from_millis(self.collection_timeout_ms)
    }

    pub fn cycle_timeout(&self) -> Duration {
        self.collection_timeout() * self.cycle_timeout_factor.max(1)
    }

    pub fn funnel_timeout(&self) -> Duration {
        self.collection_timeout() * self.funnel_timeout_factor.max(1)
    }

    pub fn inter_request_delay(&self) -> Duration {
        Duration::from_millis(self.inter_request_delay_ms)
    }

    /// Calendar zone used for day comparisons and filter dates.
    ///
    /// Out-of-range offsets fall back to the system zone; `validate` rejects them earlier.
    pub fn zone(&self) -> CalendarZone {
        self.utc_offset_minutes
            .and_then(|m| m.checked_mul(60))
            .and_then(FixedOffset::east_opt)
            .map(CalendarZone::Fixed)
            .unwrap_or(CalendarZone::Local)
    }
}
