//! Type definitions for dashboard data

use crate::range::DateRange;
use crate::records::{Contact, Interaction, PurchaseAttempt, Sale, Seller};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Everything a dashboard view renders from, for one selected range.
///
/// Collection fields share storage with the cache snapshot; treat them as read-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    /// Contacts created within the selected range
    pub contacts: Arc<Vec<Contact>>,
    /// Funnel contacts, regardless of the selected range
    pub all_contacts: Arc<Vec<Contact>>,
    pub interactions: Arc<Vec<Interaction>>,
    pub sales: Arc<Vec<Sale>>,
    pub attempts: Arc<Vec<PurchaseAttempt>>,
    pub sellers: Arc<Vec<Seller>>,
    /// True only while the first load (or a user refresh) is pending
    pub is_loading: bool,
    pub is_demo: bool,
    /// Message of the last failed fetch cycle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub is_network_error: bool,
    pub is_initial_load: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_fetch: Option<DateTime<Utc>>,
}

impl DashboardData {
    /// Sum of all sale amounts in the selected range.
    pub fn sales_total(&self) -> f64 {
        self.sales.iter().map(|s| s.amount).sum()
    }
}
