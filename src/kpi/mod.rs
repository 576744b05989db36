//! Dashboard indicators computed from a view's collections
//!
//! Every function here is pure: it reads typed records and returns counts,
//! sums and whole-number percentages. Percentages are rounded half away from
//! zero and are 0 whenever their denominator is empty.

use crate::dashboard::DashboardData;
use crate::records::{
    Contact, Interaction, LeadStatus, PurchaseAttempt, PurchaseAttemptStatus, Sale, Seller,
};
use serde::Serialize;

/// Stages still being worked; the rest are closed.
const ACTIVE_STATUSES: [LeadStatus; 3] = [
    LeadStatus::New,
    LeadStatus::Contacted,
    LeadStatus::Interested,
];

/// Reason label for lost contacts with neither a category nor a detail
pub const UNSPECIFIED_REASON: &str = "unspecified";

/// One funnel row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunnelStage {
    pub status: LeadStatus,
    pub count: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRevenue {
    pub product_name: String,
    pub quantity: usize,
    pub revenue: f64,
    pub percentage: u32,
}

/// Per-seller results, ranked by sales amount
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorPerformance {
    pub vendor_id: String,
    pub vendor_name: String,
    pub sales_count: usize,
    pub sales_amount: f64,
    /// Won share of the seller's closed contacts
    pub conversion_rate: u32,
    /// Mean sales cycle over sales that report one
    pub avg_closing_days: u32,
    pub active_leads: usize,
    pub interactions: usize,
    /// 1 for the highest sales amount
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LostReasonShare {
    pub reason: String,
    pub count: usize,
    pub percentage: u32,
}

/// Failed and abandoned purchase attempts, and how many a seller picked up
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryMetrics {
    pub total_recoverable: usize,
    pub recovered: usize,
    pub recovery_rate: u32,
    pub potential_value: f64,
    pub recovered_value: f64,
}

/// Headline indicators for one dashboard view.
///
/// Pipeline and funnel figures read the whole funnel (`all_contacts`), while
/// per-seller and lost-reason figures read the contacts of the selected range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    pub total_leads_in_pipeline: usize,
    pub conversion_rate: u32,
    pub pipeline_value: f64,
    pub sales_total: f64,
    pub average_ticket: f64,
    pub funnel: Vec<FunnelStage>,
    pub revenue_by_product: Vec<ProductRevenue>,
    pub vendors: Vec<VendorPerformance>,
    pub lost_reasons: Vec<LostReasonShare>,
    pub recovery: RecoveryMetrics,
}

impl From<&DashboardData> for Kpis {
    fn from(data: &DashboardData) -> Self {
        Self {
            total_leads_in_pipeline: total_leads_in_pipeline(&data.all_contacts),
            conversion_rate: conversion_rate(&data.all_contacts),
            pipeline_value: pipeline_value(&data.all_contacts),
            sales_total: data.sales_total(),
            average_ticket: average_ticket(&data.sales),
            funnel: funnel_by_status(&data.all_contacts),
            revenue_by_product: revenue_by_product(&data.sales),
            vendors: sales_by_vendor(&data.sales, &data.contacts, &data.interactions, &data.sellers),
            lost_reasons: lost_reasons(&data.contacts),
            recovery: recovery_metrics(&data.attempts),
        }
    }
}

/// Whole-number share of `part` in `total`, 0 for an empty total.
pub fn percentage(part: f64, total: f64) -> u32 {
    if total <= 0.0 {
        return 0;
    }
    (part / total * 100.0).round() as u32
}

fn is_active(contact: &Contact) -> bool {
    ACTIVE_STATUSES.contains(&contact.status)
}

pub fn total_leads_in_pipeline(contacts: &[Contact]) -> usize {
    contacts.iter().filter(|c| is_active(c)).count()
}

/// Won contacts over all closed contacts.
pub fn conversion_rate(contacts: &[Contact]) -> u32 {
    let won = contacts.iter().filter(|c| c.status == LeadStatus::ClosedWon).count();
    let lost = contacts.iter().filter(|c| c.status == LeadStatus::ClosedLost).count();
    percentage(won as f64, (won + lost) as f64)
}

/// Estimated value of open contacts; contacts without an estimate count as 0.
pub fn pipeline_value(contacts: &[Contact]) -> f64 {
    contacts
        .iter()
        .filter(|c| is_active(c))
        .filter_map(|c| c.estimated_value)
        .sum()
}

/// Contacts per stage in funnel order. All five stages are always present.
pub fn funnel_by_status(contacts: &[Contact]) -> Vec<FunnelStage> {
    let total = contacts.len();
    LeadStatus::ALL
        .into_iter()
        .map(|status| {
            let count = contacts.iter().filter(|c| c.status == status).count();
            FunnelStage {
                status,
                count,
                percentage: percentage(count as f64, total as f64),
            }
        })
        .collect()
}

/// Sales grouped by product name, highest revenue first.
///
/// Products with equal revenue keep the order they first appear in.
pub fn revenue_by_product(sales: &[Sale]) -> Vec<ProductRevenue> {
    let mut products: Vec<ProductRevenue> = Vec::new();
    for sale in sales {
        match products.iter_mut().find(|p| p.product_name == sale.product_name) {
            Some(product) => {
                product.quantity += 1;
                product.revenue += sale.amount;
            }
            None => products.push(ProductRevenue {
                product_name: sale.product_name.clone(),
                quantity: 1,
                revenue: sale.amount,
                percentage: 0,
            }),
        }
    }

    let total: f64 = products.iter().map(|p| p.revenue).sum();
    for product in &mut products {
        product.percentage = percentage(product.revenue, total);
    }
    products.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
    products
}

/// Mean sale amount rounded to a whole unit, 0 without sales.
pub fn average_ticket(sales: &[Sale]) -> f64 {
    if sales.is_empty() {
        return 0.0;
    }
    let total: f64 = sales.iter().map(|s| s.amount).sum();
    (total / sales.len() as f64).round()
}

/// One row per seller, including sellers without activity.
///
/// Sales, contacts and interactions referencing an unknown seller id are
/// ignored.
pub fn sales_by_vendor(
    sales: &[Sale],
    contacts: &[Contact],
    interactions: &[Interaction],
    sellers: &[Seller],
) -> Vec<VendorPerformance> {
    let mut vendors: Vec<VendorPerformance> = sellers
        .iter()
        .map(|seller| {
            let own_sales: Vec<&Sale> = sales.iter().filter(|s| s.seller_id == seller.id).collect();
            let own_contacts: Vec<&Contact> = contacts
                .iter()
                .filter(|c| c.assigned_seller_id == seller.id)
                .collect();

            let won = own_contacts.iter().filter(|c| c.status == LeadStatus::ClosedWon).count();
            let lost = own_contacts.iter().filter(|c| c.status == LeadStatus::ClosedLost).count();

            let cycles: Vec<u32> = own_sales
                .iter()
                .filter_map(|s| s.sales_cycle_days)
                .filter(|days| *days > 0)
                .collect();
            let avg_closing_days = if cycles.is_empty() {
                0
            } else {
                (cycles.iter().map(|d| f64::from(*d)).sum::<f64>() / cycles.len() as f64).round()
                    as u32
            };

            VendorPerformance {
                vendor_id: seller.id.clone(),
                vendor_name: seller.name.clone(),
                sales_count: own_sales.len(),
                sales_amount: own_sales.iter().map(|s| s.amount).sum(),
                conversion_rate: percentage(won as f64, (won + lost) as f64),
                avg_closing_days,
                active_leads: own_contacts.iter().filter(|c| is_active(c)).count(),
                interactions: interactions.iter().filter(|i| i.seller_id == seller.id).count(),
                rank: 0,
            }
        })
        .collect();

    vendors.sort_by(|a, b| b.sales_amount.total_cmp(&a.sales_amount));
    for (index, vendor) in vendors.iter_mut().enumerate() {
        vendor.rank = index + 1;
    }
    vendors
}

/// Distribution of reasons over closed-lost contacts, most frequent first.
///
/// The CRM's free-text reason wins over the inferred category.
pub fn lost_reasons(contacts: &[Contact]) -> Vec<LostReasonShare> {
    let lost: Vec<&Contact> = contacts
        .iter()
        .filter(|c| c.status == LeadStatus::ClosedLost)
        .collect();
    let total = lost.len();

    let mut shares: Vec<LostReasonShare> = Vec::new();
    for contact in lost {
        let reason = contact
            .lost_reason_detail
            .as_deref()
            .filter(|detail| !detail.trim().is_empty())
            .map(str::to_string)
            .or_else(|| contact.lost_reason.map(|r| r.as_str().to_string()))
            .unwrap_or_else(|| UNSPECIFIED_REASON.to_string());

        match shares.iter_mut().find(|s| s.reason == reason) {
            Some(share) => share.count += 1,
            None => shares.push(LostReasonShare { reason, count: 1, percentage: 0 }),
        }
    }

    for share in &mut shares {
        share.percentage = percentage(share.count as f64, total as f64);
    }
    shares.sort_by(|a, b| b.count.cmp(&a.count));
    shares
}

/// Recovery of failed and abandoned attempts.
///
/// An attempt counts as recovered once a recovery seller is assigned.
pub fn recovery_metrics(attempts: &[PurchaseAttempt]) -> RecoveryMetrics {
    let recoverable: Vec<&PurchaseAttempt> = attempts
        .iter()
        .filter(|a| {
            matches!(
                a.status,
                PurchaseAttemptStatus::Failed | PurchaseAttemptStatus::Abandoned
            )
        })
        .collect();
    let recovered: Vec<&&PurchaseAttempt> = recoverable
        .iter()
        .filter(|a| !a.recovery_seller_id.is_empty())
        .collect();

    RecoveryMetrics {
        total_recoverable: recoverable.len(),
        recovered: recovered.len(),
        recovery_rate: percentage(recovered.len() as f64, recoverable.len() as f64),
        potential_value: recoverable.iter().map(|a| a.amount).sum(),
        recovered_value: recovered.iter().map(|a| a.amount).sum(),
    }
}
