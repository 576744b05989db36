//! Output formatting helpers for CLI commands

use crate::dashboard::DashboardData;
use crate::kpi::Kpis;
use crate::range::DateRange;
use crate::records::{LeadStatus, PurchaseAttemptStatus};
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};
use serde::Serialize;

/// Record count for one collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionRow {
    pub collection: &'static str,
    pub records: usize,
}

/// Count for one status value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRow {
    pub status: &'static str,
    pub count: usize,
}

/// View model for `salespulse fetch`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchSummary {
    pub is_demo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    pub collections: Vec<CollectionRow>,
    pub sales_total: f64,
    /// Funnel contacts by pipeline stage
    pub lead_status: Vec<StatusRow>,
    pub attempt_status: Vec<StatusRow>,
    pub kpis: Kpis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub is_network_error: bool,
}

impl From<&DashboardData> for FetchSummary {
    fn from(data: &DashboardData) -> Self {
        let collections = vec![
            CollectionRow { collection: "sellers", records: data.sellers.len() },
            CollectionRow { collection: "contacts", records: data.contacts.len() },
            CollectionRow { collection: "all_contacts", records: data.all_contacts.len() },
            CollectionRow { collection: "interactions", records: data.interactions.len() },
            CollectionRow { collection: "sales", records: data.sales.len() },
            CollectionRow { collection: "attempts", records: data.attempts.len() },
        ];

        let lead_status = LeadStatus::ALL
            .into_iter()
            .map(|status| StatusRow {
                status: status.as_str(),
                count: data.all_contacts.iter().filter(|c| c.status == status).count(),
            })
            .collect();

        let attempt_status = PurchaseAttemptStatus::ALL
            .into_iter()
            .map(|status| StatusRow {
                status: status.as_str(),
                count: data.attempts.iter().filter(|a| a.status == status).count(),
            })
            .collect();

        Self {
            is_demo: data.is_demo,
            date_range: data.date_range,
            collections,
            sales_total: data.sales_total(),
            lead_status,
            attempt_status,
            kpis: Kpis::from(data),
            error: data.error.clone(),
            is_network_error: data.is_network_error,
        }
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);
    table
}

/// Format a fetch summary as tables
pub fn format_fetch_table(summary: &FetchSummary) -> String {
    let mut out = String::new();

    if summary.is_demo {
        out.push_str(&format!(
            "{}\n",
            "Demo mode: no gateway configured, collections are empty".yellow()
        ));
    }
    if let Some(error) = &summary.error {
        let kind = if summary.is_network_error {
            "Network error"
        } else {
            "Gateway error"
        };
        out.push_str(&format!("{}\n", format!("{}: {}", kind, error).red()));
    }
    match &summary.date_range {
        Some(range) => out.push_str(&format!("Range: {}\n", range)),
        None => out.push_str("Range: all records\n"),
    }

    let mut collections = new_table(vec!["Collection", "Records"]);
    for row in &summary.collections {
        collections.add_row(vec![
            Cell::new(row.collection),
            Cell::new(row.records).set_alignment(CellAlignment::Right),
        ]);
    }
    out.push_str(&collections.to_string());
    out.push('\n');

    out.push_str(&format!(
        "Sales total: {}\n",
        format!("{:.2}", summary.sales_total).green()
    ));

    let mut statuses = new_table(vec!["Lead status", "Contacts"]);
    for row in &summary.lead_status {
        let label = match row.status {
            "closed_won" => row.status.green().to_string(),
            "closed_lost" => row.status.red().to_string(),
            _ => row.status.to_string(),
        };
        statuses.add_row(vec![
            Cell::new(label),
            Cell::new(row.count).set_alignment(CellAlignment::Right),
        ]);
    }
    out.push_str(&statuses.to_string());
    out.push('\n');

    let mut attempts = new_table(vec!["Attempt status", "Attempts"]);
    for row in &summary.attempt_status {
        attempts.add_row(vec![
            Cell::new(row.status),
            Cell::new(row.count).set_alignment(CellAlignment::Right),
        ]);
    }
    out.push_str(&attempts.to_string());
    out.push('\n');

    let kpis = &summary.kpis;
    let mut indicators = new_table(vec!["Indicator", "Value"]);
    for (name, value) in [
        ("Leads in pipeline", kpis.total_leads_in_pipeline.to_string()),
        ("Conversion rate", format!("{}%", kpis.conversion_rate)),
        ("Pipeline value", format!("{:.2}", kpis.pipeline_value)),
        ("Average ticket", format!("{:.0}", kpis.average_ticket)),
        ("Recovery rate", format!("{}%", kpis.recovery.recovery_rate)),
    ] {
        indicators.add_row(vec![
            Cell::new(name),
            Cell::new(value).set_alignment(CellAlignment::Right),
        ]);
    }
    out.push_str(&indicators.to_string());

    if !kpis.vendors.is_empty() {
        out.push('\n');
        let mut vendors = new_table(vec!["#", "Seller", "Sales", "Amount", "Conversion"]);
        for vendor in &kpis.vendors {
            vendors.add_row(vec![
                Cell::new(vendor.rank),
                Cell::new(&vendor.vendor_name),
                Cell::new(vendor.sales_count).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.2}", vendor.sales_amount))
                    .set_alignment(CellAlignment::Right),
                Cell::new(format!("{}%", vendor.conversion_rate))
                    .set_alignment(CellAlignment::Right),
            ]);
        }
        out.push_str(&vendors.to_string());
    }

    out
}

/// Format a fetch summary as JSON
pub fn format_fetch_json(summary: &FetchSummary) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(summary)
}
