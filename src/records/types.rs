use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The five record collections exposed by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Sellers,
    Contacts,
    Interactions,
    Sales,
    Attempts,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Sellers,
        Collection::Contacts,
        Collection::Interactions,
        Collection::Sales,
        Collection::Attempts,
    ];

    /// Path segment used by the gateway (`/collections/{name}`).
    pub fn name(self) -> &'static str {
        match self {
            Collection::Sellers => "sellers",
            Collection::Contacts => "contacts",
            Collection::Interactions => "interactions",
            Collection::Sales => "sales",
            Collection::Attempts => "attempts",
        }
    }

    /// The field the gateway filters date ranges on. Sellers are never date-filtered.
    pub fn date_field(self) -> Option<&'static str> {
        match self {
            Collection::Sellers => None,
            Collection::Contacts => Some("Fecha y hora de creación"),
            Collection::Interactions | Collection::Sales => Some("Fecha"),
            Collection::Attempts => Some("Fecha del Intento"),
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Collection::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown collection: {}", s))
    }
}

/// Pipeline stage of a contact, inferred from the free-text CRM status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Interested,
    ClosedWon,
    ClosedLost,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 5] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Interested,
        LeadStatus::ClosedWon,
        LeadStatus::ClosedLost,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Interested => "interested",
            LeadStatus::ClosedWon => "closed_won",
            LeadStatus::ClosedLost => "closed_lost",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LostReason {
    Expensive,
    NotInterested,
    NoAnswer,
    Competition,
    Timing,
    Other,
}

impl LostReason {
    pub fn as_str(self) -> &'static str {
        match self {
            LostReason::Expensive => "expensive",
            LostReason::NotInterested => "not_interested",
            LostReason::NoAnswer => "no_answer",
            LostReason::Competition => "competition",
            LostReason::Timing => "timing",
            LostReason::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    Call,
    #[serde(rename = "whatsapp")]
    WhatsApp,
    Email,
    System,
    Form,
    #[serde(rename = "manychat")]
    ManyChat,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseAttemptStatus {
    Successful,
    Failed,
    Abandoned,
}

impl PurchaseAttemptStatus {
    pub const ALL: [PurchaseAttemptStatus; 3] = [
        PurchaseAttemptStatus::Successful,
        PurchaseAttemptStatus::Failed,
        PurchaseAttemptStatus::Abandoned,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PurchaseAttemptStatus::Successful => "successful",
            PurchaseAttemptStatus::Failed => "failed",
            PurchaseAttemptStatus::Abandoned => "abandoned",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seller {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub country: String,
    pub created_at: DateTime<Utc>,
    pub status: LeadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lost_reason: Option<LostReason>,
    pub assigned_seller_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_age_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_contact_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_source: Option<String>,
    /// Original free-text lost reason, kept alongside the inferred category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lost_reason_detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub id: String,
    pub contact_id: String,
    pub seller_id: String,
    #[serde(rename = "type")]
    pub kind: InteractionType,
    pub date: DateTime<Utc>,
    pub duration_minutes: u32,
    pub result: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub contact_id: String,
    pub seller_id: String,
    pub product_name: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_cycle_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction_count_snapshot: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseAttempt {
    pub id: String,
    pub contact_id: String,
    pub amount: f64,
    pub status: PurchaseAttemptStatus,
    pub date: DateTime<Utc>,
    pub recovery_seller_id: String,
}

/// Records carrying the timestamp their collection is date-filtered on.
pub trait Dated {
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Dated for Contact {
    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Dated for Interaction {
    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }
}

impl Dated for Sale {
    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }
}

impl Dated for PurchaseAttempt {
    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }
}
