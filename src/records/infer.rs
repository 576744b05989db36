//! Keyword inference from free-text CRM fields.
//!
//! Each function lowercases its input and applies an ordered list of substring
//! rules; the first matching rule wins. The mapping is lossy on purpose: the CRM
//! carries many more statuses than the dashboard distinguishes.

use super::types::{InteractionType, LeadStatus, LostReason, PurchaseAttemptStatus};

/// Map a raw contact status (e.g. "Seguimiento Potencial venta") to a pipeline stage.
pub fn lead_status(raw: &str) -> LeadStatus {
    let s = raw.to_lowercase();

    if s.contains("nuevo") && !s.contains("seguimiento") {
        LeadStatus::New
    } else if s.contains("ganada") {
        LeadStatus::ClosedWon
    } else if s.contains("perdida") || s.contains("leads perdidos") || s.contains("no contactar")
    {
        LeadStatus::ClosedLost
    } else if s.contains("agendada") || s.contains("potencial venta") {
        LeadStatus::Interested
    } else if s.contains("seguimiento")
        || s.contains("contactar")
        || s.contains("nutrición")
        || s.contains("no se presentó")
    {
        LeadStatus::Contacted
    } else {
        LeadStatus::New
    }
}

/// Map a raw lost-sale reason to a category.
///
/// Only price, interest and competition wording is recognised; anything else has
/// no category and survives as the contact's free-text detail.
pub fn lost_reason(raw: &str) -> Option<LostReason> {
    let r = raw.trim().to_lowercase();
    if r.is_empty() {
        return None;
    }

    if r.contains("precio") || r.contains("caro") {
        Some(LostReason::Expensive)
    } else if r.contains("interesado") {
        Some(LostReason::NotInterested)
    } else if r.contains("oferta") || r.contains("competencia") {
        Some(LostReason::Competition)
    } else if r.contains("presupuesto") {
        Some(LostReason::Expensive)
    } else {
        None
    }
}

/// Map a raw channel name to an interaction type; unknown channels are WhatsApp.
pub fn interaction_type(raw: &str) -> InteractionType {
    let t = raw.to_lowercase();

    if t.contains("llamada") {
        InteractionType::Call
    } else if t.contains("email") {
        InteractionType::Email
    } else if t.contains("system.io") {
        InteractionType::System
    } else if t.contains("formulario") {
        InteractionType::Form
    } else if t.contains("manychat") {
        InteractionType::ManyChat
    } else if t.contains("sistema") {
        InteractionType::Other
    } else {
        InteractionType::WhatsApp
    }
}

/// Map a raw purchase-attempt status. "Closed"/"cancelled" wins over "recovered".
pub fn attempt_status(raw: &str) -> PurchaseAttemptStatus {
    let s = raw.to_lowercase();

    if s.contains("cerrado") || s.contains("cancelado") {
        PurchaseAttemptStatus::Failed
    } else if s.contains("recuperado") || s.contains("aprobado") {
        PurchaseAttemptStatus::Successful
    } else {
        PurchaseAttemptStatus::Abandoned
    }
}
