//! Raw gateway records to typed records.
//!
//! The remote schema is loosely typed: lookups arrive as arrays, nested objects or
//! scalars, and the same field may carry several names depending on the table
//! version. Every normalizer returns [`Normalized`], so a record that cannot be
//! identified is an explicit `Skipped` case instead of a coerced placeholder.

use super::infer;
use super::types::{Collection, Contact, Interaction, PurchaseAttempt, Sale, Seller};
use crate::range::CalendarZone;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};

/// Amount assumed for a purchase attempt that records none.
pub const DEFAULT_ATTEMPT_AMOUNT: f64 = 5000.0;

/// Outcome of normalizing one raw record.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized<T> {
    Accepted(T),
    Skipped(SkipReason),
}

impl<T> Normalized<T> {
    pub fn accepted(self) -> Option<T> {
        match self {
            Normalized::Accepted(record) => Some(record),
            Normalized::Skipped(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("record has no Id")]
    MissingId,
}

/// Typed records that can be built from one raw gateway value.
///
/// Timestamps written without an offset are wall-clock times in `zone`.
pub trait Normalize: Sized {
    const COLLECTION: Collection;

    fn normalize(raw: &Value, zone: CalendarZone) -> Normalized<Self>;
}

/// A normalized page: accepted records in input order plus how many were skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBatch<T> {
    pub records: Vec<T>,
    pub skipped: usize,
}

/// Normalize a batch of raw records, dropping (and logging) skipped ones.
pub fn normalize_all<T: Normalize>(raw: &[Value], zone: CalendarZone) -> NormalizedBatch<T> {
    let mut records = Vec::with_capacity(raw.len());
    let mut skipped = 0;

    for (index, value) in raw.iter().enumerate() {
        match T::normalize(value, zone) {
            Normalized::Accepted(record) => records.push(record),
            Normalized::Skipped(reason) => {
                skipped += 1;
                tracing::debug!(
                    collection = %T::COLLECTION,
                    index,
                    reason = %reason,
                    "Skipping raw record"
                );
            }
        }
    }

    NormalizedBatch { records, skipped }
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Loose truthiness: null, false, 0, "" and NaN count as absent.
fn present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// First present value among `keys`, in order.
fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().filter_map(|k| obj.get(*k)).find(|v| present(v))
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// First present scalar among `keys`, as text.
fn text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    field(obj, keys).and_then(scalar_string)
}

fn record_id(obj: &Map<String, Value>) -> Option<String> {
    field(obj, &["Id", "id"]).and_then(scalar_string)
}

/// Id of a linked record. Missing or unrecognized shapes give an empty string.
pub fn extract_id(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::Array(items)) => extract_id(items.first()),
        Some(Value::Object(obj)) => obj
            .get("Id")
            .filter(|v| !v.is_null())
            .or_else(|| obj.get("id"))
            .and_then(scalar_string)
            .unwrap_or_default(),
        Some(other) => scalar_string(other).unwrap_or_default(),
    }
}

/// Display name of a linked record.
pub fn extract_linked_name(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => extract_linked_name(items.first()),
        Some(Value::Object(obj)) => match obj.get("fields") {
            Some(Value::Object(fields)) => fields
                .iter()
                .find(|(k, _)| !k.eq_ignore_ascii_case("id"))
                .and_then(|(_, v)| scalar_string(v))
                .unwrap_or_default(),
            _ => String::new(),
        },
        _ => String::new(),
    }
}

/// URL of the first attachment, or a bare http(s) string.
pub fn extract_image(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Array(items) => {
            let first = items.first()?.as_object()?;
            field(first, &["signedUrl", "url"]).and_then(scalar_string)
        }
        Value::String(s) if s.starts_with("http") => Some(s.clone()),
        _ => None,
    }
}

/// Returned for dates that are missing or cannot be parsed.
pub fn epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

/// Parse a loosely formatted timestamp; failures give [`epoch`].
///
/// Strings without an offset are read as wall-clock times in `zone`.
pub fn parse_date(value: Option<&Value>, zone: CalendarZone) -> DateTime<Utc> {
    match value {
        Some(Value::String(s)) => parse_date_str(s.trim(), zone).unwrap_or_else(epoch),
        // Numeric dates are epoch milliseconds
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(epoch),
        _ => epoch(),
    }
}

fn parse_date_str(s: &str, zone: CalendarZone) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S%z", "%Y-%m-%d %H:%M%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(zone.instant(naive));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|day| zone.start_of_day(day))
}

/// Parse a monetary amount; strings keep only digits, dots and minus signs.
pub fn parse_amount(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => {
            let clean: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            clean.parse::<f64>().ok().filter(|f| f.is_finite()).unwrap_or(0.0)
        }
        _ => 0.0,
    }
}

fn parse_count(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

fn as_record(raw: &Value) -> Result<(&Map<String, Value>, String), SkipReason> {
    let obj = raw.as_object().ok_or(SkipReason::NotAnObject)?;
    let id = record_id(obj).ok_or(SkipReason::MissingId)?;
    Ok((obj, id))
}

macro_rules! try_record {
    ($raw:expr) => {
        match as_record($raw) {
            Ok(pair) => pair,
            Err(reason) => return Normalized::Skipped(reason),
        }
    };
}

// ---------------------------------------------------------------------------
// Per-collection normalizers
// ---------------------------------------------------------------------------

impl Normalize for Seller {
    const COLLECTION: Collection = Collection::Sellers;

    fn normalize(raw: &Value, _zone: CalendarZone) -> Normalized<Self> {
        let (obj, id) = try_record!(raw);

        Normalized::Accepted(Seller {
            id,
            name: text(obj, &["Nombre de la Vendedora", "Name", "Nombre"])
                .unwrap_or_else(|| "Sin Nombre".to_string()),
            avatar_url: extract_image(field(obj, &["Foto", "Avatar", "Imagen"])),
        })
    }
}

impl Normalize for Contact {
    const COLLECTION: Collection = Collection::Contacts;

    fn normalize(raw: &Value, zone: CalendarZone) -> Normalized<Self> {
        let (obj, id) = try_record!(raw);

        let raw_status = text(obj, &["Estado Actual", "Status", "Estado"]).unwrap_or_default();
        let raw_reason =
            text(obj, &["Motivo Venta Perdida", "LostReason", "Motivo"]).unwrap_or_default();
        let next_contact = field(obj, &["Próximo Contacto", "NextContactDate"]);
        let estimated = field(obj, &["Valor Estimado", "EstimatedValue"]);

        Normalized::Accepted(Contact {
            id,
            name: text(obj, &["Nombre", "Name"]).unwrap_or_else(|| "Lead Sin Nombre".to_string()),
            country: text(obj, &["País", "Country", "Pais"])
                .unwrap_or_else(|| "Desconocido".to_string()),
            created_at: parse_date(
                field(obj, &["Fecha y hora de creación", "CreatedAt", "created_at"]),
                zone,
            ),
            status: infer::lead_status(&raw_status),
            lost_reason: infer::lost_reason(&raw_reason),
            assigned_seller_id: extract_id(field(
                obj,
                &["Vendedora Asignada", "AssignedSeller", "Seller"],
            )),
            estimated_value: estimated.map(|v| parse_amount(Some(v))),
            lead_age_days: parse_count(field(obj, &["Antigüedad Lead (días)", "LeadAgeDays"])),
            next_contact_date: next_contact
                .map(|v| parse_date(Some(v), zone))
                .filter(|d| *d != epoch()),
            lead_source: field(obj, &["Nombre de la Etiqueta", "LeadSource", "Origen"])
                .map(|v| extract_linked_name(Some(v)))
                .filter(|s| !s.is_empty()),
            lost_reason_detail: (!raw_reason.trim().is_empty()).then_some(raw_reason),
        })
    }
}

impl Normalize for Interaction {
    const COLLECTION: Collection = Collection::Interactions;

    fn normalize(raw: &Value, zone: CalendarZone) -> Normalized<Self> {
        let (obj, id) = try_record!(raw);

        let raw_type = text(obj, &["Medio/Canal", "Type", "Tipo"]).unwrap_or_default();

        Normalized::Accepted(Interaction {
            id,
            contact_id: extract_id(field(obj, &["Contacto Involucrado", "Contact", "Contacto"])),
            seller_id: extract_id(field(obj, &["Realizada Por", "Seller", "Vendedora"])),
            kind: infer::interaction_type(&raw_type),
            date: parse_date(field(obj, &["Fecha", "Date", "created_at"]), zone),
            duration_minutes: parse_count(field(obj, &["Duración (Minutos)", "Duration"]))
                .unwrap_or(0),
            result: text(obj, &["Resultado", "Result", "Notas"]).unwrap_or_default(),
        })
    }
}

impl Normalize for Sale {
    const COLLECTION: Collection = Collection::Sales;

    fn normalize(raw: &Value, zone: CalendarZone) -> Normalized<Self> {
        let (obj, id) = try_record!(raw);

        let product = extract_linked_name(field(obj, &["Producto Vendido", "Product"]));

        Normalized::Accepted(Sale {
            id,
            contact_id: extract_id(field(obj, &["Contacto que Compró", "Contact", "Lead"])),
            seller_id: extract_id(field(obj, &["Quién Vendió", "Seller", "Vendedora"])),
            product_name: if product.is_empty() {
                "Servicio General".to_string()
            } else {
                product
            },
            amount: parse_amount(field(obj, &["Monto Final", "Amount", "Monto"])),
            date: parse_date(field(obj, &["Fecha", "Date", "created_at"]), zone),
            payment_status: text(obj, &["Estado del Pago", "PaymentStatus"]),
            sales_cycle_days: parse_count(obj.get("Sales_Cycle_Days")),
            interaction_count_snapshot: parse_count(obj.get("Interaction_Count_Snapshot")),
        })
    }
}

impl Normalize for PurchaseAttempt {
    const COLLECTION: Collection = Collection::Attempts;

    fn normalize(raw: &Value, zone: CalendarZone) -> Normalized<Self> {
        let (obj, id) = try_record!(raw);

        let raw_status = text(obj, &["Estado", "Status"]).unwrap_or_default();
        let amount = match field(obj, &["Monto", "Amount"]) {
            Some(v) => parse_amount(Some(v)),
            None => DEFAULT_ATTEMPT_AMOUNT,
        };

        Normalized::Accepted(PurchaseAttempt {
            id,
            contact_id: extract_id(field(obj, &["Quién Intentó Comprar", "Contact", "Lead"])),
            amount,
            status: infer::attempt_status(&raw_status),
            date: parse_date(field(obj, &["Fecha del Intento", "Date", "Fecha"]), zone),
            recovery_seller_id: extract_id(field(
                obj,
                &["Vendedora de Recuperación", "RecoverySeller", "Seller"],
            )),
        })
    }
}
