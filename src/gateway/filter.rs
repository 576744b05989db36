//! Filter expressions in the gateway's `where` grammar.
//!
//! A clause is `(field,op,value)`; clauses combine with `~and` / `~or`.
//! Date comparisons use the `exactDate` qualifier: `(Fecha,gte,exactDate,2024-06-01)`.

use chrono::NaiveDate;
use std::fmt;

/// Contact statuses that feed the funnel and pipeline views.
pub const FUNNEL_STATUSES: [&str; 15] = [
    "Lead Nuevo",
    "En Seguimiento 24 hs después primer contacto",
    "En Seguimiento 7 días",
    "Llamada Agendada",
    "Seguimiento Cliente Nuevo",
    "Seguimiento venta perdida",
    "Seguimiento leads sin respuesta",
    "Seguimiento Potencial venta",
    "Contactar en 48 horas",
    "Nutrición a Largo Plazo",
    "No se presentó",
    "Venta Ganada",
    "Venta Perdida",
    "Leads perdidos (que nunca contestaron)",
    "no contactar",
];

/// Field holding the contact's free-text pipeline status.
pub const CONTACT_STATUS_FIELD: &str = "Estado Actual";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gt,
    Lt,
    Gte,
    Lte,
    In,
    Like,
    IsWithin,
}

impl FilterOp {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Gt => "gt",
            FilterOp::Lt => "lt",
            FilterOp::Gte => "gte",
            FilterOp::Lte => "lte",
            FilterOp::In => "in",
            FilterOp::Like => "like",
            FilterOp::IsWithin => "isWithin",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rendered filter expression, ready to send as the `where` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterExpr(String);

impl FilterExpr {
    pub fn clause(field: &str, op: FilterOp, value: impl fmt::Display) -> Self {
        Self(format!("({},{},{})", field, op, value))
    }

    /// Compare `field` against a calendar date using the `exactDate` qualifier.
    pub fn exact_date(field: &str, op: FilterOp, date: NaiveDate) -> Self {
        Self::clause(field, op, format_args!("exactDate,{}", date.format("%Y-%m-%d")))
    }

    /// `(field,in,v1,v2,...)`
    pub fn any_of<S: AsRef<str>>(field: &str, values: &[S]) -> Self {
        let joined = values
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(",");
        Self::clause(field, FilterOp::In, joined)
    }

    pub fn and(self, other: FilterExpr) -> Self {
        Self(format!("{}~and{}", self.0, other.0))
    }

    pub fn or(self, other: FilterExpr) -> Self {
        Self(format!("{}~or{}", self.0, other.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<FilterExpr> for String {
    fn from(expr: FilterExpr) -> Self {
        expr.0
    }
}
