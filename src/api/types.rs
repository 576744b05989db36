//! Request and response types for the read API.

use crate::cache::CollectionCounts;
use crate::range::{resolve_selection, CalendarZone, DateRange, RangeError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Range selection accepted by the dashboard endpoints.
///
/// Either `start` and `end` (`YYYY-MM-DD`, both inclusive) or a `preset`
/// such as `last_7_days`. Nothing selected means an unfiltered load.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RangeQuery {
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub preset: Option<String>,
}

impl RangeQuery {
    pub fn resolve(
        &self,
        zone: CalendarZone,
        now: DateTime<Utc>,
    ) -> Result<Option<DateRange>, RangeError> {
        resolve_selection(
            non_empty(&self.start),
            non_empty(&self.end),
            non_empty(&self.preset),
            zone,
            now,
        )
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// GET /health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `healthy`, `degraded` (last fetch cycle failed) or `demo`
    pub status: String,
    pub uptime_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_fetch: Option<DateTime<Utc>>,
}

/// GET /api/cache response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatusResponse {
    pub is_loading: bool,
    pub is_revalidating: bool,
    pub is_demo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_fetch: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_seconds: Option<u64>,
    /// Range the stored snapshot was fetched for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    /// Range of the in-flight or most recent fetch cycle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_range: Option<DateRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub is_network_error: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<CollectionCountsBody>,
    pub subscribers: usize,
}

/// Snapshot record counts, as reported by GET /api/cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionCountsBody {
    pub sellers: usize,
    pub contacts: usize,
    pub all_contacts: usize,
    pub interactions: usize,
    pub sales: usize,
    pub attempts: usize,
}

impl From<CollectionCounts> for CollectionCountsBody {
    fn from(counts: CollectionCounts) -> Self {
        Self {
            sellers: counts.sellers,
            contacts: counts.contacts,
            all_contacts: counts.all_contacts,
            interactions: counts.interactions,
            sales: counts.sales,
            attempts: counts.attempts,
        }
    }
}

/// Error envelope: `{"error": {"message", "type", "code"}}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub error: ApiErrorBody,
}

/// Error details.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiErrorBody {
    pub message: String,
    pub r#type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiError {
    /// Create a bad request error (400).
    pub fn bad_request(message: &str) -> Self {
        Self {
            error: ApiErrorBody {
                message: message.to_string(),
                r#type: "invalid_request_error".to_string(),
                param: None,
                code: Some("invalid_request_error".to_string()),
            },
        }
    }

    /// Create an invalid range error (400) naming the offending parameter.
    pub fn invalid_range(error: &RangeError) -> Self {
        let param = match error {
            RangeError::UnknownPreset(_) => "preset",
            RangeError::Inverted { .. } | RangeError::Incomplete => "end",
            RangeError::InvalidDate(_) | RangeError::Conflicting => "start",
        };
        Self {
            error: ApiErrorBody {
                message: error.to_string(),
                r#type: "invalid_request_error".to_string(),
                param: Some(param.to_string()),
                code: Some("invalid_range".to_string()),
            },
        }
    }

    fn status_code(&self) -> StatusCode {
        match self.error.r#type.as_str() {
            "invalid_request_error" => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RangeError> for ApiError {
    fn from(error: RangeError) -> Self {
        Self::invalid_range(&error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}
