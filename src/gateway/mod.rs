//! Remote data gateway client.
//!
//! The gateway exposes one endpoint per collection:
//!
//! ```text
//! GET {base_url}{path_prefix}/{collection}?limit=N&offset=M[&where=EXPR][&sort=FIELD]
//! -> { "list": [...], "pageInfo": { "isLastPage": bool, "totalRows": n } }
//! ```
//!
//! [`GatewayClient::fetch_all`] walks the pages of one collection. Transport
//! failures propagate. A page answered with 429, 500, 502 or 503 is retried with
//! exponential backoff; once retries run out, or on any other bad status or an
//! undecodable page, pagination ends and the records gathered so far are
//! returned.

mod error;
pub mod filter;

pub use error::GatewayError;
pub use filter::{FilterExpr, FilterOp, CONTACT_STATUS_FIELD, FUNNEL_STATUSES};

use crate::config::GatewayConfig;
use crate::range::CalendarZone;
use crate::records::{normalize_all, Collection, Normalize};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Where the cache coordinator gets raw records from.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// False means demo mode: no network calls should be attempted.
    fn is_configured(&self) -> bool;

    /// Every raw record of `collection` matching `filter`, across all pages.
    async fn fetch_all(
        &self,
        collection: Collection,
        filter: Option<&FilterExpr>,
    ) -> Result<Vec<Value>, GatewayError>;

    /// Contacts whose status is one of `statuses`, regardless of date.
    async fn fetch_contacts_by_status(&self, statuses: &[&str]) -> Result<Vec<Value>, GatewayError> {
        let filter = FilterExpr::any_of(CONTACT_STATUS_FIELD, statuses);
        self.fetch_all(Collection::Contacts, Some(&filter)).await
    }
}

/// Fetch and normalize one collection into typed records.
///
/// Timestamps without an offset are read as wall-clock times in `zone`.
pub async fn fetch_records<T: Normalize>(
    source: &dyn RecordSource,
    filter: Option<&FilterExpr>,
    zone: CalendarZone,
) -> Result<Vec<T>, GatewayError> {
    let raw = source.fetch_all(T::COLLECTION, filter).await?;
    let batch = normalize_all::<T>(&raw, zone);
    if batch.skipped > 0 {
        tracing::debug!(
            collection = %T::COLLECTION,
            skipped = batch.skipped,
            accepted = batch.records.len(),
            "Skipped malformed records"
        );
    }
    Ok(batch.records)
}

/// One page of a collection as returned by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub list: Option<Vec<Value>>,
    #[serde(default, rename = "pageInfo")]
    pub page_info: Option<PageInfo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub is_last_page: bool,
    #[serde(default)]
    pub total_rows: Option<u64>,
}

/// HTTP client for the collection gateway.
pub struct GatewayClient {
    client: reqwest::Client,
    config: GatewayConfig,
    token: Option<String>,
}

impl GatewayClient {
    /// Create a client with a pooled reqwest client using the configured timeout.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        Ok(Self::with_client(config, client))
    }

    /// Create a client around an existing reqwest client (for testing).
    pub fn with_client(config: GatewayConfig, client: reqwest::Client) -> Self {
        let token = config.token();
        Self {
            client,
            config,
            token,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Full URL of a collection endpoint, or `None` in demo mode.
    pub fn collection_url(&self, collection: Collection) -> Option<String> {
        let base = self.config.base_url.as_deref()?.trim().trim_end_matches('/');
        if base.is_empty() {
            return None;
        }
        let prefix = self.config.path_prefix.trim().trim_end_matches('/');
        let separator = if prefix.is_empty() || prefix.starts_with('/') {
            ""
        } else {
            "/"
        };
        Some(format!("{}{}{}/{}", base, separator, prefix, collection.name()))
    }

    fn sort_for(&self, collection: Collection) -> Option<String> {
        if !self.config.sort_by_date {
            return None;
        }
        collection.date_field().map(|field| format!("-{}", field))
    }

    /// Request a single page.
    pub async fn fetch_page(
        &self,
        collection: Collection,
        filter: Option<&FilterExpr>,
        offset: u64,
    ) -> Result<Page, GatewayError> {
        let url = self
            .collection_url(collection)
            .ok_or(GatewayError::NotConfigured)?;

        let mut query: Vec<(&str, String)> = vec![
            ("limit", self.config.page_size.to_string()),
            ("offset", offset.to_string()),
        ];
        if let Some(filter) = filter {
            query.push(("where", filter.to_string()));
        }
        if let Some(sort) = self.sort_for(collection) {
            query.push(("sort", sort));
        }

        let mut request = self.client.get(&url).query(&query);
        if let Some(token) = &self.token {
            request = request.header(self.config.token_header.as_str(), token.as_str());
        }

        let response = request.send().await.map_err(|e| self.classify_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Http {
                status: status.as_u16(),
                collection: collection.name().to_string(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.classify_error(e))?;
        serde_json::from_slice::<Page>(&body).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    /// Request a single page, retrying statuses the gateway uses for overload.
    pub async fn fetch_page_with_retry(
        &self,
        collection: Collection,
        filter: Option<&FilterExpr>,
        offset: u64,
    ) -> Result<Page, GatewayError> {
        let mut attempt = 0;
        loop {
            match self.fetch_page(collection, filter, offset).await {
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.retry_delay(attempt);
                    attempt += 1;
                    record_error(collection, &e);
                    tracing::debug!(
                        collection = %collection,
                        offset,
                        attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying page"
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    /// Walk all pages of `collection`.
    ///
    /// Stops on `isLastPage`, an empty page, a short page when the gateway sends no
    /// page info, or after `max_pages` requests. The offset advances by the number of
    /// records actually received, so a gateway that caps the page size is handled.
    pub async fn fetch_all(
        &self,
        collection: Collection,
        filter: Option<&FilterExpr>,
    ) -> Result<Vec<Value>, GatewayError> {
        let page_size = self.config.page_size as usize;
        let max_pages = self.config.max_pages.max(1);
        let mut records: Vec<Value> = Vec::new();
        let mut offset: u64 = 0;
        let mut pages = 0;

        loop {
            if pages >= max_pages {
                tracing::warn!(
                    collection = %collection,
                    max_pages,
                    records = records.len(),
                    "Page limit reached, stopping pagination"
                );
                break;
            }
            pages += 1;

            let page = match self.fetch_page_with_retry(collection, filter, offset).await {
                Ok(page) => page,
                Err(e) if e.is_network() || e == GatewayError::NotConfigured => {
                    record_error(collection, &e);
                    return Err(e);
                }
                Err(e) => {
                    record_error(collection, &e);
                    tracing::warn!(
                        collection = %collection,
                        page = pages,
                        records = records.len(),
                        error = %e,
                        "Stopping pagination, returning partial results"
                    );
                    break;
                }
            };

            let Some(list) = page.list else {
                tracing::warn!(
                    collection = %collection,
                    page = pages,
                    "Page has no record list, stopping pagination"
                );
                break;
            };

            let count = list.len();
            metrics::counter!("salespulse_gateway_pages_total", "collection" => collection.name())
                .increment(1);
            metrics::counter!("salespulse_gateway_records_total", "collection" => collection.name())
                .increment(count as u64);

            if pages == 1 {
                tracing::debug!(
                    collection = %collection,
                    count,
                    total_rows = ?page.page_info.as_ref().and_then(|i| i.total_rows),
                    "First page received"
                );
            }

            records.extend(list);

            let is_last = match &page.page_info {
                Some(info) => info.is_last_page,
                None => count < page_size,
            };
            if is_last || count == 0 {
                break;
            }
            offset += count as u64;
        }

        tracing::debug!(
            collection = %collection,
            pages,
            records = records.len(),
            filtered = filter.is_some(),
            "Collection fetched"
        );
        Ok(records)
    }

    fn classify_error(&self, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout(self.config.request_timeout_seconds * 1000)
        } else {
            // Connect, DNS, reset and body-read failures are all connectivity problems
            GatewayError::Network(e.to_string())
        }
    }
}

fn record_error(collection: Collection, e: &GatewayError) {
    metrics::counter!(
        "salespulse_gateway_errors_total",
        "collection" => collection.name(),
        "kind" => e.kind()
    )
    .increment(1);
}

#[async_trait]
impl RecordSource for GatewayClient {
    fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn fetch_all(
        &self,
        collection: Collection,
        filter: Option<&FilterExpr>,
    ) -> Result<Vec<Value>, GatewayError> {
        GatewayClient::fetch_all(self, collection, filter).await
    }
}
