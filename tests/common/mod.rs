//! Shared test utilities for salespulse integration tests.
//!
//! Gateway fixtures served by wiremock, config builders and app construction.

#![allow(dead_code)]

use chrono::{FixedOffset, NaiveDate};
use salespulse::api::{create_router, AppState};
use salespulse::cache::CacheCoordinator;
use salespulse::config::{CacheConfig, GatewayConfig, PulseConfig};
use salespulse::gateway::GatewayClient;
use salespulse::range::{CalendarZone, DateRange};
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param_contains, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Config Builders
// =============================================================================

/// Gateway config pointing at a mock server.
pub fn gateway_config(server: &MockServer) -> GatewayConfig {
    GatewayConfig {
        base_url: Some(server.uri()),
        request_timeout_seconds: 5,
        retry_base_delay_ms: 1,
        ..Default::default()
    }
}

/// Cache config with no pacing and UTC calendar days.
pub fn cache_config() -> CacheConfig {
    CacheConfig {
        inter_request_delay_ms: 0,
        collection_timeout_ms: 5_000,
        utc_offset_minutes: Some(0),
        ..Default::default()
    }
}

pub fn utc() -> CalendarZone {
    CalendarZone::Fixed(FixedOffset::east_opt(0).unwrap())
}

/// Whole UTC days of June 2024.
pub fn june(first: u32, last: u32) -> DateRange {
    DateRange::from_days(
        utc(),
        NaiveDate::from_ymd_opt(2024, 6, first).unwrap(),
        NaiveDate::from_ymd_opt(2024, 6, last).unwrap(),
    )
    .unwrap()
}

// =============================================================================
// Gateway Fixtures
// =============================================================================

/// A gateway page body.
pub fn page(list: Vec<Value>, is_last_page: bool) -> Value {
    let total_rows = list.len();
    json!({
        "list": list,
        "pageInfo": { "isLastPage": is_last_page, "totalRows": total_rows }
    })
}

pub fn seller(id: u64, name: &str) -> Value {
    json!({"Id": id, "Nombre de la Vendedora": name})
}

pub fn contact(id: u64, status: &str, created: &str) -> Value {
    json!({
        "Id": id,
        "Nombre": format!("Contacto {}", id),
        "Estado Actual": status,
        "Fecha y hora de creación": created,
    })
}

pub fn sale(id: u64, amount: f64, date: &str) -> Value {
    json!({"Id": id, "Monto Final": amount, "Fecha": date, "Producto Vendido": "Curso"})
}

pub fn interaction(id: u64, channel: &str, date: &str) -> Value {
    json!({"Id": id, "Medio/Canal": channel, "Fecha": date})
}

pub fn attempt(id: u64, status: &str, date: &str) -> Value {
    json!({"Id": id, "Estado": status, "Fecha del Intento": date})
}

/// Serve `list` as a single last page for `collection`.
pub async fn mount_collection(server: &MockServer, collection: &str, list: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path(format!("/collections/{}", collection)))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(list, true)))
        .mount(server)
        .await;
}

/// Serve date-filtered contacts and the status-filtered funnel separately.
pub async fn mount_contacts(server: &MockServer, dated: Vec<Value>, funnel: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/collections/contacts"))
        .and(query_param_contains("where", "Estado Actual,in"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(funnel, true)))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/collections/contacts"))
        .and(query_param_contains("where", "exactDate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(dated.clone(), true)))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/collections/contacts"))
        .and(query_param_is_missing("where"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(dated, true)))
        .mount(server)
        .await;
}

/// A small but complete CRM: two sellers, funnel of four, one week of activity.
pub async fn mount_crm(server: &MockServer) {
    mount_collection(server, "sellers", vec![seller(1, "Ana"), seller(2, "Bea")]).await;
    mount_collection(
        server,
        "sales",
        vec![
            sale(30, 1500.0, "2024-06-01 09:00:00"),
            sale(31, 800.0, "2024-06-05 16:00:00"),
        ],
    )
    .await;
    mount_contacts(
        server,
        vec![
            contact(10, "Lead Nuevo", "2024-06-01 10:00:00"),
            contact(11, "Venta Ganada", "2024-06-03 11:00:00"),
        ],
        vec![
            contact(10, "Lead Nuevo", "2024-06-01 10:00:00"),
            contact(11, "Venta Ganada", "2024-06-03 11:00:00"),
            contact(12, "Llamada Agendada", "2024-05-20 08:00:00"),
            contact(13, "Venta Perdida", "2024-04-02 08:00:00"),
        ],
    )
    .await;
    mount_collection(
        server,
        "interactions",
        vec![interaction(20, "WhatsApp", "2024-06-02 12:00:00")],
    )
    .await;
    mount_collection(
        server,
        "attempts",
        vec![attempt(40, "Abandonado", "2024-06-04 18:00:00")],
    )
    .await;
}

// =============================================================================
// App Builders
// =============================================================================

pub fn cache_for(server: &MockServer) -> CacheCoordinator {
    let source = Arc::new(GatewayClient::new(gateway_config(server)).unwrap());
    CacheCoordinator::new(source, cache_config())
}

pub fn demo_cache() -> CacheCoordinator {
    let source = Arc::new(GatewayClient::new(GatewayConfig::default()).unwrap());
    CacheCoordinator::new(source, cache_config())
}

/// Router and coordinator over `gateway` (demo mode when `None`).
pub fn create_test_app(gateway: Option<&MockServer>) -> (axum::Router, CacheCoordinator) {
    let mut config = PulseConfig::default();
    config.cache = cache_config();
    let cache = match gateway {
        Some(server) => {
            config.gateway = gateway_config(server);
            cache_for(server)
        }
        None => demo_cache(),
    };

    let state = Arc::new(AppState::new(
        Arc::new(config),
        cache.clone(),
        salespulse::metrics::handle_or_detached(),
    ));
    (create_router(state), cache)
}

/// Requests `server` received for `collection`.
pub async fn requests_for(server: &MockServer, collection: &str) -> Vec<wiremock::Request> {
    let target = format!("/collections/{}", collection);
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == target)
        .collect()
}

/// The decoded `where` parameter of a request, if any.
pub fn where_param(request: &wiremock::Request) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == "where")
        .map(|(_, v)| v.into_owned())
}
