//! Integration tests for the gateway client against a mock HTTP gateway.

mod common;

use salespulse::config::GatewayConfig;
use salespulse::gateway::{
    fetch_records, FilterExpr, FilterOp, GatewayClient, GatewayError, RecordSource,
    FUNNEL_STATUSES,
};
use salespulse::records::{Collection, LeadStatus, Sale};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, page_size: u32) -> GatewayClient {
    GatewayClient::new(GatewayConfig {
        page_size,
        ..common::gateway_config(server)
    })
    .unwrap()
}

fn sales(ids: std::ops::Range<u64>) -> Vec<serde_json::Value> {
    ids.map(|id| common::sale(id, 100.0, "2024-06-01 10:00:00"))
        .collect()
}

// ====== Pagination ======

#[tokio::test]
async fn test_fetch_all_walks_pages_until_last() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/collections/sales"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::page(sales(0..2), false)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/collections/sales"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::page(sales(2..4), false)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/collections/sales"))
        .and(query_param("offset", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::page(sales(4..5), true)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 2);
    let records = client.fetch_all(Collection::Sales, None).await.unwrap();

    let ids: Vec<u64> = records.iter().map(|r| r["Id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_empty_last_first_page_makes_one_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/collections/attempts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::page(vec![], true)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 100);
    let records = client.fetch_all(Collection::Attempts, None).await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_empty_page_stops_even_when_not_marked_last() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/collections/sales"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::page(vec![], false)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 100);
    assert!(client.fetch_all(Collection::Sales, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_short_page_without_page_info_is_last() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/collections/sales"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "list": sales(0..3) })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 10);
    let records = client.fetch_all(Collection::Sales, None).await.unwrap();
    assert_eq!(records.len(), 3);
}

#[tokio::test]
async fn test_capped_page_size_advances_by_received_count() {
    let server = MockServer::start().await;

    // Asked for 100 per page, the gateway hands out 2 at a time
    Mock::given(method("GET"))
        .and(path("/collections/sales"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::page(sales(0..2), false)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/collections/sales"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::page(sales(2..3), true)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 100);
    assert_eq!(client.fetch_all(Collection::Sales, None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_max_pages_bounds_a_gateway_that_never_ends() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/collections/sales"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::page(sales(0..1), false)))
        .expect(3)
        .mount(&server)
        .await;

    let client = GatewayClient::new(GatewayConfig {
        page_size: 1,
        max_pages: 3,
        ..common::gateway_config(&server)
    })
    .unwrap();

    assert_eq!(client.fetch_all(Collection::Sales, None).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_missing_list_stops_with_gathered_records() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/collections/sales"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::page(sales(0..2), false)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/collections/sales"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "pageInfo": {} })))
        .mount(&server)
        .await;

    let client = client_for(&server, 2);
    assert_eq!(client.fetch_all(Collection::Sales, None).await.unwrap().len(), 2);
}

// ====== Query Parameters ======

#[tokio::test]
async fn test_filter_and_paging_parameters_are_sent() {
    let server = MockServer::start().await;
    let filter = FilterExpr::exact_date(
        "Fecha",
        FilterOp::Gte,
        chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
    );

    Mock::given(method("GET"))
        .and(path("/collections/sales"))
        .and(query_param("where", "(Fecha,gte,exactDate,2024-06-01)"))
        .and(query_param("limit", "250"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::page(sales(0..1), true)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 250);
    let records = client
        .fetch_all(Collection::Sales, Some(&filter))
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn test_unfiltered_request_has_no_where() {
    let server = MockServer::start().await;
    common::mount_collection(&server, "sellers", vec![common::seller(1, "Ana")]).await;

    let client = client_for(&server, 100);
    client.fetch_all(Collection::Sellers, None).await.unwrap();

    let requests = common::requests_for(&server, "sellers").await;
    assert_eq!(requests.len(), 1);
    assert_eq!(common::where_param(&requests[0]), None);
}

#[tokio::test]
async fn test_sort_parameter_for_dated_collections() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/collections/attempts"))
        .and(query_param("sort", "-Fecha del Intento"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::page(vec![], true)))
        .expect(1)
        .mount(&server)
        .await;

    let client = GatewayClient::new(GatewayConfig {
        sort_by_date: true,
        ..common::gateway_config(&server)
    })
    .unwrap();
    client.fetch_all(Collection::Attempts, None).await.unwrap();
}

#[tokio::test]
async fn test_token_header_is_sent() {
    let server = MockServer::start().await;
    std::env::set_var("SALESPULSE_IT_GATEWAY_TOKEN", "secret-token");

    Mock::given(method("GET"))
        .and(path("/collections/sellers"))
        .and(header("xc-token", "secret-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::page(vec![], true)))
        .expect(1)
        .mount(&server)
        .await;

    let client = GatewayClient::new(GatewayConfig {
        token_env: Some("SALESPULSE_IT_GATEWAY_TOKEN".to_string()),
        ..common::gateway_config(&server)
    })
    .unwrap();
    client.fetch_all(Collection::Sellers, None).await.unwrap();
}

#[tokio::test]
async fn test_funnel_request_lists_every_status() {
    let server = MockServer::start().await;
    common::mount_contacts(&server, vec![], vec![common::contact(1, "Lead Nuevo", "2024-06-01")])
        .await;

    let client = client_for(&server, 100);
    let records = client
        .fetch_contacts_by_status(&FUNNEL_STATUSES)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);

    let requests = common::requests_for(&server, "contacts").await;
    let expr = common::where_param(&requests[0]).unwrap();
    for status in FUNNEL_STATUSES {
        assert!(expr.contains(status), "missing {status} in {expr}");
    }
}

// ====== Errors ======

#[tokio::test]
async fn test_http_error_returns_partial_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/collections/sales"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::page(sales(0..2), false)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/collections/sales"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server, 2);
    let records = client.fetch_all(Collection::Sales, None).await.unwrap();
    assert_eq!(records.len(), 2);
    // First try plus three retries
    let retried = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.query().is_some_and(|q| q.contains("offset=2")))
        .count();
    assert_eq!(retried, 4);
}

#[tokio::test]
async fn test_rate_limited_page_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/collections/sales"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/collections/sales"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::page(sales(0..3), true)))
        .mount(&server)
        .await;

    let client = client_for(&server, 10);
    let records = client.fetch_all(Collection::Sales, None).await.unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/collections/sales"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, 10);
    let records = client.fetch_all(Collection::Sales, None).await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_retries_disabled_gives_up_after_first_failure() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/collections/sales"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = GatewayClient::new(GatewayConfig {
        max_retries: 0,
        ..common::gateway_config(&server)
    })
    .unwrap();
    let records = client.fetch_all(Collection::Sales, None).await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_fetch_page_reports_http_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/collections/sellers"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client_for(&server, 10);
    let err = client
        .fetch_page(Collection::Sellers, None, 0)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        GatewayError::Http {
            status: 401,
            collection: "sellers".to_string()
        }
    );
    assert!(!err.is_network());
}

#[tokio::test]
async fn test_undecodable_page_returns_partial_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/collections/sellers"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let client = client_for(&server, 10);
    assert!(client
        .fetch_all(Collection::Sellers, None)
        .await
        .unwrap()
        .is_empty());
    assert!(matches!(
        client.fetch_page(Collection::Sellers, None, 0).await,
        Err(GatewayError::Decode(_))
    ));
}

#[tokio::test]
async fn test_connection_refused_is_a_network_error() {
    let server = MockServer::builder().start().await;
    let config = common::gateway_config(&server);
    drop(server);

    let client = GatewayClient::new(config).unwrap();
    let err = client
        .fetch_all(Collection::Sellers, None)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Network(_)));
    assert!(err.is_network());
}

#[tokio::test]
async fn test_slow_gateway_is_a_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/collections/sellers"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(common::page(vec![], true))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let http = reqwest::Client::builder()
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let client = GatewayClient::with_client(common::gateway_config(&server), http);

    let err = client
        .fetch_all(Collection::Sellers, None)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Timeout(_)));
}

#[tokio::test]
async fn test_demo_client_refuses_to_fetch() {
    let client = GatewayClient::new(GatewayConfig::default()).unwrap();
    assert!(!client.is_configured());
    assert_eq!(
        client.fetch_all(Collection::Sales, None).await,
        Err(GatewayError::NotConfigured)
    );
}

// ====== Normalization ======

#[tokio::test]
async fn test_fetch_records_normalizes_and_skips_malformed() {
    let server = MockServer::start().await;
    common::mount_collection(
        &server,
        "sales",
        vec![
            common::sale(7, 1250.5, "2024-06-03 14:30:00"),
            json!({"Monto Final": 10}),
            json!("not an object"),
        ],
    )
    .await;

    let client = client_for(&server, 100);
    let records: Vec<Sale> = fetch_records(&client, None, common::utc()).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "7");
    assert_eq!(records[0].amount, 1250.5);
}

#[tokio::test]
async fn test_fetch_records_maps_contact_status() {
    let server = MockServer::start().await;
    common::mount_contacts(
        &server,
        vec![
            common::contact(1, "Venta Ganada", "2024-06-01 10:00:00"),
            common::contact(2, "Lead Nuevo", "2024-06-01 11:00:00"),
        ],
        vec![],
    )
    .await;

    let client = client_for(&server, 100);
    let contacts: Vec<salespulse::records::Contact> =
        fetch_records(&client, None, common::utc()).await.unwrap();
    let statuses: Vec<LeadStatus> = contacts.iter().map(|c| c.status).collect();
    assert_eq!(statuses, vec![LeadStatus::ClosedWon, LeadStatus::New]);
}
