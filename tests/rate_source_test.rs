//! HttpRateSource 与 CurrencyService 对接模拟汇率接口的集成测试

use invoice_engine::{AppError, CurrencyService, HttpRateSource, RateSource};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rates_body() -> serde_json::Value {
    serde_json::json!({
        "result": "success",
        "base_code": "EUR",
        "time_last_update_utc": "Mon, 19 Oct 2026 00:00:01 +0000",
        "rates": { "EUR": 1, "XOF": 655.957, "USD": 1.08 }
    })
}

fn source(server: &MockServer) -> HttpRateSource {
    let http = invoice_engine::create_client(Duration::from_secs(5)).unwrap();
    HttpRateSource::new(http, format!("{}/v6/latest/", server.uri()))
}

#[tokio::test]
async fn test_http_source_parses_rates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v6/latest/EUR"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rates_body()))
        .expect(1)
        .mount(&server)
        .await;

    let table = source(&server).get_exchange_rates("EUR").await.unwrap();
    assert_eq!(table.base, "EUR");
    assert_eq!(table.rates["XOF"], 655.957);
}

#[tokio::test]
async fn test_http_source_maps_status_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = source(&server).get_exchange_rates("EUR").await.unwrap_err();
    match err {
        AppError::RateHttp { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_http_source_rejects_malformed_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = source(&server).get_exchange_rates("EUR").await.unwrap_err();
    assert!(matches!(err, AppError::RateDecode(_)));
}

#[tokio::test]
async fn test_service_caches_http_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v6/latest/EUR"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rates_body()))
        .expect(2)
        .mount(&server)
        .await;

    let service = CurrencyService::new(Arc::new(source(&server)), "EUR", "XOF", "XOF");
    service.fetch_rates("EUR").await.unwrap();
    service.fetch_rates("EUR").await.unwrap();
    service.refresh_rates().await.unwrap();
    // expect(2) 在 MockServer drop 时校验: 一次首取, 一次刷新
}

#[tokio::test]
async fn test_service_rejects_table_without_base() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "base": "EUR",
            "rates": { "USD": 1.08 }
        })))
        .mount(&server)
        .await;

    let service = CurrencyService::new(Arc::new(source(&server)), "EUR", "XOF", "XOF");
    assert!(matches!(
        service.try_fetch_rates("EUR").await,
        Err(AppError::InvalidRateTable(_))
    ));
    assert!(service.cached_table().is_none());
}
